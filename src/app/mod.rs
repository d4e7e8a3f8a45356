//! Application module
//!
//! Process-level concerns of the `mask-consensus` binary:
//! - Verbosity and log filter selection
//! - Logging setup
//! - Fatal error reporting and exit codes

pub mod config;
pub mod error_handling;
pub mod logging;

pub use config::AppConfig;
pub use error_handling::{exit_code_for, handle_fatal_error};
pub use logging::init_logging;
