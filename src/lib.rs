//! # mask-consensus
//!
//! Per-pixel, per-class majority vote over annotation job masks.
//!
//! Each job of a location is a `.tar.gz` archive holding one mask container:
//! one 2D integer dataset per class. A run folds every job of one date, plus
//! the location's previous consensus mask, into a new consensus mask.
//!
//! ## Modules
//!
//! - `mask` - Labels, grids, mask containers and the vote stream they produce
//! - `jobs` - Job archive discovery and mask extraction
//! - `aggregate` - Sharded, order-independent vote summation
//! - `store` - Consensus mask and metadata persistence with atomic publication
//! - `engine` - The phased run that ties the above together
//! - `analysis` - Viewer and overlap metric over a stored consensus mask
//! - `config` - Engine configuration (TOML file and environment)
//! - `app` - Logging and fatal error handling for the binary
//! - `cli` - Command-line interface
//! - `error` - Unified error type with numeric codes

pub mod aggregate;
pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod mask;
pub mod store;

pub use config::EngineConfig;
pub use engine::{CombineRequest, Engine, RunReport};
pub use error::{ConsensusError, ErrorCode, Result};
