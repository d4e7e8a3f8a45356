//! Error handling utilities

use crate::error::ConsensusError;
use tracing::error;

/// Exit status for an error reaching the top of the binary
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<ConsensusError>()
        .map(ConsensusError::exit_code)
        .unwrap_or(1)
}

/// Handle fatal errors and exit with appropriate status code
///
/// - `verbose = 0`: user-facing message only
/// - `verbose >= 1`: also the full cause chain
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    if let Some(err) = error.downcast_ref::<ConsensusError>() {
        eprintln!("{}", err.user_message());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", err.developer_message());
        }
    } else {
        eprintln!("Error: {error}");
        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }
    }

    std::process::exit(exit_code_for(&error))
}
