//! Command implementations

pub mod batch;
pub mod combine;
pub mod performance;
pub mod view;

pub use batch::run_batch;
pub use combine::run_combine;
pub use performance::run_performance;
pub use view::run_view;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Token cancelled on the first Ctrl-C
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the current run");
            trigger.cancel();
        }
    });
    token
}
