//! Subcommands of the ethscan binary.

mod scan;
pub use scan::ScanCommand;

mod serve;
pub use serve::ServeCommand;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `cancellation` on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c(cancellation: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(target: "ethscan", %err, "Failed to listen for Ctrl-C");
                    return;
                }
                info!(target: "ethscan", "Received Ctrl-C, shutting down");
                cancellation.cancel();
            }
            _ = cancellation.cancelled() => {}
        }
    });
}
