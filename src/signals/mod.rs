// Signal handling
// SIGINT/SIGTERM end the interactive browse loop so the banner manager
// gets a proper shutdown instead of a killed runtime

use anyhow::Result;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::info;

/// Future that completes on the first SIGINT or SIGTERM.
pub fn create_shutdown_listener() -> Result<impl std::future::Future<Output = ()>> {
    let mut signals = Signals::new([SIGTERM, SIGINT])?;

    Ok(async move {
        if let Some(signal) = signals.next().await {
            let name = if signal == SIGTERM { "SIGTERM" } else { "SIGINT" };
            info!(signal = name, "shutdown signal received");
        }
    })
}
