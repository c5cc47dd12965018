// Observability infrastructure using tracing crate
// Structured logging for both the CLI commands and the ad event loop

use anyhow::Result;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the observability system.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(verbose: bool) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Configure filter from environment or use the verbosity flag.
    // Example: RUST_LOG=status_saver=debug
    let default_filter = if verbose {
        "status_saver=debug"
    } else {
        "status_saver=info"
    };
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Create a span covering one user-visible operation.
#[inline]
pub fn op_span(operation: &str) -> tracing::Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        op_id = %uuid::Uuid::new_v4(),
    )
}
