//! Structured logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the log filter: explicit level first, then `RUST_LOG`, then `info`.
fn build_filter(log_level: Option<&str>) -> anyhow::Result<EnvFilter> {
    match log_level {
        Some(level) => Ok(EnvFilter::try_new(level)?),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Initialize JSON structured logging with environment-based filtering.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// # Arguments
/// * `log_level` - Optional filter override (e.g., "info", "mevscope_heuristics=debug")
pub fn init_logging(log_level: Option<&str>) -> anyhow::Result<()> {
    let filter = build_filter(log_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
