//! Tracing subscriber bootstrap shared by the server and the CLI.

use anyhow::Context;
use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("invalid log filter '{}'", settings.filter)),
    }
}

/// Install the global tracing subscriber.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().flatten_event(true).try_init().is_ok(),
    };

    tracing::info!(
        target: "bookshelf-telemetry",
        format = ?settings.log_format,
        installed,
        "telemetry initialized"
    );
    Ok(())
}
