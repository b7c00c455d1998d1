//! Tracing subscriber setup.

use tokenjam_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber on stderr.
///
/// `RUST_LOG` takes precedence over the configured level. Subsequent calls
/// are no-ops.
pub fn init(settings: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails only when a subscriber is already installed
    if settings.json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}
