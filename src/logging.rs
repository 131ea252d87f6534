use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging with configurable log levels
///
/// The `RUST_LOG` environment variable takes precedence over the configured
/// default level. Examples:
/// - `RUST_LOG=info` - Info level and above
/// - `RUST_LOG=wspulse=debug` - Debug level for the wspulse crate only
/// - `RUST_LOG=warn` - Warn level and above
pub fn init_logging(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
