use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_ENV: &str = "RTSPBUSTER_LOGLEVEL";

pub fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Diagnostic logging to stderr. `RUST_LOG` (or `RTSPBUSTER_LOGLEVEL`) overrides `-v`.
pub fn initialize_logging(verbose: u8, no_color: bool) -> Result<(), String> {
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV))
        .unwrap_or_else(|_| default_filter(verbose));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color)
        .with_filter(EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {e}"))
}
