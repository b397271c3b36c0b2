//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Where log lines end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// Interactive terminal: colours and timestamps
    Terminal,
    /// systemd journal: plain text, journald stamps its own time
    Journal,
}

/// Setup tracing subscriber for the application
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    setup_logging_with(default_level, LogStyle::Terminal)
}

/// Setup tracing subscriber with an explicit output style
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn setup_logging_with(default_level: &str, style: LogStyle) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    // stdout carries console and CLI output
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let result = match style {
        LogStyle::Terminal => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
        LogStyle::Journal => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_ansi(false).without_time())
            .try_init(),
    };

    result.map_err(|e| crate::Error::Config(format!("Logging already initialised: {}", e)))
}
