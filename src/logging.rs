use std::io::IsTerminal;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging settings handed to the entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub debug: bool,
}

impl LogConfig {
    pub fn level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

/// The run cannot even begin without a log stream to report errors on.
#[derive(Debug, Error)]
#[error("failed to initialize logger: {0}")]
pub struct LoggerInitError(String);

/// Install the global stderr subscriber. `RUST_LOG` overrides the level.
pub fn init_logger(config: &LogConfig) -> Result<(), LoggerInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.level().into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| LoggerInitError(err.to_string()))
}
