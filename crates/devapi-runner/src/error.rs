//! Runner error types.

use devapi_server::ServerError;
use thiserror::Error;

/// Errors loading the device file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse device file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid device file: {0}")]
    Invalid(String),
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that stop the runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install logging: {0}")]
    Logging(String),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
