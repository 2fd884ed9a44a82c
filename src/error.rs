use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Security context error: {0}")]
    Security(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Permit acquisition cancelled: {0}")]
    Cancelled(String),

    #[error("Initialization error: {0}")]
    Init(String),
}

impl AppError {
    /// Failures raised before a permit is requested.
    pub fn is_preparation(&self) -> bool {
        matches!(self, AppError::Serialization(_) | AppError::Security(_))
    }

    /// Failures raised while a permit is held and the payload is in flight.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Http(_) | AppError::Transport(_))
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, AppError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
