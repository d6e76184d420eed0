use thiserror::Error;

/// Failures while starting or running a service binary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(String),
    /// `FRONTEND_URL` is not usable as a CORS origin header.
    #[error("Invalid frontend origin {origin}: {reason}")]
    InvalidOrigin { origin: String, reason: String },
    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
