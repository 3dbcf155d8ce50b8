//! Common error types for GameDex

use thiserror::Error;

/// Common result type for GameDex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across GameDex services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data file that is not the JSON shape we expect
    #[error("Malformed data: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
