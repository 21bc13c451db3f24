//! Error types for justnotes-core

use thiserror::Error;

/// Result type alias using justnotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in justnotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to the note service
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The note service answered with an error status
    #[error("Note service error: {0}")]
    Api(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
