//! Error types for the terminal

use thiserror::Error;

/// Terminal-wide error type
#[derive(Error, Debug)]
pub enum PaparazziError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaparazziError {
    pub fn api(msg: impl Into<String>) -> Self {
        PaparazziError::Api(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        PaparazziError::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        PaparazziError::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PaparazziError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PaparazziError::Config(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        PaparazziError::Store(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        PaparazziError::Internal(msg.into())
    }
}

/// Result type alias for terminal operations
pub type PaparazziResult<T> = Result<T, PaparazziError>;
