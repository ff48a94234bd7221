//! Error types shared across the core crate.

use thiserror::Error;

pub type MathMateResult<T> = Result<T, MathMateError>;

#[derive(Debug, Error)]
pub enum MathMateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Completion API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Flush failed: {0}")]
    Flush(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
