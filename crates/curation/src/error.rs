//! Error types for oracle calls and response parsing.

use std::time::Duration;
use thiserror::Error;

/// Failures reaching the oracle or getting text back from it.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Missing API key, unusable header values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection refused, reset, DNS failure
    #[error("Network error: {0}")]
    Network(String),

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    /// Non-2xx response
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Oracle returned no text")]
    EmptyResponse,
}

impl OracleError {
    /// Whether a second attempt has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Network(_) | OracleError::Timeout(_) => true,
            OracleError::Api { status, .. } => *status == 429 || *status >= 500,
            OracleError::Config(_) | OracleError::EmptyResponse => false,
        }
    }
}

/// The oracle answered, but not with anything usable.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No JSON object found in response")]
    NoJson,

    #[error("Response does not match the expected schema: {0}")]
    Schema(String),
}
