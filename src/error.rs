//! Error types for cadcheck

use thiserror::Error;

use crate::validate::ValidationError;

pub type Result<T> = std::result::Result<T, CadError>;

#[derive(Error, Debug)]
pub enum CadError {
    /// Rejected before any request was made.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Expected: {expected}, actual response: {actual}")]
    UnexpectedStatus {
        expected: u16,
        actual: u16,
        body: String,
    },

    #[error("Failed to decode response body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CadError {
    /// Whether the fetcher may try the same request again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CadError::Connect(_)
                | CadError::Timeout(_)
                | CadError::Transport(_)
                | CadError::UnexpectedStatus { .. }
                | CadError::InvalidBody(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CadError::Config(_) => "CONFIG",
            CadError::InvalidQuery(_) => "INVALID_QUERY",
            CadError::Connect(_) => "CONNECT_ERROR",
            CadError::Timeout(_) => "TIMEOUT",
            CadError::Transport(_) => "TRANSPORT_ERROR",
            CadError::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            CadError::InvalidBody(_) => "INVALID_BODY",
            CadError::Validation(_) => "VALIDATION",
        }
    }
}

impl From<reqwest::Error> for CadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CadError::Timeout(err.to_string());
        }
        if err.is_connect() {
            return CadError::Connect(err.to_string());
        }
        if err.is_builder() {
            return CadError::Config(err.to_string());
        }
        CadError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for CadError {
    fn from(err: serde_json::Error) -> Self {
        CadError::InvalidBody(err.to_string())
    }
}
