//! REST error types

use itx_common::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("Failed to process request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} :: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms}ms)")]
    RateLimited { retry_after_ms: u64, global: bool },

    #[error("Request failed after {attempts} attempts to {method} {route}")]
    RetriesExhausted {
        method: String,
        route: String,
        attempts: u8,
    },

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited { .. })
    }
}

impl From<RestError> for ClientError {
    fn from(err: RestError) -> Self {
        ClientError::Rest(err.to_string())
    }
}
