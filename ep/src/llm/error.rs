//! LLM error types

use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Prompt blocked by provider: {0}")]
    Blocked(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Check if the provider rejected the request for quota reasons
    pub fn is_quota(&self) -> bool {
        matches!(self, LlmError::ApiError { status: 429, .. })
    }

    /// Check if the failure came from the provider rather than the transport
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            LlmError::ApiError { .. } | LlmError::InvalidResponse(_) | LlmError::Blocked(_)
        )
    }
}
