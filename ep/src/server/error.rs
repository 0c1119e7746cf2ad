//! Server-side error taxonomy
//!
//! Every variant maps to the same generic 500 envelope; the distinction only
//! survives in the server log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::llm::LlmError;
use crate::prompts::PromptError;
use crate::protocol::ErrorResponse;

/// Detail string returned for every failure
pub const INTERNAL_ERROR_DETAIL: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Malformed request body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model call failed: {0}")]
    Upstream(#[from] LlmError),

    #[error("Prompt assembly failed: {0}")]
    Prompt(#[from] PromptError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Upstream(e) => {
                error!(error = %e, quota = e.is_quota(), provider = e.is_provider_error(), "Request failed");
            }
            other => error!(error = %other, "Request failed"),
        }
        let body = ErrorResponse {
            detail: INTERNAL_ERROR_DETAIL.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
