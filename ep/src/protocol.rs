//! HTTP wire types shared by the server and the terminal client

use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message
    pub message: String,

    /// Every earlier turn, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Successful body of both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub response: String,
}

/// Error body of both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Body of the `OPTIONS` acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            message: "OK".to_string(),
        }
    }
}
