//! LLM request/response types
//!
//! Provider-agnostic shapes; each client converts them to its own wire format.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GenerationConfig;
use crate::domain::{ChatMessage, ChatRole};

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system instruction
    pub system_prompt: Option<String>,

    /// Conversation so far, ending with the message to answer
    pub messages: Vec<Message>,

    /// Sampling parameters
    pub generation: GenerationConfig,
}

impl CompletionRequest {
    /// Single-prompt request with no prior conversation
    pub fn prompt(text: impl Into<String>, generation: GenerationConfig) -> Self {
        debug!("CompletionRequest::prompt: called");
        Self {
            system_prompt: None,
            messages: vec![Message::user(text)],
            generation,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role() {
            ChatRole::User => Role::User,
            ChatRole::Assistant => Role::Assistant,
        };
        Self {
            role,
            content: msg.content().to_string(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage reported by the provider
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Plain text response with default metadata
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    Other(String),
}

impl StopReason {
    /// Parse from Gemini API finishReason string
    pub fn from_gemini(s: &str) -> Self {
        debug!(%s, "StopReason::from_gemini: called");
        match s {
            "STOP" => StopReason::EndTurn,
            "MAX_TOKENS" => StopReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::Safety,
            other => {
                debug!(%other, "StopReason::from_gemini: unrecognized reason");
                StopReason::Other(other.to_string())
            }
        }
    }
}

/// Token usage for observability
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");

        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_message_from_chat_message() {
        let msg = Message::from(&ChatMessage::assistant("Plan v1"));
        assert_eq!(msg, Message::assistant("Plan v1"));
    }

    #[test]
    fn test_prompt_request() {
        let req = CompletionRequest::prompt("Plan this", GenerationConfig::default());
        assert!(req.system_prompt.is_none());
        assert_eq!(req.messages, vec![Message::user("Plan this")]);
    }

    #[test]
    fn test_stop_reason_from_gemini() {
        assert_eq!(StopReason::from_gemini("STOP"), StopReason::EndTurn);
        assert_eq!(StopReason::from_gemini("MAX_TOKENS"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_gemini("SAFETY"), StopReason::Safety);
        assert_eq!(
            StopReason::from_gemini("FINISH_REASON_UNSPECIFIED"),
            StopReason::Other("FINISH_REASON_UNSPECIFIED".to_string())
        );
    }
}
