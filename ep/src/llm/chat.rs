//! Multi-turn chat on top of a stateless LlmClient

use std::sync::Arc;

use tracing::debug;

use super::{CompletionRequest, LlmClient, LlmError, Message};
use crate::config::GenerationConfig;

/// A conversation opened with a prior history
///
/// Each `send_message` resends the whole history followed by the new user
/// message. The history only grows when a call succeeds.
pub struct ChatSession {
    llm: Arc<dyn LlmClient>,
    history: Vec<Message>,
    generation: GenerationConfig,
}

impl ChatSession {
    /// Open a session seeded with `history`, kept in the order given
    pub fn start(llm: Arc<dyn LlmClient>, history: Vec<Message>, generation: GenerationConfig) -> Self {
        debug!(history_len = %history.len(), "ChatSession::start: called");
        Self {
            llm,
            history,
            generation,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Send one user message and return the model's reply
    pub async fn send_message(&mut self, text: impl Into<String>) -> Result<String, LlmError> {
        let user = Message::user(text);
        debug!(history_len = %self.history.len(), "ChatSession::send_message: called");

        let mut messages = self.history.clone();
        messages.push(user.clone());

        let request = CompletionRequest {
            system_prompt: None,
            messages,
            generation: self.generation.clone(),
        };

        let response = self.llm.complete(request).await?;

        self.history.push(user);
        self.history.push(Message::assistant(response.content.clone()));
        debug!(history_len = %self.history.len(), "ChatSession::send_message: reply appended");
        Ok(response.content)
    }
}
