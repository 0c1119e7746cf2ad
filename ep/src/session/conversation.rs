//! Chat session state machine
//!
//! Owns the transcript shown to the user. Sends are transactional: the user
//! message is appended optimistically, and the transcript is restored from a
//! snapshot if the request fails. Only one send may be outstanding.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::PlannerApi;
use crate::domain::{ChatMessage, Transcript};
use crate::protocol::ChatRequest;
use crate::store::{self, Storage, TRANSCRIPT_KEY};

/// Observable state of a [`Conversation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Sending,
}

/// Why a send was refused or failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("A message is already being sent")]
    InFlight,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("No message is being sent")]
    NotSending,

    #[error("Failed to send message: {0}")]
    Failed(String),
}

enum Phase {
    Idle,
    Sending { snapshot: Transcript },
}

/// Transcript plus the Idle/Sending machine that guards it
pub struct Conversation {
    transcript: Transcript,
    draft: String,
    phase: Phase,
    seeded: bool,
    store: Arc<dyn Storage>,
}

impl Conversation {
    /// Restore the persisted transcript, or start empty
    pub fn restore(store: Arc<dyn Storage>) -> Self {
        let transcript: Transcript = store::load_json(store.as_ref(), TRANSCRIPT_KEY);
        info!(len = transcript.len(), "Conversation::restore: loaded transcript");
        Self {
            transcript,
            draft: String::new(),
            phase: Phase::Idle,
            seeded: false,
            store,
        }
    }

    pub fn state(&self) -> ConversationState {
        match self.phase {
            Phase::Idle => ConversationState::Idle,
            Phase::Sending { .. } => ConversationState::Sending,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Insert a generated plan as the first assistant message
    ///
    /// Applies at most once per latch cycle and only to an empty transcript.
    /// Returns whether the seed was applied.
    pub fn seed(&mut self, plan: &str) -> bool {
        debug!(seeded = self.seeded, len = self.transcript.len(), "Conversation::seed: called");
        if self.seeded || !self.transcript.is_empty() || plan.is_empty() {
            return false;
        }
        self.transcript.push(ChatMessage::assistant(plan));
        self.seeded = true;
        self.persist();
        true
    }

    /// `Idle` → `Sending`: stage the user message and build the request
    ///
    /// The request carries the history as it was before the user message
    /// was appended.
    pub fn begin_send(&mut self) -> Result<ChatRequest, SendError> {
        debug!(state = ?self.state(), "Conversation::begin_send: called");
        if let Phase::Sending { .. } = self.phase {
            debug!("Conversation::begin_send: rejected, send in flight");
            return Err(SendError::InFlight);
        }
        if self.draft.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let snapshot = self.transcript.clone();
        let request = ChatRequest {
            message: self.draft.clone(),
            history: snapshot.messages().to_vec(),
        };

        self.transcript.push(ChatMessage::user(self.draft.clone()));
        self.phase = Phase::Sending { snapshot };
        self.persist();
        Ok(request)
    }

    /// `Sending` → `Idle`: commit the reply or roll back to the snapshot
    pub fn complete_send<E: fmt::Display>(&mut self, outcome: Result<String, E>) -> Result<String, SendError> {
        let snapshot = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Sending { snapshot } => snapshot,
            Phase::Idle => {
                debug!("Conversation::complete_send: no send in flight, ignoring");
                return Err(SendError::NotSending);
            }
        };

        match outcome {
            Ok(reply) => {
                debug!(reply_len = reply.len(), "Conversation::complete_send: committing reply");
                self.transcript.push(ChatMessage::assistant(reply.clone()));
                self.draft.clear();
                self.persist();
                Ok(reply)
            }
            Err(e) => {
                warn!(error = %e, "Conversation::complete_send: send failed, rolling back");
                self.transcript = snapshot;
                self.persist();
                Err(SendError::Failed(e.to_string()))
            }
        }
    }

    /// Run one full send cycle against the planner API
    pub async fn send(&mut self, api: &dyn PlannerApi) -> Result<String, SendError> {
        let request = self.begin_send()?;
        let outcome = api.chat(&request).await;
        self.complete_send(outcome)
    }

    /// Empty the transcript, erase the persisted copy and re-arm seeding
    ///
    /// A send still in flight is abandoned; its completion is ignored.
    pub fn clear(&mut self) {
        info!(len = self.transcript.len(), "Conversation::clear: called");
        self.transcript.clear();
        self.phase = Phase::Idle;
        self.seeded = false;
        if let Err(e) = self.store.remove(TRANSCRIPT_KEY) {
            warn!(error = %e, "Conversation::clear: failed to erase persisted transcript");
        }
    }

    fn persist(&self) {
        let result = if self.transcript.is_empty() {
            self.store.remove(TRANSCRIPT_KEY)
        } else {
            store::save_json(self.store.as_ref(), TRANSCRIPT_KEY, &self.transcript)
        };
        if let Err(e) = result {
            warn!(error = %e, "Conversation::persist: failed to save transcript");
        }
    }
}
