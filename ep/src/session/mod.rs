//! Presentation-layer session state
//!
//! The persisted form and the chat conversation, each restored from storage
//! at startup and written back after every mutation.

mod conversation;
mod form;

pub use conversation::{Conversation, ConversationState, SendError};
pub use form::FormState;
