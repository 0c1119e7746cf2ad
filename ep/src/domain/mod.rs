//! Domain types for the experiment planner
//!
//! Core domain types: ExperimentForm, ChatMessage, Transcript.
//! Wire and persisted representations share these types so the JSON the
//! server accepts is the JSON the client stores.

mod form;
mod transcript;

pub use form::{ExperimentForm, FormField};
pub use transcript::{ChatMessage, ChatRole, Transcript};
