//! Experiment Planner
//!
//! Turns a structured description of a planned experiment into a generated
//! experiment plan, then supports follow-up chat about that plan.
//!
//! # Architecture
//!
//! - **Server** (`ep serve`): a thin HTTP proxy in front of a hosted model.
//!   `/experiment` assembles a prompt from the form; `/chat` replays the
//!   supplied history and sends one more message.
//! - **Client** (`ep plan`, `ep chat`, ...): keeps the form and the chat
//!   transcript in local storage and drives a single-flight send with
//!   rollback on failure.
//!
//! # Modules
//!
//! - [`llm`] - Model client trait and Gemini implementation
//! - [`prompts`] - Prompt assembly from the experiment form
//! - [`server`] - HTTP routes and handlers
//! - [`api`] - Client for the server's routes
//! - [`session`] - Conversation state machine and persisted form
//! - [`store`] - Keyed JSON persistence
//! - [`render`] - Markdown to HTML and terminal text
//! - [`repl`] - Interactive chat and form editor
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod prompts;
pub mod protocol;
pub mod render;
pub mod repl;
pub mod server;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use api::{ApiError, HttpPlannerApi, PlannerApi};
pub use config::{Config, LlmConfig};
pub use domain::{ChatMessage, ChatRole, ExperimentForm, FormField, Transcript};
pub use llm::{CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError, create_client};
pub use prompts::PromptAssembler;
pub use server::{AppState, router};
pub use session::{Conversation, ConversationState, FormState, SendError};
pub use store::{FileStorage, MemoryStorage, Storage};
