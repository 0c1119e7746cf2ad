//! Plan and chat request handlers
//!
//! The `generate_plan` and `continue_chat` functions hold the request logic
//! and are tested directly; the axum wrappers only adapt extractors.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use tracing::{debug, info};

use super::AppState;
use super::error::ServerError;
use crate::domain::ExperimentForm;
use crate::llm::{ChatSession, CompletionRequest, Message};
use crate::protocol::{Ack, ChatRequest, PlanResponse};

/// Handle one form submission: assemble the prompt and ask the model
pub async fn generate_plan(state: &AppState, body: &[u8]) -> Result<PlanResponse, ServerError> {
    debug!(body_len = body.len(), "generate_plan: called");
    let form: ExperimentForm = serde_json::from_slice(body)?;
    if state.log_payloads {
        info!(?form, "Received experiment data");
    }

    let prompt = state.assembler.assemble(&form)?;
    let request = CompletionRequest::prompt(prompt, state.generation.clone());
    let response = state.llm.complete(request).await?;

    info!(
        plan_len = response.content.len(),
        output_tokens = response.usage.output_tokens,
        "Generated experiment plan"
    );
    Ok(PlanResponse {
        response: response.content,
    })
}

/// Handle one chat turn: replay the supplied history, then send the message
pub async fn continue_chat(state: &AppState, body: &[u8]) -> Result<PlanResponse, ServerError> {
    debug!(body_len = body.len(), "continue_chat: called");
    let request: ChatRequest = serde_json::from_slice(body)?;
    if state.log_payloads {
        info!(?request, "Received chat request");
    }
    info!(history_len = request.history.len(), "Chat history length");

    let history: Vec<Message> = request.history.iter().map(Message::from).collect();
    let mut chat = ChatSession::start(state.llm.clone(), history, state.generation.clone());
    let reply = chat.send_message(request.message).await?;

    Ok(PlanResponse { response: reply })
}

pub(super) async fn experiment(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PlanResponse>, ServerError> {
    generate_plan(&state, &body).await.map(Json)
}

pub(super) async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<PlanResponse>, ServerError> {
    continue_chat(&state, &body).await.map(Json)
}

/// Cross-origin preflight acknowledgment
pub(super) async fn acknowledge() -> Json<Ack> {
    Json(Ack::ok())
}
