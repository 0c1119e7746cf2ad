//! HTTP server
//!
//! A thin proxy in front of the model client: `/experiment` turns a form into
//! a plan and `/chat` continues a conversation. Both paths are also mounted
//! under `/api`.

mod error;
mod handlers;

pub use error::{INTERNAL_ERROR_DETAIL, ServerError};
pub use handlers::{continue_chat, generate_plan};

use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{GenerationConfig, ServerConfig};
use crate::llm::LlmClient;
use crate::prompts::{PromptAssembler, PromptError};

/// State shared by all handlers; immutable after startup
pub struct AppState {
    pub llm: Arc<dyn LlmClient>,
    pub assembler: PromptAssembler,
    pub generation: GenerationConfig,
    pub log_payloads: bool,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>, generation: GenerationConfig, log_payloads: bool) -> Result<Self, PromptError> {
        Ok(Self {
            llm,
            assembler: PromptAssembler::new()?,
            generation,
            log_payloads,
        })
    }
}

fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/experiment", post(handlers::experiment).options(handlers::acknowledge))
        .route("/chat", post(handlers::chat).options(handlers::acknowledge))
}

/// Build the application router
pub fn router(state: AppState, cors: bool) -> Router {
    let app = Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http());

    if cors { app.layer(CorsLayer::permissive()) } else { app }
}

/// Bind and serve until Ctrl-C
pub async fn run(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = router(state, config.cors);

    let listener = TcpListener::bind(&config.bind)
        .await
        .context(format!("Failed to bind {}", config.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::protocol::{ErrorResponse, PlanResponse};
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn app(replies: Vec<Result<String, String>>) -> Router {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(replies));
        router(AppState::new(llm, GenerationConfig::default(), false).unwrap(), true)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_experiment_ok() {
        let response = app(vec![Ok("# Plan".to_string())])
            .oneshot(post_json("/experiment", r#"{"hypothesis": "H"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: PlanResponse = body_json(response).await;
        assert_eq!(body.response, "# Plan");
    }

    #[tokio::test]
    async fn test_api_prefix_routes() {
        let response = app(vec![Ok("reply".to_string())])
            .oneshot(post_json("/api/chat", r#"{"message": "hi", "history": []}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_body_is_generic_500() {
        let response = app(vec![]).oneshot(post_json("/experiment", "{oops")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.detail, INTERNAL_ERROR_DETAIL);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_generic_500() {
        let response = app(vec![Err("quota".to_string())])
            .oneshot(post_json("/chat", r#"{"message": "hi", "history": []}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.detail, "Internal server error");
    }

    #[tokio::test]
    async fn test_options_acknowledged() {
        for uri in ["/experiment", "/chat", "/api/chat"] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = app(vec![]).oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK, "OPTIONS {}", uri);
        }
    }

    #[tokio::test]
    async fn test_options_ack_body_without_cors() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new(vec![]));
        let app = router(AppState::new(llm, GenerationConfig::default(), false).unwrap(), false);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/experiment")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: crate::protocol::Ack = body_json(response).await;
        assert_eq!(body.message, "OK");
    }
}
