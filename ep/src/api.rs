//! Planner API client
//!
//! What the terminal client uses to reach a running `ep serve`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::domain::ExperimentForm;
use crate::protocol::{ChatRequest, ErrorResponse, PlanResponse};

/// Failures talking to the planner server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned {status}: {detail}")]
    Server { status: u16, detail: String },
}

/// The two planner endpoints
#[async_trait]
pub trait PlannerApi: Send + Sync {
    /// `POST /experiment`: generate a plan from the form
    async fn submit_experiment(&self, form: &ExperimentForm) -> Result<String, ApiError>;

    /// `POST /chat`: continue the conversation
    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;
}

/// reqwest-backed [`PlannerApi`]
pub struct HttpPlannerApi {
    base_url: String,
    http: Client,
}

impl HttpPlannerApi {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "HttpPlannerApi::new: called");
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url,
            http: builder.build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.server_url.clone(), config.timeout_ms.map(Duration::from_millis))
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "HttpPlannerApi::post: called");

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.detail)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());
            debug!(status = %status.as_u16(), %detail, "HttpPlannerApi::post: server error");
            return Err(ApiError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        let body: PlanResponse = response.json().await?;
        Ok(body.response)
    }
}

#[async_trait]
impl PlannerApi for HttpPlannerApi {
    async fn submit_experiment(&self, form: &ExperimentForm) -> Result<String, ApiError> {
        self.post("/experiment", form).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        debug!(history_len = %request.history.len(), "HttpPlannerApi::chat: called");
        self.post("/chat", request).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted planner API for session tests
    ///
    /// `Err` replies become `ApiError::Server { status: 500, .. }`.
    #[derive(Default)]
    pub struct MockPlannerApi {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub chat_requests: Mutex<Vec<ChatRequest>>,
        pub forms: Mutex<Vec<ExperimentForm>>,
    }

    impl MockPlannerApi {
        pub fn new(replies: Vec<Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        fn next_reply(&self) -> Result<String, ApiError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(detail)) => Err(ApiError::Server { status: 500, detail }),
                None => Err(ApiError::Server {
                    status: 500,
                    detail: "No more mock replies".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl PlannerApi for MockPlannerApi {
        async fn submit_experiment(&self, form: &ExperimentForm) -> Result<String, ApiError> {
            self.forms.lock().unwrap().push(form.clone());
            self.next_reply()
        }

        async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
            self.chat_requests.lock().unwrap().push(request.clone());
            self.next_reply()
        }
    }
}
