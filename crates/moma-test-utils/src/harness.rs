// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the gateway router over a forwarder backed by
//! [`MockAgent`] and [`MockTextModel`], and drives it in-process with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use moma_attachment::DocumentAttachmentAdapter;
use moma_config::model::{AttachmentConfig, ForwarderConfig};
use moma_core::{MomaError, TextModelAdapter};
use moma_forwarder::Forwarder;
use moma_gateway::{AppState, build_router};
use tower::ServiceExt;

use crate::mock_agent::{MockAgent, MockReply};
use crate::mock_model::MockTextModel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<MockReply>,
    deltas: Vec<Vec<Result<String, String>>>,
    forwarder: ForwarderConfig,
    attachment: AttachmentConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            deltas: Vec::new(),
            forwarder: ForwarderConfig::default(),
            attachment: AttachmentConfig::default(),
        }
    }

    /// Scripted agent replies, one per chat request.
    pub fn with_agent_replies(mut self, replies: Vec<MockReply>) -> Self {
        self.replies = replies;
        self
    }

    /// Scripted model delta lists, one per model pass.
    pub fn with_model_deltas(mut self, deltas: Vec<Vec<Result<String, String>>>) -> Self {
        self.deltas = deltas;
        self
    }

    pub fn with_forwarder_config(mut self, config: ForwarderConfig) -> Self {
        self.forwarder = config;
        self
    }

    pub fn with_attachment_config(mut self, config: AttachmentConfig) -> Self {
        self.attachment = config;
        self
    }

    pub fn build(self) -> TestHarness {
        let agent = Arc::new(MockAgent::with_replies(self.replies));
        let model = Arc::new(MockTextModel::with_deltas(self.deltas));
        let forwarder = Arc::new(Forwarder::new(
            agent.clone(),
            Some(model.clone() as Arc<dyn TextModelAdapter>),
            "mock-model",
            self.forwarder,
        ));
        let attachments = Arc::new(DocumentAttachmentAdapter::new(&self.attachment));
        let state = AppState::new(forwarder.clone(), attachments, self.attachment.max_bytes);
        TestHarness {
            agent,
            model,
            forwarder,
            router: build_router(state),
        }
    }
}

/// A buffered HTTP response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }

    /// Payloads of the SSE `data:` lines, in order.
    pub fn sse_data(&self) -> Vec<String> {
        self.body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| data.trim_start().to_string())
            .collect()
    }

    /// The UI message stream chunks, `[DONE]` excluded.
    pub fn ui_chunks(&self) -> Vec<serde_json::Value> {
        self.sse_data()
            .iter()
            .filter_map(|data| serde_json::from_str(data).ok())
            .collect()
    }

    /// Concatenated `text-delta` payloads.
    pub fn text(&self) -> String {
        self.ui_chunks()
            .iter()
            .filter(|c| c["type"] == "text-delta")
            .filter_map(|c| c["delta"].as_str())
            .collect()
    }
}

/// A complete in-process gateway over mock adapters.
pub struct TestHarness {
    pub agent: Arc<MockAgent>,
    pub model: Arc<MockTextModel>,
    pub forwarder: Arc<Forwarder>,
    router: Router,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Sends a request through the router and buffers the response.
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse, MomaError> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| MomaError::Internal(format!("router failed: {e}")))?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| MomaError::Internal(format!("failed to read body: {e}")))?;
        Ok(TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TestResponse, MomaError> {
        let request = Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .map_err(|e| MomaError::Internal(e.to_string()))?;
        self.send(request).await
    }

    /// Posts a single user message to `/chat`.
    pub async fn chat(&self, text: &str) -> Result<TestResponse, MomaError> {
        let body = serde_json::json!({
            "messages": [{"role": "user", "content": text}]
        });
        self.post_json("/chat", &body).await
    }
}
