// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text model adapter.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use moma_core::types::{AdapterType, HealthStatus, TextDeltaStream, TextRequest};
use moma_core::{MomaError, PluginAdapter, TextModelAdapter};

/// A mock text model returning scripted delta lists.
///
/// When the queue is empty the prompt text is echoed back as one delta.
/// An `Err` entry in a script becomes an error item in the stream.
pub struct MockTextModel {
    scripts: Arc<Mutex<VecDeque<Vec<Result<String, String>>>>>,
    requests: Arc<Mutex<Vec<TextRequest>>>,
}

impl MockTextModel {
    pub fn new() -> Self {
        Self::with_deltas(Vec::new())
    }

    /// Each inner list is the delta sequence of one call.
    pub fn with_deltas(scripts: Vec<Vec<Result<String, String>>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockTextModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTextModel {
    fn name(&self) -> &str {
        "mock-text-model"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::TextModel
    }

    async fn health_check(&self) -> Result<HealthStatus, MomaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl TextModelAdapter for MockTextModel {
    async fn stream_text(&self, request: TextRequest) -> Result<TextDeltaStream, MomaError> {
        let echo = request
            .messages
            .last()
            .map(|m| m.text.clone())
            .unwrap_or_default();
        self.requests.lock().await.push(request);

        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| vec![Ok(echo)]);
        let items: Vec<Result<String, MomaError>> = script
            .into_iter()
            .map(|item| item.map_err(MomaError::upstream))
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
