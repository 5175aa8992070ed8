// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock agent adapter for deterministic testing.
//!
//! `MockAgent` implements `AgentAdapter` with scripted replies, so the
//! forwarder and gateway can be exercised without a Bedrock endpoint.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use moma_core::types::{
    AdapterType, AgentEvent, AgentEventStream, AgentInvocation, AgentResponse, HealthStatus,
};
use moma_core::{AgentAdapter, MomaError, PluginAdapter, TraceValue};

/// One event in a scripted reply.
#[derive(Debug, Clone)]
pub enum MockEvent {
    Chunk(String),
    /// A chunk carrying citation metadata.
    Attributed(String, serde_json::Value),
    Trace(serde_json::Value),
    /// An error item in the middle of the stream.
    Error(String),
}

/// A scripted reply to one invocation.
#[derive(Debug)]
pub enum MockReply {
    Events(Vec<MockEvent>),
    /// The agent answers without a completion stream.
    NoStream,
    /// `invoke` itself fails.
    Fail(MomaError),
    /// `invoke` never returns.
    Hang,
}

impl MockReply {
    /// A reply made of plain text chunks.
    pub fn chunks(chunks: &[&str]) -> Self {
        MockReply::Events(chunks.iter().map(|c| MockEvent::Chunk(c.to_string())).collect())
    }
}

fn to_event(event: MockEvent) -> Result<AgentEvent, MomaError> {
    match event {
        MockEvent::Chunk(text) => Ok(AgentEvent::Chunk {
            bytes: text.into_bytes(),
            attribution: None,
        }),
        MockEvent::Attributed(text, attribution) => Ok(AgentEvent::Chunk {
            bytes: text.into_bytes(),
            attribution: Some(TraceValue::from(attribution)),
        }),
        MockEvent::Trace(value) => Ok(AgentEvent::Trace(TraceValue::from(value))),
        MockEvent::Error(message) => Err(MomaError::upstream(message)),
    }
}

/// A mock agent that plays back scripted replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty, a single
/// "mock response" chunk is returned. Every invocation is recorded.
pub struct MockAgent {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    invocations: Arc<Mutex<Vec<AgentInvocation>>>,
    health: HealthStatus,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            invocations: Arc::new(Mutex::new(Vec::new())),
            health: HealthStatus::Healthy,
        }
    }

    /// Reports `health` from `health_check`.
    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Invocations received so far, oldest first.
    pub async fn invocations(&self) -> Vec<AgentInvocation> {
        self.invocations.lock().await.clone()
    }

    async fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockReply::chunks(&["mock response"]))
    }
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockAgent {
    fn name(&self) -> &str {
        "mock-agent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, MomaError> {
        Ok(self.health.clone())
    }
}

#[async_trait]
impl AgentAdapter for MockAgent {
    async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentResponse, MomaError> {
        let session_id = invocation.session_id.clone();
        self.invocations.lock().await.push(invocation);

        let completion: Option<AgentEventStream> = match self.next_reply().await {
            MockReply::Events(events) => {
                Some(Box::pin(stream::iter(events.into_iter().map(to_event))))
            }
            MockReply::NoStream => None,
            MockReply::Fail(e) => return Err(e),
            MockReply::Hang => std::future::pending().await,
        };
        Ok(AgentResponse {
            session_id,
            completion,
        })
    }
}
