// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request forwarding pipeline for the moma chat forwarder.
//!
//! The [`Forwarder`] takes the UI's message list and:
//! - normalizes it and extracts the latest user text
//! - invokes the remote agent with the policy suffix appended
//! - drains the chunked reply, collecting URLs from trace payloads
//! - normalizes the completion, deterministically or through a text model
//!
//! The whole exchange runs under one deadline. Nothing is retried and no
//! partial completion is returned: the drain finishes before the outcome is
//! built.

pub mod completion;
pub mod drain;
pub mod messages;

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use moma_config::model::{ForwarderConfig, NormalizationMode};
use moma_core::types::{
    AgentInvocation, ChatMessage, HealthStatus, SessionId, TextDeltaStream, TextRequest,
};
use moma_core::{AgentAdapter, MomaError, TextModelAdapter};
use tokio::time::Instant;
use tracing::{debug, info};

pub use crate::drain::{Drained, UrlSet};

/// Longest session id the agent runtime accepts.
const MAX_SESSION_ID_LEN: usize = 100;

/// One chat request from the UI.
#[derive(Debug, Clone, Default)]
pub struct ForwardRequest {
    pub messages: Vec<ChatMessage>,
    /// Client-supplied session id, honoured only when configured.
    pub session_id: Option<String>,
}

/// The normalized completion.
pub enum CompletionBody {
    /// Fully normalized text.
    Text(String),
    /// Text deltas streamed by the normalization model.
    Deltas(TextDeltaStream),
}

impl std::fmt::Debug for CompletionBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            CompletionBody::Deltas(_) => f.write_str("Deltas(<stream>)"),
        }
    }
}

/// Everything the gateway needs to answer a chat request.
#[derive(Debug)]
pub struct ForwardOutcome {
    pub session_id: SessionId,
    /// Sorted, deduplicated URLs found in trace and attribution payloads.
    pub urls: Vec<String>,
    pub body: CompletionBody,
}

/// Forwards chat requests to the agent.
pub struct Forwarder {
    agent: Arc<dyn AgentAdapter>,
    model: Option<Arc<dyn TextModelAdapter>>,
    model_id: String,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(
        agent: Arc<dyn AgentAdapter>,
        model: Option<Arc<dyn TextModelAdapter>>,
        model_id: impl Into<String>,
        config: ForwarderConfig,
    ) -> Self {
        Self {
            agent,
            model,
            model_id: model_id.into(),
            config,
        }
    }

    /// Health of the agent adapter.
    pub async fn health_check(&self) -> Result<HealthStatus, MomaError> {
        self.agent.health_check().await
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Runs the pipeline under the request deadline.
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardOutcome, MomaError> {
        let duration = self.timeout();
        let deadline = Instant::now() + duration;
        match tokio::time::timeout_at(deadline, self.run(request, deadline)).await {
            Ok(result) => result,
            Err(_) => Err(MomaError::Timeout { duration }),
        }
    }

    async fn run(
        &self,
        request: ForwardRequest,
        deadline: Instant,
    ) -> Result<ForwardOutcome, MomaError> {
        let normalized = messages::normalize_messages(&request.messages);
        debug!(count = normalized.len(), "normalized messages");

        let text = messages::extract_user_text(&normalized)?;
        let input_text = messages::agent_input(text, &self.config.policy_suffix);
        debug!(input = %input_text, "extracted agent input");

        let session_id = self.session_for(request.session_id.as_deref())?;
        let response = self
            .agent
            .invoke(AgentInvocation {
                input_text,
                session_id,
                enable_trace: self.config.enable_trace,
            })
            .await?;
        let session_id = response.session_id;

        let Drained { completion, urls } = drain::drain(response.completion).await?;
        debug!(chars = completion.chars().count(), "completion drained");
        info!(
            session_id = %session_id,
            urls = urls.len(),
            mode = ?self.config.normalization,
            "agent reply received"
        );

        let body = match self.config.normalization {
            NormalizationMode::Strip => CompletionBody::Text(completion::strip_whitespace(&completion)),
            NormalizationMode::Collapse => {
                CompletionBody::Text(completion::collapse_whitespace(&completion))
            }
            NormalizationMode::Model => {
                let deltas = self.model_pass(completion).await?;
                CompletionBody::Deltas(with_deadline(deltas, deadline, self.timeout()))
            }
        };

        Ok(ForwardOutcome {
            session_id,
            urls: urls.into_vec(),
            body,
        })
    }

    fn session_for(&self, client_session: Option<&str>) -> Result<SessionId, MomaError> {
        match client_session {
            Some(id) if self.config.reuse_client_session && !id.is_empty() => {
                let valid = id.len() <= MAX_SESSION_ID_LEN
                    && id
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-'));
                if !valid {
                    return Err(MomaError::Input(format!("invalid sessionId `{id}`")));
                }
                Ok(SessionId(id.to_string()))
            }
            _ => Ok(SessionId::generate()),
        }
    }

    async fn model_pass(&self, completion: String) -> Result<TextDeltaStream, MomaError> {
        let model = self.model.as_ref().ok_or_else(|| {
            MomaError::Config("normalization = \"model\" requires a text model adapter".into())
        })?;
        let request = TextRequest::prompt(
            self.model_id.clone(),
            Some(self.config.normalization_instruction.clone()),
            completion,
        );
        model.stream_text(request).await
    }
}

/// Ends the stream with a timeout error once `deadline` passes, and after the
/// first error item.
fn with_deadline(deltas: TextDeltaStream, deadline: Instant, duration: Duration) -> TextDeltaStream {
    Box::pin(stream::unfold(Some(deltas), move |state| async move {
        let mut inner = state?;
        match tokio::time::timeout_at(deadline, inner.next()).await {
            Ok(Some(Ok(delta))) => Some((Ok(delta), Some(inner))),
            Ok(Some(Err(e))) => Some((Err(e), None)),
            Ok(None) => None,
            Err(_) => Some((Err(MomaError::Timeout { duration }), None)),
        }
    }))
}
