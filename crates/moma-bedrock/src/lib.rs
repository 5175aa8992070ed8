// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Amazon Bedrock adapters for the moma chat forwarder.
//!
//! [`BedrockAgent`] implements [`AgentAdapter`] on top of the agent runtime's
//! InvokeAgent operation and [`BedrockTextModel`] implements
//! [`TextModelAdapter`] on top of ConverseStream. Both share one
//! [`BedrockClient`], which signs requests with SigV4 and decodes the binary
//! event stream replies.

pub mod client;
pub mod credentials;
pub mod eventstream;
pub mod sigv4;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::stream::StreamExt;
use moma_config::model::BedrockConfig;
use moma_core::traits::{AgentAdapter, PluginAdapter, TextModelAdapter};
use moma_core::types::{
    AdapterType, AgentEvent, AgentInvocation, AgentResponse, HealthStatus, Role, SessionId,
    TextDeltaStream, TextRequest,
};
use moma_core::{MomaError, TraceValue};
use tracing::{debug, info};

pub use crate::client::BedrockClient;
use crate::eventstream::Message;
use crate::types::{
    ApiErrorResponse, ContentBlockDeltaEvent, ConverseMessage, ConverseStreamRequest,
    InferenceConfig, InvokeAgentRequest, PayloadPart, TextBlock,
};

/// Output cap for ConverseStream requests.
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Builds the shared client from the `[bedrock]` section.
pub fn build_client(config: &BedrockConfig) -> Result<Arc<BedrockClient>, MomaError> {
    let client = BedrockClient::new(config)?;
    info!(region = client.region(), "Bedrock client initialized");
    Ok(Arc::new(client))
}

fn health(client: &BedrockClient) -> HealthStatus {
    if client.has_credentials() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded("no AWS credentials configured".into())
    }
}

/// Turns an `exception`/`error` frame into an upstream error.
fn exception_error(message: &Message) -> MomaError {
    let kind = message
        .header_str(":exception-type")
        .or_else(|| message.header_str(":error-code"))
        .unwrap_or("unknown");
    let detail = serde_json::from_slice::<ApiErrorResponse>(&message.payload)
        .ok()
        .and_then(|e| e.message)
        .or_else(|| message.header_str(":error-message").map(String::from))
        .unwrap_or_else(|| String::from_utf8_lossy(&message.payload).into_owned());
    MomaError::upstream(format!("{kind}: {detail}"))
}

fn json_payload(message: &Message) -> Result<serde_json::Value, MomaError> {
    serde_json::from_slice(&message.payload).map_err(|e| MomaError::Upstream {
        message: format!("invalid event payload: {e}"),
        source: Some(Box::new(e)),
    })
}

// --- Agent ---

/// Bedrock agent adapter.
pub struct BedrockAgent {
    client: Arc<BedrockClient>,
    agent_id: String,
    agent_alias_id: String,
}

impl BedrockAgent {
    pub fn new(
        client: Arc<BedrockClient>,
        agent_id: impl Into<String>,
        agent_alias_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            agent_id: agent_id.into(),
            agent_alias_id: agent_alias_id.into(),
        }
    }
}

/// Maps one event stream frame to an [`AgentEvent`].
pub fn agent_event(message: Message) -> Result<AgentEvent, MomaError> {
    match message.message_type() {
        Some("event") => {}
        _ => return Err(exception_error(&message)),
    }

    match message.event_type() {
        Some("chunk") => {
            let part: PayloadPart = serde_json::from_slice(&message.payload).map_err(|e| {
                MomaError::Upstream {
                    message: format!("invalid chunk payload: {e}"),
                    source: Some(Box::new(e)),
                }
            })?;
            let bytes = match part.bytes {
                Some(encoded) => STANDARD.decode(encoded).map_err(|e| MomaError::Upstream {
                    message: format!("chunk bytes are not valid base64: {e}"),
                    source: Some(Box::new(e)),
                })?,
                None => Vec::new(),
            };
            Ok(AgentEvent::Chunk {
                bytes,
                attribution: part.attribution.map(TraceValue::from),
            })
        }
        Some("trace") => Ok(AgentEvent::Trace(TraceValue::from(json_payload(&message)?))),
        other => Ok(AgentEvent::Other {
            event_type: other.unwrap_or_default().to_string(),
            payload: TraceValue::from(json_payload(&message).unwrap_or(serde_json::Value::Null)),
        }),
    }
}

#[async_trait]
impl PluginAdapter for BedrockAgent {
    fn name(&self) -> &str {
        "bedrock-agent"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Agent
    }

    async fn health_check(&self) -> Result<HealthStatus, MomaError> {
        Ok(health(&self.client))
    }
}

#[async_trait]
impl AgentAdapter for BedrockAgent {
    async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentResponse, MomaError> {
        let request = InvokeAgentRequest {
            input_text: invocation.input_text,
            enable_trace: invocation.enable_trace,
            end_session: false,
        };
        debug!(
            agent_id = %self.agent_id,
            session_id = %invocation.session_id,
            "invoking Bedrock agent"
        );

        let reply = self
            .client
            .invoke_agent(
                &self.agent_id,
                &self.agent_alias_id,
                invocation.session_id.as_str(),
                &request,
            )
            .await?;

        let session_id = reply
            .session_id
            .map(SessionId)
            .unwrap_or(invocation.session_id);
        let completion = reply.stream.map(|stream| {
            let events = stream.map(|frame| frame.map_err(MomaError::from).and_then(agent_event));
            Box::pin(events) as moma_core::AgentEventStream
        });

        Ok(AgentResponse {
            session_id,
            completion,
        })
    }
}

// --- Text model ---

/// Bedrock ConverseStream adapter.
pub struct BedrockTextModel {
    client: Arc<BedrockClient>,
    default_model: String,
}

impl BedrockTextModel {
    pub fn new(client: Arc<BedrockClient>, default_model: impl Into<String>) -> Self {
        Self {
            client,
            default_model: default_model.into(),
        }
    }

    fn to_converse_request(request: &TextRequest) -> ConverseStreamRequest {
        let mut system: Vec<TextBlock> = request
            .system
            .iter()
            .map(|text| TextBlock { text: text.clone() })
            .collect();
        let mut messages = Vec::new();
        for message in &request.messages {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => {
                    system.push(TextBlock {
                        text: message.text.clone(),
                    });
                    continue;
                }
            };
            messages.push(ConverseMessage {
                role: role.into(),
                content: vec![TextBlock {
                    text: message.text.clone(),
                }],
            });
        }

        ConverseStreamRequest {
            messages,
            system,
            inference_config: Some(InferenceConfig {
                max_tokens: DEFAULT_MAX_TOKENS,
                temperature: None,
            }),
        }
    }
}

/// Extracts the text delta of a ConverseStream frame, if it carries one.
pub fn text_delta(message: Message) -> Option<Result<String, MomaError>> {
    if message.message_type() != Some("event") {
        return Some(Err(exception_error(&message)));
    }
    if message.event_type() != Some("contentBlockDelta") {
        return None;
    }
    match serde_json::from_slice::<ContentBlockDeltaEvent>(&message.payload) {
        Ok(event) => event.delta.text.map(Ok),
        Err(e) => Some(Err(MomaError::Upstream {
            message: format!("invalid contentBlockDelta payload: {e}"),
            source: Some(Box::new(e)),
        })),
    }
}

#[async_trait]
impl PluginAdapter for BedrockTextModel {
    fn name(&self) -> &str {
        "bedrock-converse"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::TextModel
    }

    async fn health_check(&self) -> Result<HealthStatus, MomaError> {
        Ok(health(&self.client))
    }
}

#[async_trait]
impl TextModelAdapter for BedrockTextModel {
    async fn stream_text(&self, request: TextRequest) -> Result<TextDeltaStream, MomaError> {
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };
        let body = Self::to_converse_request(&request);
        debug!(model, messages = body.messages.len(), "streaming from Bedrock model");

        let frames = self.client.converse_stream(model, &body).await?;
        let deltas = frames.filter_map(|frame| async move {
            match frame {
                Ok(message) => text_delta(message),
                Err(e) => Some(Err(MomaError::from(e))),
            }
        });
        Ok(Box::pin(deltas))
    }
}
