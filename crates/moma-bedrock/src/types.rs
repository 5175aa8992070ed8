// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response types for the Bedrock agent and model runtimes.
//!
//! Only the fields this service reads or writes are modelled. Trace payloads
//! stay untyped (`serde_json::Value`) and are converted to `TraceValue` by
//! the adapters.

use serde::{Deserialize, Serialize};

// --- InvokeAgent ---

/// Body of `POST /agents/{agentId}/agentAliases/{aliasId}/sessions/{sessionId}/text`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeAgentRequest {
    /// Text sent to the agent.
    pub input_text: String,
    /// Ask the agent to emit trace events.
    pub enable_trace: bool,
    /// Close the session after this turn.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub end_session: bool,
}

/// Payload of a `chunk` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadPart {
    /// Base64-encoded completion bytes.
    #[serde(default)]
    pub bytes: Option<String>,
    /// Citation metadata (retrieved references with source locations).
    #[serde(default)]
    pub attribution: Option<serde_json::Value>,
}

// --- ConverseStream ---

/// Body of `POST /model/{modelId}/converse-stream`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseStreamRequest {
    pub messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<TextBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<InferenceConfig>,
}

/// A conversation turn. Converse only accepts `user` and `assistant` roles.
#[derive(Debug, Clone, Serialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<TextBlock>,
}

/// A text content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

/// Generation parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Payload of a `contentBlockDelta` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDeltaEvent {
    #[serde(default)]
    pub content_block_index: usize,
    pub delta: ContentDelta,
}

/// Delta within a content block. Non-text deltas (tool use) carry no `text`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentDelta {
    #[serde(default)]
    pub text: Option<String>,
}

// --- Errors ---

/// JSON body of a Bedrock error response or exception event.
///
/// The services are inconsistent about the casing of `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}
