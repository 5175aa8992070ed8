// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the request pipeline.

use std::path::PathBuf;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::MomaError;
use crate::value::TraceValue;

/// Unique identifier for a conversation session with the remote agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Mints a fresh random session identifier.
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Agent,
    TextModel,
    Attachment,
}

// --- Chat messages ---

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One part of a message's content, in the UI wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// A file reference (typically a `data:` URL).
    File {
        #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Any part kind this service does not interpret (reasoning, tool calls, ...).
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    /// Convenience constructor for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// A chat message as sent by the UI.
///
/// Accepts either `content` (a string or an array of parts) or `parts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawChatMessage")]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ChatMessage {
    /// Builds a message with a single text part.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            parts: vec![ContentPart::text(text)],
        }
    }
}

#[derive(Deserialize)]
struct RawChatMessage {
    #[serde(default)]
    id: Option<String>,
    role: Role,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    parts: Option<Vec<ContentPart>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl From<RawChatMessage> for ChatMessage {
    fn from(raw: RawChatMessage) -> Self {
        let parts = match (raw.parts, raw.content) {
            (Some(parts), _) => parts,
            (None, Some(RawContent::Parts(parts))) => parts,
            (None, Some(RawContent::Text(text))) => vec![ContentPart::Text { text }],
            (None, None) => Vec::new(),
        };
        Self {
            id: raw.id,
            role: raw.role,
            parts,
        }
    }
}

/// A message reduced to role plus flattened text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMessage {
    pub role: Role,
    pub text: String,
}

// --- Agent types ---

/// A request to the remote conversational agent.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    /// Text sent to the agent, policy suffix included.
    pub input_text: String,
    /// Session correlating this exchange on the agent side.
    pub session_id: SessionId,
    /// Ask the agent to emit trace events alongside chunks.
    pub enable_trace: bool,
}

/// One event of the agent's chunked reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A slice of the completion, plus optional citation metadata.
    Chunk {
        bytes: Vec<u8>,
        attribution: Option<TraceValue>,
    },
    /// Orchestration trace metadata.
    Trace(TraceValue),
    /// Any other event type the agent emits (return control, files, ...).
    Other {
        event_type: String,
        payload: TraceValue,
    },
}

/// Stream of agent events.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, MomaError>> + Send>>;

/// Reply to an [`AgentInvocation`].
pub struct AgentResponse {
    /// Session id echoed by the agent.
    pub session_id: SessionId,
    /// The completion stream. `None` when the agent returned no stream at all.
    pub completion: Option<AgentEventStream>,
}

impl std::fmt::Debug for AgentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentResponse")
            .field("session_id", &self.session_id)
            .field("completion", &self.completion.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

// --- Text model types ---

/// A request to a text-generation model.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<NormalizedMessage>,
}

impl TextRequest {
    /// Builds a single-prompt request.
    pub fn prompt(model: impl Into<String>, system: Option<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system,
            messages: vec![NormalizedMessage {
                role: Role::User,
                text: prompt.into(),
            }],
        }
    }
}

/// Stream of text deltas from a text model.
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String, MomaError>> + Send>>;

// --- Attachment types ---

/// Kind of attachment, as shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Document,
    File,
}

/// Why an attachment is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningReason {
    Uploading,
}

/// Lifecycle status of an attachment.
///
/// Transitions are monotonic: `running` may move to any state,
/// `requires-action` may only complete or fail, and `complete`/`incomplete`
/// are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AttachmentStatus {
    Running { reason: RunningReason, progress: u8 },
    RequiresAction { reason: String },
    Complete,
    Incomplete { reason: String },
}

impl AttachmentStatus {
    fn rank(&self) -> u8 {
        match self {
            AttachmentStatus::Running { .. } => 0,
            AttachmentStatus::RequiresAction { .. } => 1,
            AttachmentStatus::Complete | AttachmentStatus::Incomplete { .. } => 2,
        }
    }

    /// True for `complete` and `incomplete`.
    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    /// Moves to `next`, rejecting any regression or exit from a terminal state.
    pub fn advance(&mut self, next: AttachmentStatus) -> Result<(), MomaError> {
        let allowed = match (&*self, &next) {
            (
                AttachmentStatus::Running { progress: from, .. },
                AttachmentStatus::Running { progress: to, .. },
            ) => to >= from,
            (current, next) => !current.is_terminal() && next.rank() > current.rank(),
        };
        if !allowed {
            return Err(MomaError::Internal(format!(
                "invalid attachment status transition {self:?} -> {next:?}"
            )));
        }
        *self = next;
        Ok(())
    }
}

/// Where an uploaded file's bytes live.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

/// A user-selected file: name, declared MIME type, declared size and bytes.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub source: FileSource,
}

impl FileHandle {
    /// A file whose bytes are already in memory. The declared size is the
    /// buffer length.
    pub fn in_memory(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            source: FileSource::Memory(data),
        }
    }
}

/// An attachment accepted by `add` but not yet sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub name: String,
    pub content_type: String,
    pub status: AttachmentStatus,
    #[serde(skip)]
    pub file: FileHandle,
}

/// An attachment ready to be placed into a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub name: String,
    pub content_type: String,
    pub status: AttachmentStatus,
    pub content: Vec<ContentPart>,
}
