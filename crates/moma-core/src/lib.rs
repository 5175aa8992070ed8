// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the moma chat forwarder.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the Bedrock adapters, the request forwarder, the attachment
//! adapter and the HTTP gateway.

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, MomaError};
pub use types::{
    AdapterType, AgentEvent, AgentEventStream, AgentInvocation, AgentResponse, ChatMessage,
    ContentPart, HealthStatus, NormalizedMessage, Role, SessionId, TextDeltaStream, TextRequest,
};
pub use value::TraceValue;

pub use traits::{AgentAdapter, AttachmentAdapter, PluginAdapter, TextModelAdapter};
