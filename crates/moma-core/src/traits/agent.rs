// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent adapter trait for remote conversational agents (Bedrock Agents).

use async_trait::async_trait;

use crate::error::MomaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AgentInvocation, AgentResponse};

/// Adapter for a managed conversational agent.
///
/// The agent takes free text plus a session identifier and answers with a
/// chunked event stream.
#[async_trait]
pub trait AgentAdapter: PluginAdapter {
    /// Invokes the agent. The returned response holds the undrained stream.
    async fn invoke(&self, invocation: AgentInvocation) -> Result<AgentResponse, MomaError>;
}
