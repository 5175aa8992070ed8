// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text model adapter trait for streaming text generation.

use async_trait::async_trait;

use crate::error::MomaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{TextDeltaStream, TextRequest};

/// Adapter for a hosted text-generation model.
#[async_trait]
pub trait TextModelAdapter: PluginAdapter {
    /// Sends a request and returns a stream of text deltas.
    async fn stream_text(&self, request: TextRequest) -> Result<TextDeltaStream, MomaError>;
}
