// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the moma chat forwarder.
//!
//! Exposes the chat endpoint consumed by the web UI, the attachment upload
//! endpoint, the action-group callback and a health probe. Chat replies are
//! streamed back in the UI message stream format.

pub mod handlers;
pub mod server;
pub mod sse;

pub use handlers::{ApiError, ChatRequest, ErrorResponse, HealthResponse};
pub use server::{AppState, build_router, start_server};
pub use sse::{UiChunk, ui_message_stream};
