// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Remote-service adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod agent;
pub mod attachment;
pub mod model;

pub use adapter::PluginAdapter;
pub use agent::AgentAdapter;
pub use attachment::AttachmentAdapter;
pub use model::TextModelAdapter;
