// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for moma integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without AWS.
//!
//! # Components
//!
//! - [`MockAgent`] - Mock agent with scripted chunked replies
//! - [`MockTextModel`] - Mock text model with scripted deltas
//! - [`TestHarness`] - The gateway router over both mocks

pub mod harness;
pub mod mock_agent;
pub mod mock_model;

pub use harness::{TestHarness, TestResponse};
pub use mock_agent::{MockAgent, MockEvent, MockReply};
pub use mock_model::MockTextModel;
