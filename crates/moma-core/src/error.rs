// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the moma chat forwarder.

use serde::Serialize;
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all moma adapters and request handling.
#[derive(Debug, Error)]
pub enum MomaError {
    /// Malformed or empty message list, unsupported attachment type.
    #[error("invalid input: {0}")]
    Input(String),

    /// Attachment exceeds the configured size threshold.
    #[error("attachment of {size} bytes exceeds the {limit} byte limit")]
    SizeLimit { size: u64, limit: u64 },

    /// Remote agent or model failure (network error, absent completion stream,
    /// error event in the stream).
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Missing or rejected AWS credentials.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Configuration errors (invalid TOML, missing identifiers).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`MomaError`], exposed to API clients.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    SizeLimit,
    Upstream,
    Auth,
    Timeout,
    Config,
    Internal,
}

impl MomaError {
    /// Shorthand for an upstream error without an underlying source.
    pub fn upstream(message: impl Into<String>) -> Self {
        MomaError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MomaError::Input(_) => ErrorKind::Input,
            MomaError::SizeLimit { .. } => ErrorKind::SizeLimit,
            MomaError::Upstream { .. } => ErrorKind::Upstream,
            MomaError::Auth(_) => ErrorKind::Auth,
            MomaError::Timeout { .. } => ErrorKind::Timeout,
            MomaError::Config(_) => ErrorKind::Config,
            MomaError::Internal(_) => ErrorKind::Internal,
        }
    }
}
