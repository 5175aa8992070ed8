// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all remote-service adapters implement.

use async_trait::async_trait;

use crate::error::MomaError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for moma adapters.
///
/// Provides identity and health check capabilities for every adapter that
/// the gateway holds behind a trait object.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter (agent, text model, attachment).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, MomaError>;
}
