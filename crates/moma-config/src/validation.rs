// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind hosts, AWS identifiers and non-zero limits.

use crate::diagnostic::ConfigError;
use crate::model::{MomaConfig, NormalizationMode};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MomaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level `{}` must be one of {}",
            config.server.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let region = &config.bedrock.region;
    if region.is_empty()
        || !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        fail(format!("bedrock.region `{region}` is not a valid AWS region"));
    }

    for (key, value) in [
        ("bedrock.agent_id", &config.bedrock.agent_id),
        ("bedrock.agent_alias_id", &config.bedrock.agent_alias_id),
    ] {
        if let Some(id) = value {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
                fail(format!("{key} `{id}` must be a non-empty alphanumeric identifier"));
            }
        }
    }

    if config.forwarder.normalization == NormalizationMode::Model
        && config.bedrock.model_id.trim().is_empty()
    {
        fail("bedrock.model_id must be set when forwarder.normalization = \"model\"".to_string());
    }

    if config.forwarder.request_timeout_secs == 0 {
        fail("forwarder.request_timeout_secs must be greater than 0".to_string());
    }

    if config.attachment.max_bytes == 0 {
        fail("attachment.max_bytes must be greater than 0".to_string());
    }

    if config
        .attachment
        .accept
        .split(',')
        .all(|t| t.trim().is_empty())
    {
        fail("attachment.accept must list at least one MIME type".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
