// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the moma chat forwarder.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Top-level moma configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MomaConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// AWS Bedrock agent and model settings.
    #[serde(default)]
    pub bedrock: BedrockConfig,

    /// Request forwarding behavior.
    #[serde(default)]
    pub forwarder: ForwarderConfig,

    /// Attachment validation limits.
    #[serde(default)]
    pub attachment: AttachmentConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// AWS Bedrock configuration.
///
/// Credentials left unset here are resolved from `AWS_ACCESS_KEY_ID`,
/// `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` at startup. Secrets are
/// never serialized back out.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// AWS region hosting the agent and the model.
    #[serde(default = "default_region")]
    pub region: String,

    /// Bedrock agent identifier.
    #[serde(default)]
    pub agent_id: Option<String>,

    /// Bedrock agent alias identifier.
    #[serde(default)]
    pub agent_alias_id: Option<String>,

    /// Text model used for the model normalization pass.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// AWS access key id.
    #[serde(default, skip_serializing)]
    pub access_key_id: Option<String>,

    /// AWS secret access key.
    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<SecretString>,

    /// AWS session token for temporary credentials.
    #[serde(default, skip_serializing)]
    pub session_token: Option<SecretString>,

    /// Override for the agent runtime endpoint (VPC endpoints, testing).
    #[serde(default)]
    pub agent_endpoint: Option<String>,

    /// Override for the model runtime endpoint.
    #[serde(default)]
    pub runtime_endpoint: Option<String>,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            agent_id: None,
            agent_alias_id: None,
            model_id: default_model_id(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            agent_endpoint: None,
            runtime_endpoint: None,
        }
    }
}

impl std::fmt::Debug for BedrockConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BedrockConfig")
            .field("region", &self.region)
            .field("agent_id", &self.agent_id)
            .field("agent_alias_id", &self.agent_alias_id)
            .field("model_id", &self.model_id)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[redacted]"),
            )
            .field("agent_endpoint", &self.agent_endpoint)
            .field("runtime_endpoint", &self.runtime_endpoint)
            .finish()
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string()
}

/// How the drained completion is normalized before it is streamed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Remove every whitespace character.
    #[default]
    Strip,
    /// Collapse whitespace runs into a single space and trim.
    Collapse,
    /// Ask the text model to remove whitespace and stream its answer.
    Model,
}

/// Request forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForwarderConfig {
    /// Sentence appended to every user message sent to the agent.
    #[serde(default = "default_policy_suffix")]
    pub policy_suffix: String,

    /// Completion normalization mode.
    #[serde(default)]
    pub normalization: NormalizationMode,

    /// System instruction for the model normalization pass.
    #[serde(default = "default_normalization_instruction")]
    pub normalization_instruction: String,

    /// Deadline for one chat request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Use a client-supplied `sessionId` instead of minting one per request.
    #[serde(default)]
    pub reuse_client_session: bool,

    /// Ask the agent for trace events (the source of collected URLs).
    #[serde(default = "default_enable_trace")]
    pub enable_trace: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            policy_suffix: default_policy_suffix(),
            normalization: NormalizationMode::default(),
            normalization_instruction: default_normalization_instruction(),
            request_timeout_secs: default_request_timeout_secs(),
            reuse_client_session: false,
            enable_trace: default_enable_trace(),
        }
    }
}

fn default_policy_suffix() -> String {
    "Assume that all hospitals in the knowledge base are covered.".to_string()
}

fn default_normalization_instruction() -> String {
    "Return the user's text exactly, with all whitespace and newlines removed, \
     as a single inline line. Output nothing else."
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_enable_trace() -> bool {
    true
}

/// Attachment validation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Comma-separated accepted MIME types.
    #[serde(default = "default_accept")]
    pub accept: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            accept: default_accept(),
        }
    }
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_accept() -> String {
    "application/pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MomaConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.forwarder.request_timeout_secs, 30);
        assert_eq!(config.forwarder.normalization, NormalizationMode::Strip);
        assert!(!config.forwarder.reuse_client_session);
        assert_eq!(config.attachment.max_bytes, 10_485_760);
        assert_eq!(config.attachment.accept, "application/pdf");
    }

    #[test]
    fn bedrock_debug_redacts_secrets() {
        let config = BedrockConfig {
            secret_access_key: Some(SecretString::from("very-secret".to_string())),
            session_token: Some(SecretString::from("token-secret".to_string())),
            ..BedrockConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("token-secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let config = BedrockConfig {
            secret_access_key: Some(SecretString::from("very-secret".to_string())),
            ..BedrockConfig::default()
        };
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("very-secret"));
        assert!(toml.contains("us-east-1"));
    }
}
