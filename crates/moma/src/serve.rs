// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `moma serve` and `moma config show`.
//!
//! Wires the Bedrock adapters, the forwarder and the attachment adapter into
//! the gateway state, then serves until Ctrl-C.

use std::sync::Arc;

use moma_attachment::DocumentAttachmentAdapter;
use moma_bedrock::credentials::Credentials;
use moma_bedrock::{BedrockAgent, BedrockTextModel};
use moma_config::MomaConfig;
use moma_core::{MomaError, TextModelAdapter};
use moma_forwarder::Forwarder;
use moma_gateway::AppState;
use tracing::{info, warn};

/// Runs the gateway until shutdown.
pub async fn run_serve(config: MomaConfig) -> Result<(), MomaError> {
    init_tracing(&config.server.log_level);

    info!("starting moma serve");

    let state = build_state(&config)?;
    let router = moma_gateway::build_router(state);
    moma_gateway::start_server(&config.server.host, config.server.port, router).await
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, MomaError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| MomaError::Config(format!("{key} must be set to serve requests")))
}

/// Builds the shared handler state from validated configuration.
pub fn build_state(config: &MomaConfig) -> Result<AppState, MomaError> {
    let agent_id = required(&config.bedrock.agent_id, "bedrock.agent_id")?;
    let agent_alias_id = required(&config.bedrock.agent_alias_id, "bedrock.agent_alias_id")?;

    let client = moma_bedrock::build_client(&config.bedrock)?;
    if !client.has_credentials() {
        warn!("no AWS credentials found; requests will fail until they are provided");
    }

    let agent = Arc::new(BedrockAgent::new(client.clone(), agent_id, agent_alias_id));
    let model: Arc<dyn TextModelAdapter> =
        Arc::new(BedrockTextModel::new(client, config.bedrock.model_id.clone()));
    let forwarder = Arc::new(Forwarder::new(
        agent,
        Some(model),
        config.bedrock.model_id.clone(),
        config.forwarder.clone(),
    ));
    info!(
        agent_id,
        normalization = ?config.forwarder.normalization,
        timeout_secs = config.forwarder.request_timeout_secs,
        "forwarder ready"
    );

    let attachments = Arc::new(DocumentAttachmentAdapter::new(&config.attachment));
    Ok(AppState::new(
        forwarder,
        attachments,
        config.attachment.max_bytes,
    ))
}

/// Renders the effective configuration as TOML. Secrets are never
/// serialized; a trailing comment reports where credentials come from.
pub fn render_config(config: &MomaConfig) -> Result<String, MomaError> {
    let mut rendered = toml::to_string_pretty(config)
        .map_err(|e| MomaError::Internal(format!("failed to render configuration: {e}")))?;

    let credentials = match Credentials::resolve(&config.bedrock) {
        Some(creds) => format!("access key {} (secret redacted)", mask(&creds.access_key_id)),
        None => "none".to_string(),
    };
    rendered.push_str(&format!("\n# aws credentials: {credentials}\n"));
    Ok(rendered)
}

/// Keeps the first four characters of an identifier.
fn mask(id: &str) -> String {
    let visible: String = id.chars().take(4).collect();
    format!("{visible}****")
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("moma={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
