// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /chat, POST /attachments, POST /actions and GET /health.

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response, Sse},
};
use futures::StreamExt;
use moma_actions::ActionResponse;
use moma_core::types::{CompleteAttachment, FileHandle, FileSource};
use moma_core::{ChatMessage, ErrorKind, HealthStatus, MomaError};
use moma_forwarder::ForwardRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::server::AppState;
use crate::sse::{self, UI_MESSAGE_STREAM_HEADER, UI_MESSAGE_STREAM_VERSION};

/// Header carrying the attachment's file name.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Response header carrying the agent session id of a chat reply.
pub const SESSION_ID_HEADER: &str = "x-moma-session-id";

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` or `unhealthy`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
}

/// A [`MomaError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub MomaError);

impl From<MomaError> for ApiError {
    fn from(e: MomaError) -> Self {
        ApiError(e)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::SizeLimit => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Auth => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            error!(kind = %kind, error = %self.0, "request failed");
        } else {
            warn!(kind = %kind, error = %self.0, "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind,
        };
        (status, Json(body)).into_response()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /chat
///
/// Forwards the conversation to the agent and streams the normalized reply
/// as a UI message stream.
pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| MomaError::Input(e.body_text()))?;
    debug!(messages = request.messages.len(), "chat request received");

    let outcome = state
        .forwarder
        .forward(ForwardRequest {
            messages: request.messages,
            session_id: request.session_id,
        })
        .await?;
    info!(session_id = %outcome.session_id, urls = outcome.urls.len(), "streaming reply");

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(UI_MESSAGE_STREAM_HEADER),
        HeaderValue::from_static(UI_MESSAGE_STREAM_VERSION),
    );
    if let Ok(value) = HeaderValue::from_str(outcome.session_id.as_str()) {
        headers.insert(HeaderName::from_static(SESSION_ID_HEADER), value);
    }
    Ok((headers, Sse::new(sse::ui_message_stream(outcome))).into_response())
}

/// Reads the upload, failing as soon as it grows past `limit` bytes.
async fn read_upload(body: Body, limit: u64) -> Result<Vec<u8>, MomaError> {
    let mut stream = body.into_data_stream();
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| MomaError::Input(format!("failed to read attachment body: {e}")))?;
        data.extend_from_slice(&chunk);
        let size = data.len() as u64;
        if size > limit {
            return Err(MomaError::SizeLimit { size, limit });
        }
    }
    Ok(data)
}

/// POST /attachments
///
/// The declared size and type are validated before the body is read.
pub async fn post_attachment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<CompleteAttachment>, ApiError> {
    let content_type = header_str(&headers, CONTENT_TYPE)
        .unwrap_or("application/octet-stream")
        .to_string();
    let name = header_str(&headers, FILE_NAME_HEADER)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("attachment")
        .to_string();
    let declared = header_str(&headers, CONTENT_LENGTH)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let mut pending = state
        .attachments
        .add(FileHandle {
            name,
            content_type,
            size: declared,
            source: FileSource::Memory(Vec::new()),
        })
        .await?;

    let data = match read_upload(body, state.max_attachment_bytes).await {
        Ok(data) => data,
        Err(e) => {
            if let Err(remove_err) = state.attachments.remove(pending).await {
                debug!(error = %remove_err, "failed to discard attachment");
            }
            return Err(e.into());
        }
    };

    pending.file.size = data.len() as u64;
    pending.file.source = FileSource::Memory(data);
    let complete = state.attachments.send(pending).await?;
    info!(id = %complete.id, name = %complete.name, "attachment ready");
    Ok(Json(complete))
}

/// POST /actions
///
/// Malformed events are answered inside the action-group envelope; only a
/// body that is not JSON at all is rejected.
pub async fn post_actions(
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(event) = payload.map_err(|e| MomaError::Input(e.body_text()))?;
    Ok(Json(moma_actions::handle_value(event)))
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, detail) = match state.forwarder.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", None),
        Ok(HealthStatus::Degraded(reason)) => ("degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => ("unhealthy", Some(reason)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.start_time.elapsed().as_secs(),
            detail,
        }),
    )
}
