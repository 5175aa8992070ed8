// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed HTTP client for the Bedrock agent and model runtimes.
//!
//! [`BedrockClient`] builds request URLs, signs each request with SigV4 and
//! hands back the decoded event stream. Requests are not retried.

use std::time::Duration;

use moma_config::model::BedrockConfig;
use moma_core::MomaError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::credentials::{self, Credentials};
use crate::eventstream::{self, MessageStream};
use crate::sigv4::{uri_encode, SignableRequest, Signer};
use crate::types::{ApiErrorResponse, ConverseStreamRequest, InvokeAgentRequest};

/// SigV4 service name shared by both runtimes.
const SIGNING_SERVICE: &str = "bedrock";

/// Response header carrying the agent session id.
pub const SESSION_ID_HEADER: &str = "x-amzn-bedrock-agent-session-id";

const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// Decoded reply of an InvokeAgent call.
pub struct AgentStreamReply {
    /// Session id echoed in the response headers, if any.
    pub session_id: Option<String>,
    /// `None` when the agent answered with an empty body.
    pub stream: Option<MessageStream>,
}

impl std::fmt::Debug for AgentStreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentStreamReply")
            .field("session_id", &self.session_id)
            .field("stream", &self.stream.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// HTTP client for Bedrock.
#[derive(Debug)]
pub struct BedrockClient {
    http: reqwest::Client,
    region: String,
    agent_base: String,
    runtime_base: String,
    credentials: Option<Credentials>,
}

impl BedrockClient {
    /// Creates a client, resolving credentials from config and environment.
    pub fn new(config: &BedrockConfig) -> Result<Self, MomaError> {
        Self::with_credentials(config, Credentials::resolve(config))
    }

    /// Creates a client with explicitly supplied credentials.
    pub fn with_credentials(
        config: &BedrockConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, MomaError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MomaError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let agent_base = config.agent_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-agent-runtime.{}.amazonaws.com", config.region)
        });
        let runtime_base = config.runtime_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", config.region)
        });

        if credentials.is_none() {
            warn!("no AWS credentials found; Bedrock calls will fail until they are provided");
        }

        Ok(Self {
            http,
            region: config.region.clone(),
            agent_base: agent_base.trim_end_matches('/').to_string(),
            runtime_base: runtime_base.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Calls InvokeAgent and returns the undrained completion stream.
    pub async fn invoke_agent(
        &self,
        agent_id: &str,
        agent_alias_id: &str,
        session_id: &str,
        request: &InvokeAgentRequest,
    ) -> Result<AgentStreamReply, MomaError> {
        let url = build_url(
            &self.agent_base,
            &[
                "agents",
                agent_id,
                "agentAliases",
                agent_alias_id,
                "sessions",
                session_id,
                "text",
            ],
        )?;
        let response = self.post_signed(url, request).await?;

        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if response.content_length() == Some(0) {
            debug!("agent returned an empty body");
            return Ok(AgentStreamReply {
                session_id,
                stream: None,
            });
        }

        Ok(AgentStreamReply {
            session_id,
            stream: Some(eventstream::decode_stream(response.bytes_stream())),
        })
    }

    /// Calls ConverseStream for `model_id`.
    pub async fn converse_stream(
        &self,
        model_id: &str,
        request: &ConverseStreamRequest,
    ) -> Result<MessageStream, MomaError> {
        let url = build_url(&self.runtime_base, &["model", model_id, "converse-stream"])?;
        let response = self.post_signed(url, request).await?;
        Ok(eventstream::decode_stream(response.bytes_stream()))
    }

    async fn post_signed<T: Serialize>(
        &self,
        url: Url,
        body: &T,
    ) -> Result<reqwest::Response, MomaError> {
        let credentials = credentials::require(self.credentials.as_ref())?;
        let body = serde_json::to_vec(body)
            .map_err(|e| MomaError::Internal(format!("failed to serialize request: {e}")))?;

        let signed = Signer::new(credentials, &self.region, SIGNING_SERVICE).sign(
            &SignableRequest {
                method: "POST",
                url: &url,
                headers: &[("content-type", "application/json")],
                body: &body,
            },
            chrono::Utc::now(),
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE));
        for (name, value) in signed.headers() {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| MomaError::Auth(format!("invalid {name} header value: {e}")))?;
            headers.insert(HeaderName::from_static(name), value);
        }

        debug!(url = %url, "sending signed Bedrock request");
        let response = self
            .http
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| MomaError::Upstream {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "Bedrock response received");
        if status.is_success() {
            return Ok(response);
        }

        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(':').next().unwrap_or(v).to_string());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, error_type.as_deref(), &body))
    }
}

/// Joins `base` with URI-encoded path segments.
fn build_url(base: &str, segments: &[&str]) -> Result<Url, MomaError> {
    let path: String = segments.iter().map(|s| format!("/{}", uri_encode(s))).collect();
    Url::parse(&format!("{base}{path}"))
        .map_err(|e| MomaError::Config(format!("invalid Bedrock endpoint {base}: {e}")))
}

fn status_error(status: StatusCode, error_type: Option<&str>, body: &str) -> MomaError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());
    let message = match error_type {
        Some(kind) => format!("Bedrock returned {status} ({kind}): {detail}"),
        None => format!("Bedrock returned {status}: {detail}"),
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MomaError::Auth(message),
        _ => MomaError::upstream(message),
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use wiremock::matchers::{header, header_exists, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::eventstream::encode_event;

    fn test_client(server: &MockServer) -> BedrockClient {
        let config = BedrockConfig {
            agent_endpoint: Some(server.uri()),
            runtime_endpoint: Some(format!("{}/", server.uri())),
            ..Default::default()
        };
        BedrockClient::with_credentials(&config, Some(Credentials::new("AKID", "secret", None)))
            .unwrap()
    }

    fn agent_request() -> InvokeAgentRequest {
        InvokeAgentRequest {
            input_text: "hello".into(),
            enable_trace: true,
            end_session: false,
        }
    }

    #[test]
    fn default_endpoints_follow_region() {
        let config = BedrockConfig {
            region: "eu-central-1".into(),
            ..Default::default()
        };
        let client = BedrockClient::with_credentials(&config, None).unwrap();
        assert_eq!(
            client.agent_base,
            "https://bedrock-agent-runtime.eu-central-1.amazonaws.com"
        );
        assert_eq!(
            client.runtime_base,
            "https://bedrock-runtime.eu-central-1.amazonaws.com"
        );
        assert!(!client.has_credentials());
    }

    #[test]
    fn build_url_encodes_model_id() {
        let url = build_url("https://host", &["model", "a.b-v1:0", "converse-stream"]).unwrap();
        assert_eq!(url.path(), "/model/a.b-v1%3A0/converse-stream");
    }

    #[tokio::test]
    async fn invoke_agent_streams_events_and_session_id() {
        let server = MockServer::start().await;
        let mut body = encode_event("chunk", &serde_json::json!({"bytes": "SGk="}));
        body.extend(encode_event("trace", &serde_json::json!({"trace": {}})));

        Mock::given(method("POST"))
            .and(path("/agents/AGENT1/agentAliases/ALIAS1/sessions/s-1/text"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_ID_HEADER, "s-1")
                    .set_body_raw(body, EVENT_STREAM_CONTENT_TYPE),
            )
            .mount(&server)
            .await;

        let reply = test_client(&server)
            .invoke_agent("AGENT1", "ALIAS1", "s-1", &agent_request())
            .await
            .unwrap();
        assert_eq!(reply.session_id.as_deref(), Some("s-1"));
        assert_eq!(
            format!("{reply:?}"),
            r#"AgentStreamReply { session_id: Some("s-1"), stream: Some("<stream>") }"#
        );
        let messages: Vec<_> = reply.stream.unwrap().collect().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].as_ref().unwrap().event_type(), Some("chunk"));
    }

    #[tokio::test]
    async fn empty_agent_body_yields_no_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let reply = test_client(&server)
            .invoke_agent("AGENT1", "ALIAS1", "s-1", &agent_request())
            .await
            .unwrap();
        assert!(reply.stream.is_none());
    }

    #[tokio::test]
    async fn forbidden_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-amzn-errortype", "AccessDeniedException:http://internal")
                    .set_body_json(serde_json::json!({"message": "denied"})),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .invoke_agent("AGENT1", "ALIAS1", "s-1", &agent_request())
            .await
            .unwrap_err();
        match err {
            MomaError::Auth(msg) => {
                assert!(msg.contains("AccessDeniedException"));
                assert!(msg.contains("denied"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .invoke_agent("AGENT1", "ALIAS1", "s-1", &agent_request())
            .await
            .unwrap_err();
        assert!(matches!(err, MomaError::Upstream { ref message, .. } if message.contains("boom")));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = BedrockConfig {
            agent_endpoint: Some(server.uri()),
            ..Default::default()
        };
        let client = BedrockClient::with_credentials(&config, None).unwrap();
        let err = client
            .invoke_agent("AGENT1", "ALIAS1", "s-1", &agent_request())
            .await
            .unwrap_err();
        assert!(matches!(err, MomaError::Auth(_)));
    }

    #[tokio::test]
    async fn converse_stream_posts_to_encoded_model_path() {
        let server = MockServer::start().await;
        let body = encode_event(
            "contentBlockDelta",
            &serde_json::json!({"contentBlockIndex": 0, "delta": {"text": "Hi"}}),
        );
        Mock::given(method("POST"))
            .and(path_regex(r"^/model/anthropic\.claude-v2(%3A|:)1/converse-stream$"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, EVENT_STREAM_CONTENT_TYPE))
            .mount(&server)
            .await;

        let request = ConverseStreamRequest {
            messages: vec![],
            system: vec![],
            inference_config: None,
        };
        let stream = test_client(&server)
            .converse_stream("anthropic.claude-v2:1", &request)
            .await
            .unwrap();
        let messages: Vec<_> = stream.collect().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].as_ref().unwrap().event_type(),
            Some("contentBlockDelta")
        );
    }
}
