// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `moma` binary.
//!
//! The binary runs as a child process against a wiremock server standing in
//! for both Bedrock endpoints. Each test writes its own config file and picks
//! its own port, so tests are independent and order-insensitive.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use moma_bedrock::eventstream::encode_event;
use wiremock::matchers::{header_exists, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENT_STREAM: &str = "application/vnd.amazon.eventstream";

/// Kills the child process on drop.
struct Running(Child);

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn moma() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_moma"));
    cmd.env_remove("AWS_ACCESS_KEY_ID")
        .env_remove("AWS_SECRET_ACCESS_KEY")
        .env_remove("AWS_SESSION_TOKEN")
        .env("RUST_LOG", "moma=debug,warn");
    cmd
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_config(dir: &Path, port: u16, endpoint: &str, extra: &str) -> std::path::PathBuf {
    let path = dir.join("moma.toml");
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[bedrock]
region = "us-east-1"
agent_id = "AGENT1"
agent_alias_id = "ALIAS1"
access_key_id = "AKIDEXAMPLE"
secret_access_key = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"
agent_endpoint = "{endpoint}"
runtime_endpoint = "{endpoint}"
{extra}
"#
    );
    std::fs::write(&path, toml).unwrap();
    path
}

async fn wait_until_ready(base: &str) {
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(response) = client.get(format!("{base}/health")).send().await {
            if response.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("moma did not become ready at {base}");
}

fn chunk(text: &str) -> Vec<u8> {
    encode_event("chunk", &serde_json::json!({"bytes": STANDARD.encode(text)}))
}

fn data_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|l| l.strip_prefix("data:"))
        .map(|d| d.trim_start().to_string())
        .collect()
}

#[tokio::test]
async fn chat_is_forwarded_to_bedrock_and_streamed_back() {
    let bedrock = MockServer::start().await;
    let mut body = encode_event(
        "trace",
        &serde_json::json!({"trace": {"orchestrationTrace": {"observation": {
            "knowledgeBaseLookupOutput": {"retrievedReferences": [
                {"location": {"s3Location": {"uri": "s3://kb/plan.pdf"}},
                 "metadata": {"source": "https://health.test/plan"}}
            ]}
        }}}}),
    );
    body.extend(chunk("Hospital A is "));
    body.extend(chunk("covered."));

    Mock::given(method("POST"))
        .and(path_regex(r"^/agents/AGENT1/agentAliases/ALIAS1/sessions/[^/]+/text$"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, EVENT_STREAM))
        .expect(1)
        .mount(&bedrock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let config = write_config(dir.path(), port, &bedrock.uri(), "");
    let _server = Running(
        moma()
            .args(["--config", config.to_str().unwrap(), "serve"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );
    let base = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({
            "messages": [{"role": "user", "content": "What hospitals are covered?"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-vercel-ai-ui-message-stream"], "v1");
    let text = response.text().await.unwrap();

    let lines = data_lines(&text);
    assert_eq!(lines.last().map(String::as_str), Some("[DONE]"));
    let chunks: Vec<serde_json::Value> = lines
        .iter()
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect();
    let urls: Vec<&str> = chunks
        .iter()
        .filter(|c| c["type"] == "source-url")
        .filter_map(|c| c["url"].as_str())
        .collect();
    assert_eq!(urls, vec!["https://health.test/plan"]);
    let reply: String = chunks
        .iter()
        .filter(|c| c["type"] == "text-delta")
        .filter_map(|c| c["delta"].as_str())
        .collect();
    assert_eq!(reply, "HospitalAiscovered.");

    let requests = bedrock.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        sent["inputText"],
        "What hospitals are covered? Assume that all hospitals in the knowledge base are covered."
    );
    assert_eq!(sent["enableTrace"], true);
}

#[tokio::test]
async fn model_normalization_uses_converse_stream() {
    let bedrock = MockServer::start().await;
    let mut agent_body = chunk("Hospital A is ");
    agent_body.extend(chunk("covered."));
    Mock::given(method("POST"))
        .and(path_regex(r"^/agents/.+/text$"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(agent_body, EVENT_STREAM))
        .mount(&bedrock)
        .await;

    let mut model_body = Vec::new();
    for delta in ["Hospital A ", "is covered."] {
        model_body.extend(encode_event(
            "contentBlockDelta",
            &serde_json::json!({"contentBlockIndex": 0, "delta": {"text": delta}}),
        ));
    }
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse-stream$"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(model_body, EVENT_STREAM))
        .expect(1)
        .mount(&bedrock)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let config = write_config(
        dir.path(),
        port,
        &bedrock.uri(),
        "\n[forwarder]\nnormalization = \"model\"\n",
    );
    let _server = Running(
        moma()
            .args(["--config", config.to_str().unwrap(), "serve"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );
    let base = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base).await;

    let text = reqwest::Client::new()
        .post(format!("{base}/chat"))
        .json(&serde_json::json!({"messages": [{"role": "user", "content": "Which?"}]}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let deltas: Vec<String> = data_lines(&text)
        .iter()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|c| c["type"] == "text-delta")
        .filter_map(|c| c["delta"].as_str().map(String::from))
        .collect();
    assert_eq!(deltas, vec!["Hospital A ", "is covered."]);
}

#[test]
fn config_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), 3000, "http://127.0.0.1:9", "");
    let output = moma()
        .args(["--config", config.to_str().unwrap(), "config", "check"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("configuration is valid"));
}

#[test]
fn config_check_suggests_misspelled_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moma.toml");
    std::fs::write(&path, "[bedrock]\nregoin = \"us-east-1\"\n").unwrap();
    let output = moma()
        .args(["--config", path.to_str().unwrap(), "config", "check"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("region"), "stderr: {stderr}");
}

#[test]
fn config_show_redacts_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), 3000, "http://127.0.0.1:9", "");
    let output = moma()
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agent_id = \"AGENT1\""));
    assert!(stdout.contains("AKID****"));
    assert!(!stdout.contains("EXAMPLEKEY"));
}

#[test]
fn serve_without_agent_id_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("moma.toml");
    std::fs::write(&path, format!("[server]\nport = {}\n", free_port())).unwrap();
    let output = moma()
        .args(["--config", path.to_str().unwrap(), "serve"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bedrock.agent_id"));
}
