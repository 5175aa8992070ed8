// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bedrock Agent action-group event and response envelope.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Invocation event sent by the agent to an action group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    #[serde(default)]
    pub message_version: Option<String>,
    /// Agent metadata (name, id, alias, version). Not interpreted.
    #[serde(default)]
    pub agent: serde_json::Value,
    #[serde(default)]
    pub action_group: String,
    #[serde(default)]
    pub api_path: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<Property>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub input_text: Option<String>,
}

fn default_http_method() -> String {
    "POST".to_string()
}

/// `requestBody` of an action event, keyed by media type.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    pub content: HashMap<String, MediaContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// A named, typed value. The agent usually sends values as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ActionEvent {
    /// Name→value map of the JSON request body properties, falling back to
    /// the path/query `parameters` when the event has no JSON body.
    pub fn properties(&self) -> HashMap<String, serde_json::Value> {
        let properties = self
            .request_body
            .as_ref()
            .and_then(|body| body.content.get("application/json"))
            .map(|media| media.properties.as_slice())
            .unwrap_or(&self.parameters);
        properties
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// Envelope returned to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message_version: String,
    pub response: ActionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: BTreeMap<String, ResponseBody>,
}

/// Response payload. `body` is a JSON document serialized to a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub body: String,
}

impl ActionResponse {
    pub fn new(
        action_group: impl Into<String>,
        api_path: impl Into<String>,
        http_method: impl Into<String>,
        body: &serde_json::Value,
    ) -> Self {
        let mut response_body = BTreeMap::new();
        response_body.insert(
            "application/json".to_string(),
            ResponseBody {
                body: body.to_string(),
            },
        );
        Self {
            message_version: "1.0".to_string(),
            response: ActionResult {
                action_group: action_group.into(),
                api_path: api_path.into(),
                http_method: http_method.into(),
                http_status_code: 200,
                response_body,
            },
        }
    }

    /// Parses the JSON body back into a value.
    pub fn body(&self) -> Option<serde_json::Value> {
        self.response
            .response_body
            .get("application/json")
            .and_then(|b| serde_json::from_str(&b.body).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_prefer_json_body() {
        let event: ActionEvent = serde_json::from_value(serde_json::json!({
            "actionGroup": "costs",
            "apiPath": "/calculateCoinsurance",
            "parameters": [{"name": "amount", "type": "number", "value": "1"}],
            "requestBody": {"content": {"application/json": {"properties": [
                {"name": "amount", "type": "number", "value": "500"}
            ]}}}
        }))
        .unwrap();
        assert_eq!(event.http_method, "POST");
        assert_eq!(event.properties()["amount"], "500");
    }

    #[test]
    fn properties_fall_back_to_parameters() {
        let event: ActionEvent = serde_json::from_value(serde_json::json!({
            "apiPath": "/calculateCoinsurance",
            "httpMethod": "GET",
            "parameters": [{"name": "amount", "type": "number", "value": "10"}]
        }))
        .unwrap();
        assert_eq!(event.http_method, "GET");
        assert_eq!(event.properties()["amount"], "10");
    }

    #[test]
    fn envelope_shape() {
        let response = ActionResponse::new("g", "/p", "POST", &serde_json::json!({"ok": true}));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["messageVersion"], "1.0");
        assert_eq!(json["response"]["httpStatusCode"], 200);
        assert_eq!(json["response"]["actionGroup"], "g");
        assert_eq!(
            json["response"]["responseBody"]["application/json"]["body"],
            r#"{"ok":true}"#
        );
        assert_eq!(response.body().unwrap()["ok"], true);
    }
}
