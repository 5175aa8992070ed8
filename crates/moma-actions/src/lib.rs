// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action-group handler for the healthcare cost agent.
//!
//! The Bedrock Agent calls back into this handler while answering. Events are
//! routed by `apiPath` to one of the cost calculators and the result is
//! wrapped in the action-group response envelope. The handler never fails:
//! every problem is reported inside the response body.

pub mod calculators;
pub mod event;

pub use event::{ActionEvent, ActionResponse};

use serde_json::json;
use tracing::{debug, warn};

/// Routes supported by this action group.
pub const API_PATHS: [&str; 3] = [
    "/calculateOutOfPocketCost",
    "/comparePrices",
    "/calculateCoinsurance",
];

/// Handles a typed action event.
pub fn handle(event: &ActionEvent) -> ActionResponse {
    let params = event.properties();
    debug!(
        action_group = %event.action_group,
        api_path = %event.api_path,
        params = params.len(),
        "action group invoked"
    );

    let body = match event.api_path.as_str() {
        "/calculateOutOfPocketCost" => calculators::out_of_pocket_cost(&params),
        "/comparePrices" => calculators::compare_prices(&params),
        "/calculateCoinsurance" => calculators::coinsurance(&params),
        other => json!({ "error": format!("Unknown API path: {other}") }),
    };

    ActionResponse::new(
        event.action_group.clone(),
        event.api_path.clone(),
        event.http_method.clone(),
        &body,
    )
}

/// Handles a raw event, reporting a malformed one inside the envelope.
pub fn handle_value(raw: serde_json::Value) -> ActionResponse {
    match serde_json::from_value::<ActionEvent>(raw.clone()) {
        Ok(event) => handle(&event),
        Err(e) => {
            warn!(error = %e, "malformed action group event");
            let field = |name: &str| {
                raw.get(name)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let method = raw
                .get("httpMethod")
                .and_then(|v| v.as_str())
                .unwrap_or("POST")
                .to_string();
            ActionResponse::new(
                field("actionGroup"),
                field("apiPath"),
                method,
                &json!({ "error": format!("Error processing request: {e}") }),
            )
        }
    }
}
