// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closed tagged value for schema-less agent metadata.
//!
//! Trace and attribution payloads of the agent stream have no fixed schema.
//! They are converted once into [`TraceValue`] so that consumers recurse over
//! a closed set of variants instead of an open JSON graph.

use std::collections::BTreeMap;

/// A JSON-like value: null, boolean, number, string, list or mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TraceValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<TraceValue>),
    Map(BTreeMap<String, TraceValue>),
}

impl TraceValue {
    /// Calls `visit` for every string leaf, depth first.
    pub fn for_each_string<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            TraceValue::String(s) => visit(s),
            TraceValue::List(items) => {
                for item in items {
                    item.for_each_string(visit);
                }
            }
            TraceValue::Map(entries) => {
                for value in entries.values() {
                    value.for_each_string(visit);
                }
            }
            TraceValue::Null | TraceValue::Bool(_) | TraceValue::Number(_) => {}
        }
    }

    /// Looks up a key when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&TraceValue> {
        match self {
            TraceValue::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TraceValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for TraceValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TraceValue::Null,
            serde_json::Value::Bool(b) => TraceValue::Bool(b),
            serde_json::Value::Number(n) => TraceValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => TraceValue::String(s),
            serde_json::Value::Array(items) => {
                TraceValue::List(items.into_iter().map(TraceValue::from).collect())
            }
            serde_json::Value::Object(entries) => TraceValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, TraceValue::from(v)))
                    .collect(),
            ),
        }
    }
}
