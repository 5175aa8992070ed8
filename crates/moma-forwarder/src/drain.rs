// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draining the agent's chunked reply.
//!
//! Chunk bytes are buffered raw and decoded once at the end so multi-byte
//! characters split across chunks survive. Every string leaf of trace and
//! attribution payloads is scanned for URLs along the way.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use futures::StreamExt;
use moma_core::types::{AgentEvent, AgentEventStream};
use moma_core::{MomaError, TraceValue};
use regex::Regex;
use tracing::trace;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s"'<>()\[\]{}\\]+"#).unwrap()
});

/// Deduplicated, sorted set of URLs found in side-channel payloads.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UrlSet(BTreeSet<String>);

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every URL found in `text`.
    pub fn scan_text(&mut self, text: &str) {
        for found in URL_PATTERN.find_iter(text) {
            let url = found
                .as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?']);
            if !url.ends_with("://") {
                self.0.insert(url.to_string());
            }
        }
    }

    /// Adds every URL found in any string leaf of `value`.
    pub fn scan(&mut self, value: &TraceValue) {
        value.for_each_string(&mut |s| self.scan_text(s));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Result of draining a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub completion: String,
    pub urls: UrlSet,
}

/// Consumes the whole stream, accumulating chunk bytes and URLs.
///
/// `None` (no stream at all) and any stream error are upstream failures.
pub async fn drain(completion: Option<AgentEventStream>) -> Result<Drained, MomaError> {
    let mut stream =
        completion.ok_or_else(|| MomaError::upstream("agent returned no completion stream"))?;

    let mut buffer = Vec::new();
    let mut urls = UrlSet::new();
    let mut events = 0usize;

    while let Some(event) = stream.next().await {
        events += 1;
        match event? {
            AgentEvent::Chunk { bytes, attribution } => {
                if let Some(attribution) = &attribution {
                    urls.scan(attribution);
                }
                buffer.extend_from_slice(&bytes);
            }
            AgentEvent::Trace(value) => urls.scan(&value),
            AgentEvent::Other { event_type, payload } => {
                trace!(event_type, "ignoring agent event");
                urls.scan(&payload);
            }
        }
    }

    trace!(events, bytes = buffer.len(), "agent stream drained");
    Ok(Drained {
        completion: String::from_utf8_lossy(&buffer).into_owned(),
        urls,
    })
}
