// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! UI message stream encoding over Server-Sent Events.
//!
//! Each SSE event carries one JSON chunk in its `data:` line:
//! ```text
//! data: {"type":"start","messageId":"msg-..."}
//! data: {"type":"start-step"}
//! data: {"type":"source-url","sourceId":"source-0","url":"https://..."}
//! data: {"type":"text-start","id":"text-..."}
//! data: {"type":"text-delta","id":"text-...","delta":"..."}
//! data: {"type":"text-end","id":"text-..."}
//! data: {"type":"finish-step"}
//! data: {"type":"finish"}
//! data: [DONE]
//! ```
//! A failure while streaming model deltas emits an `error` chunk and ends
//! the stream.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use moma_core::types::TextDeltaStream;
use moma_forwarder::{CompletionBody, ForwardOutcome};
use serde::Serialize;
use tracing::warn;

/// Response header identifying the stream protocol.
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const UI_MESSAGE_STREAM_VERSION: &str = "v1";

/// Terminal marker after the last chunk.
pub const DONE_MARKER: &str = "[DONE]";

/// One chunk of the UI message stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiChunk {
    Start {
        #[serde(rename = "messageId")]
        message_id: String,
    },
    StartStep,
    SourceUrl {
        #[serde(rename = "sourceId")]
        source_id: String,
        url: String,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    FinishStep,
    Finish,
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl UiChunk {
    fn to_event(&self) -> Event {
        match serde_json::to_string(self) {
            Ok(json) => Event::default().data(json),
            Err(e) => Event::default().data(format!(
                r#"{{"type":"error","errorText":"failed to encode chunk: {e}"}}"#
            )),
        }
    }
}

/// Chunks emitted before the text body.
fn prelude(message_id: &str, text_id: &str, urls: &[String]) -> Vec<UiChunk> {
    let mut chunks = vec![
        UiChunk::Start {
            message_id: message_id.to_string(),
        },
        UiChunk::StartStep,
    ];
    chunks.extend(urls.iter().enumerate().map(|(i, url)| UiChunk::SourceUrl {
        source_id: format!("source-{i}"),
        url: url.clone(),
    }));
    chunks.push(UiChunk::TextStart {
        id: text_id.to_string(),
    });
    chunks
}

fn epilogue(text_id: &str) -> VecDeque<UiChunk> {
    VecDeque::from([
        UiChunk::TextEnd {
            id: text_id.to_string(),
        },
        UiChunk::FinishStep,
        UiChunk::Finish,
    ])
}

enum Phase {
    Deltas(TextDeltaStream),
    Tail(VecDeque<UiChunk>),
    Done,
}

/// Streams the body chunks: deltas, then the epilogue. An error delta ends
/// the stream without the epilogue.
fn body_chunks(text_id: String, deltas: TextDeltaStream) -> impl Stream<Item = UiChunk> + Send {
    stream::unfold(Phase::Deltas(deltas), move |phase| {
        let text_id = text_id.clone();
        async move {
            let mut phase = phase;
            loop {
                match phase {
                    Phase::Deltas(mut deltas) => match deltas.next().await {
                        Some(Ok(delta)) if delta.is_empty() => phase = Phase::Deltas(deltas),
                        Some(Ok(delta)) => {
                            let chunk = UiChunk::TextDelta {
                                id: text_id.clone(),
                                delta,
                            };
                            return Some((chunk, Phase::Deltas(deltas)));
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "text stream failed");
                            let chunk = UiChunk::Error {
                                error_text: e.to_string(),
                            };
                            return Some((chunk, Phase::Done));
                        }
                        None => phase = Phase::Tail(epilogue(&text_id)),
                    },
                    Phase::Tail(mut tail) => {
                        let chunk = tail.pop_front()?;
                        return Some((chunk, Phase::Tail(tail)));
                    }
                    Phase::Done => return None,
                }
            }
        }
    })
}

/// Encodes a forward outcome as UI message stream chunks.
pub fn ui_chunks(outcome: ForwardOutcome) -> impl Stream<Item = UiChunk> + Send {
    let message_id = format!("msg-{}", uuid::Uuid::new_v4().simple());
    let text_id = format!("text-{}", uuid::Uuid::new_v4().simple());
    let head = stream::iter(prelude(&message_id, &text_id, &outcome.urls));

    let deltas: TextDeltaStream = match outcome.body {
        CompletionBody::Text(text) => Box::pin(stream::iter(std::iter::once(Ok(text)))),
        CompletionBody::Deltas(deltas) => deltas,
    };
    head.chain(body_chunks(text_id, deltas))
}

/// Encodes a forward outcome as SSE events, ending with `[DONE]`.
pub fn ui_message_stream(
    outcome: ForwardOutcome,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    ui_chunks(outcome)
        .map(|chunk| Ok(chunk.to_event()))
        .chain(stream::once(async { Ok(Event::default().data(DONE_MARKER)) }))
}
