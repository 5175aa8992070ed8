// SPDX-FileCopyrightText: 2026 Moma Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS event stream codec (`application/vnd.amazon.eventstream`).
//!
//! Both Bedrock runtimes stream their replies as binary frames:
//!
//! ```text
//! total_len:u32 | headers_len:u32 | prelude_crc:u32 | headers | payload | message_crc:u32
//! ```
//!
//! All integers are big-endian. `prelude_crc` covers the first 8 bytes and
//! `message_crc` covers everything before it. [`decode_stream`] turns a
//! response byte stream into a stream of [`Message`]s.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};
use moma_core::MomaError;
use thiserror::Error;

const PRELUDE_LEN: usize = 12;
const CRC_LEN: usize = 4;
const MIN_MESSAGE_LEN: usize = PRELUDE_LEN + CRC_LEN;
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Framing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventStreamError {
    #[error("invalid message length {0}")]
    InvalidLength(usize),
    #[error("prelude checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    PreludeChecksum { expected: u32, actual: u32 },
    #[error("message checksum mismatch (expected {expected:#010x}, got {actual:#010x})")]
    MessageChecksum { expected: u32, actual: u32 },
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("stream ended inside a message ({0} bytes pending)")]
    Truncated(usize),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<EventStreamError> for MomaError {
    fn from(e: EventStreamError) -> Self {
        MomaError::Upstream {
            message: format!("event stream: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// Typed header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Bytes(Vec<u8>),
    String(String),
    Timestamp(i64),
    Uuid([u8; 16]),
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headers: Vec<(String, HeaderValue)>,
    pub payload: Vec<u8>,
}

impl Message {
    /// Returns a string-typed header by name.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|(n, v)| match v {
            HeaderValue::String(s) if n == name => Some(s.as_str()),
            _ => None,
        })
    }

    /// `:message-type` (`event`, `exception` or `error`).
    pub fn message_type(&self) -> Option<&str> {
        self.header_str(":message-type")
    }

    /// `:event-type` for events.
    pub fn event_type(&self) -> Option<&str> {
        self.header_str(":event-type")
    }
}

// CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320).
const CRC_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

fn crc32(data: &[u8]) -> u32 {
    !data.iter().fold(!0u32, |crc, &b| {
        CRC_TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8)
    })
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Incremental frame decoder. Feed bytes with [`push`](Self::push), pull
/// complete messages with [`next_message`](Self::next_message).
#[derive(Debug, Default)]
pub struct MessageDecoder {
    buf: Vec<u8>,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed by a complete message.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete message, if one is buffered.
    pub fn next_message(&mut self) -> Result<Option<Message>, EventStreamError> {
        if self.buf.len() < PRELUDE_LEN {
            return Ok(None);
        }
        let total_len = read_u32(&self.buf, 0) as usize;
        let headers_len = read_u32(&self.buf, 4) as usize;
        if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&total_len)
            || headers_len > total_len - MIN_MESSAGE_LEN
        {
            return Err(EventStreamError::InvalidLength(total_len));
        }
        let expected = read_u32(&self.buf, 8);
        let actual = crc32(&self.buf[..8]);
        if expected != actual {
            return Err(EventStreamError::PreludeChecksum { expected, actual });
        }
        if self.buf.len() < total_len {
            return Ok(None);
        }

        let frame: Vec<u8> = self.buf.drain(..total_len).collect();
        let expected = read_u32(&frame, total_len - CRC_LEN);
        let actual = crc32(&frame[..total_len - CRC_LEN]);
        if expected != actual {
            return Err(EventStreamError::MessageChecksum { expected, actual });
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = parse_headers(&frame[PRELUDE_LEN..headers_end])?;
        let payload = frame[headers_end..total_len - CRC_LEN].to_vec();
        Ok(Some(Message { headers, payload }))
    }
}

fn parse_headers(mut buf: &[u8]) -> Result<Vec<(String, HeaderValue)>, EventStreamError> {
    fn take<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8], EventStreamError> {
        if buf.len() < n {
            return Err(EventStreamError::InvalidHeader(format!(
                "needed {n} bytes, {} left",
                buf.len()
            )));
        }
        let (head, rest) = buf.split_at(n);
        *buf = rest;
        Ok(head)
    }

    let mut headers = Vec::new();
    while !buf.is_empty() {
        let name_len = take(&mut buf, 1)?[0] as usize;
        let name = String::from_utf8(take(&mut buf, name_len)?.to_vec())
            .map_err(|e| EventStreamError::InvalidHeader(format!("header name: {e}")))?;
        let value_type = take(&mut buf, 1)?[0];
        let value = match value_type {
            0 => HeaderValue::Bool(true),
            1 => HeaderValue::Bool(false),
            2 => HeaderValue::Byte(take(&mut buf, 1)?[0] as i8),
            3 => HeaderValue::Int16(i16::from_be_bytes(take(&mut buf, 2)?.try_into().unwrap_or_default())),
            4 => HeaderValue::Int32(i32::from_be_bytes(take(&mut buf, 4)?.try_into().unwrap_or_default())),
            5 => HeaderValue::Int64(i64::from_be_bytes(take(&mut buf, 8)?.try_into().unwrap_or_default())),
            6 | 7 => {
                let len = u16::from_be_bytes(take(&mut buf, 2)?.try_into().unwrap_or_default()) as usize;
                let bytes = take(&mut buf, len)?.to_vec();
                if value_type == 6 {
                    HeaderValue::Bytes(bytes)
                } else {
                    HeaderValue::String(String::from_utf8(bytes).map_err(|e| {
                        EventStreamError::InvalidHeader(format!("value of {name}: {e}"))
                    })?)
                }
            }
            8 => HeaderValue::Timestamp(i64::from_be_bytes(take(&mut buf, 8)?.try_into().unwrap_or_default())),
            9 => HeaderValue::Uuid(take(&mut buf, 16)?.try_into().unwrap_or_default()),
            other => {
                return Err(EventStreamError::InvalidHeader(format!(
                    "unknown value type {other} for {name}"
                )))
            }
        };
        headers.push((name, value));
    }
    Ok(headers)
}

/// Encodes a message with string-valued headers.
///
/// Bedrock never needs us to send event streams; this exists for building
/// fixtures and for mock servers.
pub fn encode_message(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let mut header_bytes = Vec::new();
    for (name, value) in headers {
        header_bytes.push(name.len() as u8);
        header_bytes.extend_from_slice(name.as_bytes());
        header_bytes.push(7);
        header_bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        header_bytes.extend_from_slice(value.as_bytes());
    }
    let total_len = MIN_MESSAGE_LEN + header_bytes.len() + payload.len();

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    let prelude_crc = crc32(&out);
    out.extend_from_slice(&prelude_crc.to_be_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(payload);
    let message_crc = crc32(&out);
    out.extend_from_slice(&message_crc.to_be_bytes());
    out
}

/// Encodes an `event` message with the given `:event-type` and JSON payload.
pub fn encode_event(event_type: &str, payload: &serde_json::Value) -> Vec<u8> {
    encode_message(
        &[
            (":message-type", "event"),
            (":event-type", event_type),
            (":content-type", "application/json"),
        ],
        payload.to_string().as_bytes(),
    )
}

/// Encodes an `exception` message.
pub fn encode_exception(exception_type: &str, message: &str) -> Vec<u8> {
    encode_message(
        &[
            (":message-type", "exception"),
            (":exception-type", exception_type),
            (":content-type", "application/json"),
        ],
        serde_json::json!({ "message": message }).to_string().as_bytes(),
    )
}

/// Stream of decoded messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, EventStreamError>> + Send>>;

struct DecodeState<S> {
    inner: Pin<Box<S>>,
    decoder: MessageDecoder,
    done: bool,
}

/// Decodes a byte stream (e.g. `reqwest::Response::bytes_stream`) into messages.
///
/// The stream ends after the first error.
pub fn decode_stream<S, B, E>(bytes: S) -> MessageStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: MessageDecoder::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            match state.decoder.next_message() {
                Ok(Some(message)) => return Some((Ok(message), state)),
                Ok(None) => {}
                Err(e) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => state.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(EventStreamError::Transport(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    let pending = state.decoder.pending();
                    if pending > 0 {
                        return Some((Err(EventStreamError::Truncated(pending)), state));
                    }
                    return None;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn decodes_encoded_event() {
        let frame = encode_event("chunk", &serde_json::json!({"bytes": "SGk="}));
        let mut decoder = MessageDecoder::new();
        decoder.push(&frame);
        let message = decoder.next_message().unwrap().unwrap();
        assert_eq!(message.message_type(), Some("event"));
        assert_eq!(message.event_type(), Some("chunk"));
        let payload: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(payload["bytes"], "SGk=");
        assert_eq!(decoder.pending(), 0);
        assert!(decoder.next_message().unwrap().is_none());
    }

    #[test]
    fn waits_for_partial_frames() {
        let frame = encode_event("trace", &serde_json::json!({"a": 1}));
        let mut decoder = MessageDecoder::new();
        decoder.push(&frame[..5]);
        assert!(decoder.next_message().unwrap().is_none());
        decoder.push(&frame[5..20]);
        assert!(decoder.next_message().unwrap().is_none());
        decoder.push(&frame[20..]);
        assert!(decoder.next_message().unwrap().is_some());
    }

    #[test]
    fn detects_corrupted_payload() {
        let mut frame = encode_event("chunk", &serde_json::json!({"bytes": "SGk="}));
        let idx = frame.len() - 6;
        frame[idx] ^= 0xFF;
        let mut decoder = MessageDecoder::new();
        decoder.push(&frame);
        assert!(matches!(
            decoder.next_message(),
            Err(EventStreamError::MessageChecksum { .. })
        ));
    }

    #[test]
    fn detects_corrupted_prelude() {
        let mut frame = encode_event("chunk", &serde_json::json!({}));
        frame[9] ^= 0x01;
        let mut decoder = MessageDecoder::new();
        decoder.push(&frame);
        assert!(matches!(
            decoder.next_message(),
            Err(EventStreamError::PreludeChecksum { .. })
        ));
    }

    #[test]
    fn rejects_impossible_length() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            decoder.next_message(),
            Err(EventStreamError::InvalidLength(4))
        );
    }

    #[test]
    fn parses_typed_headers() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&[4]);
        raw.extend_from_slice(b"flag");
        raw.push(0);
        raw.extend_from_slice(&[3]);
        raw.extend_from_slice(b"num");
        raw.push(4);
        raw.extend_from_slice(&42i32.to_be_bytes());
        let headers = parse_headers(&raw).unwrap();
        assert_eq!(headers[0], ("flag".to_string(), HeaderValue::Bool(true)));
        assert_eq!(headers[1], ("num".to_string(), HeaderValue::Int32(42)));
    }

    #[tokio::test]
    async fn decode_stream_reassembles_split_frames() {
        let mut bytes = encode_event("chunk", &serde_json::json!({"n": 1}));
        bytes.extend(encode_event("chunk", &serde_json::json!({"n": 2})));
        let pieces: Vec<Result<Vec<u8>, std::io::Error>> =
            bytes.chunks(7).map(|c| Ok(c.to_vec())).collect();

        let messages: Vec<_> = decode_stream(stream::iter(pieces)).collect().await;
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.is_ok()));
    }

    #[tokio::test]
    async fn decode_stream_reports_truncation() {
        let frame = encode_event("chunk", &serde_json::json!({"n": 1}));
        let pieces: Vec<Result<Vec<u8>, std::io::Error>> = vec![Ok(frame[..frame.len() - 3].to_vec())];
        let messages: Vec<_> = decode_stream(stream::iter(pieces)).collect().await;
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], Err(EventStreamError::Truncated(_))));
    }
}
