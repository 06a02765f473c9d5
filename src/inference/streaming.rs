//! SSE streaming response parser for OpenAI-compatible chat completions.
//!
//! Reads an HTTP body as a byte stream, splits it on SSE boundaries
//! (`data: …\n\n`), parses each event as a `ChatCompletionChunk` and
//! translates it into `StreamUpdate`s. Tool-call fragments are passed through
//! untouched; reassembly is the orchestrator's job (see `tool_call_builder`).

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

use super::errors::InferenceError;
use super::types::{ChatCompletionChunk, FinishReason, StreamUpdate, ToolCallDelta};

// ─── SSE framing ─────────────────────────────────────────────────────────────

/// What a single SSE event carried.
#[derive(Debug, PartialEq, Eq)]
enum EventData {
    /// `data: [DONE]`
    Done,
    /// Keep-alive, comment, or an event with no `data:` lines.
    Empty,
    Data(String),
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    buffer: BytesMut,
    finished: bool,
}

/// Split a byte stream into SSE `data` payloads.
///
/// Events are delimited by a blank line (`\n\n` or `\r\n\r\n`). Multiple
/// `data:` lines in one event are joined with `\n`. The stream ends at
/// `[DONE]`, at end of body, or after the first transport error.
pub fn sse_data<S, E>(bytes: S) -> impl Stream<Item = Result<String, InferenceError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        buffer: BytesMut::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            // Check if we have a complete SSE event in the buffer
            if let Some((end, delimiter)) = find_event_end(&state.buffer) {
                let event = state.buffer.split_to(end + delimiter);
                match parse_event(&event[..end]) {
                    EventData::Done => {
                        state.finished = true;
                        return None;
                    }
                    EventData::Empty => continue,
                    EventData::Data(data) => return Some((Ok(data), state)),
                }
            }

            // Need more data from the stream
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(InferenceError::StreamError {
                            reason: format!("stream read error: {e}"),
                        }),
                        state,
                    ));
                }
                None => {
                    // Body ended without a trailing blank line
                    state.finished = true;
                    let rest = state.buffer.split();
                    return match parse_event(&rest) {
                        EventData::Data(data) => Some((Ok(data), state)),
                        EventData::Done | EventData::Empty => None,
                    };
                }
            }
        }
    })
}

/// Earliest event terminator in `buf`: `(offset, delimiter_len)`.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|pos| (pos, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_event(raw: &[u8]) -> EventData {
    let text = String::from_utf8_lossy(raw);
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some(data) = line.strip_prefix("data:") else {
            // Comments, `event:`, `id:`, `retry:`
            continue;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        if data.trim() == "[DONE]" {
            return EventData::Done;
        }
        data_lines.push(data);
    }

    if data_lines.is_empty() {
        EventData::Empty
    } else {
        EventData::Data(data_lines.join("\n"))
    }
}

// ─── Chat Completions translation ────────────────────────────────────────────

/// Parse a Chat Completions SSE body into `StreamUpdate`s.
pub fn parse_chat_stream<S, E>(
    bytes: S,
) -> impl Stream<Item = Result<StreamUpdate, InferenceError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    sse_data(bytes).flat_map(|event| {
        let updates = match event.and_then(|data| chunk_updates(&data)) {
            Ok(updates) => updates.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(updates)
    })
}

/// Translate one `data:` payload into zero or more updates, in the order
/// text → tool-call fragments → finish signal.
fn chunk_updates(data: &str) -> Result<Vec<StreamUpdate>, InferenceError> {
    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).map_err(|e| InferenceError::StreamError {
            reason: format!("failed to parse SSE chunk: {e} (data: {data})"),
        })?;

    let Some(choice) = chunk.choices.into_iter().next() else {
        // Usage-only or role-only chunks
        return Ok(Vec::new());
    };

    let mut updates = Vec::new();

    if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
        updates.push(StreamUpdate::TextDelta(content));
    }

    for tc in choice.delta.tool_calls.unwrap_or_default() {
        let (function_name, arguments) = match tc.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        updates.push(StreamUpdate::ToolCallDelta(ToolCallDelta {
            index: tc.index.unwrap_or(0),
            id: tc.id,
            function_name,
            arguments: arguments.filter(|a| !a.is_empty()).map(Bytes::from),
        }));
    }

    if let Some(reason) = choice.finish_reason {
        tracing::debug!(finish_reason = %reason, "chat stream finished");
        updates.push(StreamUpdate::Finish(FinishReason::parse(&reason)));
    }

    Ok(updates)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
