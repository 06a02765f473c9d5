//! Responses-API flavour: request body and SSE event translation.
//!
//! Unlike Chat Completions, the Responses API streams typed events
//! (`response.output_text.delta`, `response.output_item.done`, ...) and
//! reports each finished output item on its own. Finished items become
//! `StreamUpdate::ItemDone`; the argument deltas of function calls are still
//! forwarded as `ToolCallDelta`s so both paths feed the same reconstructor.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::InferenceError;
use super::streaming::sse_data;
use super::types::{
    ContentPart, FinishReason, Message, OutputItem, StreamUpdate, ToolCall, ToolCallDelta,
    ToolDefinition,
};

// ─── Request ─────────────────────────────────────────────────────────────────

/// Request body for `POST /responses`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ResponsesTool>,
    pub stream: bool,
}

/// Flat tool shape used by the Responses API.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesTool {
    pub r#type: &'static str,
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolDefinition> for ResponsesTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            r#type: "function",
            name: def.function.name.clone(),
            description: def.function.description.clone(),
            parameters: def.function.parameters.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: &'static str,
        content: Vec<InputContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
    OutputText { text: String },
}

/// Flatten the history into Responses input items.
///
/// An assistant turn with tool calls becomes its text message (if any)
/// followed by one `function_call` item per call.
pub fn input_items(messages: &[Message]) -> Vec<InputItem> {
    let mut items = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { parts } => items.push(InputItem::Message {
                role: "system",
                content: input_content(parts),
            }),
            Message::User { parts } => items.push(InputItem::Message {
                role: "user",
                content: input_content(parts),
            }),
            Message::Assistant { tool_calls, .. } => {
                let text = message.text();
                if !text.is_empty() {
                    items.push(InputItem::Message {
                        role: "assistant",
                        content: vec![InputContent::OutputText { text }],
                    });
                }
                for call in tool_calls {
                    items.push(InputItem::FunctionCall {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.to_string_lossy(),
                    });
                }
            }
            Message::ToolResult { call_id, content } => {
                items.push(InputItem::FunctionCallOutput {
                    call_id: call_id.clone(),
                    output: content.clone(),
                })
            }
        }
    }

    items
}

fn input_content(parts: &[ContentPart]) -> Vec<InputContent> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => InputContent::InputText { text: text.clone() },
            ContentPart::Image(image) => InputContent::InputImage {
                image_url: image.data_url(),
            },
        })
        .collect()
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// The subset of Responses stream events we act on. Everything else
/// (`response.created`, `response.content_part.added`, ...) is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponsesEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { delta: String },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { output_index: u32, item: Value },

    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta { output_index: u32, delta: String },

    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: Value },

    #[serde(rename = "response.completed")]
    Completed { response: Value },

    #[serde(rename = "response.incomplete")]
    Incomplete { response: Value },

    #[serde(rename = "response.failed")]
    Failed { response: Value },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
    },

    #[serde(other)]
    Other,
}

/// Parse a Responses SSE body into `StreamUpdate`s.
pub fn parse_responses_stream<S, E>(
    bytes: S,
) -> impl Stream<Item = Result<StreamUpdate, InferenceError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    sse_data(bytes).flat_map(|event| {
        let updates = match event.and_then(|data| event_updates(&data)) {
            Ok(updates) => updates.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(updates)
    })
}

/// Output indices are zero-based; shift them so they never land on the
/// reconstructor's index-0 fallback path.
fn call_index(output_index: u32) -> i32 {
    i32::try_from(output_index).map_or(i32::MAX, |i| i.saturating_add(1))
}

fn event_updates(data: &str) -> Result<Vec<StreamUpdate>, InferenceError> {
    let event: ResponsesEvent =
        serde_json::from_str(data).map_err(|e| InferenceError::StreamError {
            reason: format!("failed to parse responses event: {e} (data: {data})"),
        })?;

    let updates = match event {
        ResponsesEvent::OutputTextDelta { delta } if !delta.is_empty() => {
            vec![StreamUpdate::TextDelta(delta)]
        }
        ResponsesEvent::OutputItemAdded { output_index, item }
            if item_type(&item) == Some("function_call") =>
        {
            vec![StreamUpdate::ToolCallDelta(ToolCallDelta {
                index: call_index(output_index),
                id: str_field(&item, "call_id").map(String::from),
                function_name: str_field(&item, "name").map(String::from),
                arguments: None,
            })]
        }
        ResponsesEvent::FunctionCallArgumentsDelta {
            output_index,
            delta,
        } if !delta.is_empty() => vec![StreamUpdate::ToolCallDelta(ToolCallDelta {
            index: call_index(output_index),
            id: None,
            function_name: None,
            arguments: Some(Bytes::from(delta)),
        })],
        ResponsesEvent::OutputItemDone { item } => {
            output_item(&item).map(StreamUpdate::ItemDone).into_iter().collect()
        }
        ResponsesEvent::Completed { response } => {
            let called_tools = response
                .get("output")
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items
                        .iter()
                        .any(|item| item_type(item) == Some("function_call"))
                });
            let reason = if called_tools {
                FinishReason::ToolCalls
            } else {
                FinishReason::Stop
            };
            vec![StreamUpdate::Finish(reason)]
        }
        ResponsesEvent::Incomplete { response } => {
            let reason = response
                .pointer("/incomplete_details/reason")
                .and_then(Value::as_str)
                .unwrap_or("incomplete");
            vec![StreamUpdate::Finish(FinishReason::Other(reason.to_string()))]
        }
        ResponsesEvent::Failed { response } => {
            let message = response
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("response failed");
            return Err(InferenceError::StreamError {
                reason: message.to_string(),
            });
        }
        ResponsesEvent::Error { message } => {
            return Err(InferenceError::StreamError {
                reason: message.unwrap_or_else(|| "error event".to_string()),
            });
        }
        _ => Vec::new(),
    };

    Ok(updates)
}

fn item_type(item: &Value) -> Option<&str> {
    str_field(item, "type")
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field).and_then(Value::as_str)
}

/// Convert a finished output item. Reasoning and other item kinds are dropped.
fn output_item(item: &Value) -> Option<OutputItem> {
    match item_type(item)? {
        "message" => {
            let text = item
                .get("content")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter(|p| item_type(p) == Some("output_text"))
                        .filter_map(|p| str_field(p, "text"))
                        .collect::<String>()
                })
                .unwrap_or_default();
            Some(OutputItem::Message { text })
        }
        "function_call" => {
            let id = str_field(item, "call_id")
                .or_else(|| str_field(item, "id"))?
                .to_string();
            let name = str_field(item, "name")?.to_string();
            let arguments = str_field(item, "arguments").unwrap_or_default().to_string();
            Some(OutputItem::FunctionCall(ToolCall {
                id,
                name,
                arguments: arguments.into(),
            }))
        }
        _ => None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::ImageData;

    async fn collect(events: &[&str]) -> Vec<StreamUpdate> {
        let body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from(body))];
        parse_responses_stream(stream::iter(chunks))
            .map(|u| u.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_text_message_round() {
        let updates = collect(&[
            r#"{"type":"response.created","response":{}}"#,
            r#"{"type":"response.output_text.delta","delta":"Hel"}"#,
            r#"{"type":"response.output_text.delta","delta":"lo"}"#,
            r#"{"type":"response.output_item.done","item":{"type":"message","content":[{"type":"output_text","text":"Hello"}]}}"#,
            r#"{"type":"response.completed","response":{"output":[{"type":"message"}]}}"#,
        ])
        .await;

        assert_eq!(
            updates,
            vec![
                StreamUpdate::TextDelta("Hel".into()),
                StreamUpdate::TextDelta("lo".into()),
                StreamUpdate::ItemDone(OutputItem::Message {
                    text: "Hello".into()
                }),
                StreamUpdate::Finish(FinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_function_call_round() {
        let updates = collect(&[
            r#"{"type":"response.output_item.added","output_index":0,"item":{"type":"function_call","id":"fc_1","call_id":"call_1","name":"MoveMouse","arguments":""}}"#,
            r#"{"type":"response.function_call_arguments.delta","output_index":0,"item_id":"fc_1","delta":"{\"x\":3,"}"#,
            r#"{"type":"response.function_call_arguments.delta","output_index":0,"item_id":"fc_1","delta":"\"y\":4}"}"#,
            r#"{"type":"response.output_item.done","output_index":0,"item":{"type":"function_call","id":"fc_1","call_id":"call_1","name":"MoveMouse","arguments":"{\"x\":3,\"y\":4}"}}"#,
            r#"{"type":"response.completed","response":{"output":[{"type":"function_call"}]}}"#,
        ])
        .await;

        assert_eq!(updates.len(), 5);
        match &updates[0] {
            StreamUpdate::ToolCallDelta(d) => {
                assert_eq!(d.index, 1);
                assert_eq!(d.id.as_deref(), Some("call_1"));
                assert_eq!(d.function_name.as_deref(), Some("MoveMouse"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &updates[3] {
            StreamUpdate::ItemDone(OutputItem::FunctionCall(call)) => {
                assert_eq!(call.id, "call_1");
                assert_eq!(call.arguments.to_string_lossy(), "{\"x\":3,\"y\":4}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(updates[4], StreamUpdate::Finish(FinishReason::ToolCalls));
    }

    #[tokio::test]
    async fn test_incomplete_maps_to_other() {
        let updates = collect(&[
            r#"{"type":"response.incomplete","response":{"incomplete_details":{"reason":"max_output_tokens"}}}"#,
        ])
        .await;
        assert_eq!(
            updates,
            vec![StreamUpdate::Finish(FinishReason::Other(
                "max_output_tokens".into()
            ))]
        );
    }

    #[tokio::test]
    async fn test_failed_is_stream_error() {
        let body = "data: {\"type\":\"response.failed\",\"response\":{\"error\":{\"message\":\"boom\"}}}\n\n";
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(body.as_bytes()))];
        let results: Vec<_> = parse_responses_stream(stream::iter(chunks)).collect().await;
        match &results[0] {
            Err(InferenceError::StreamError { reason }) => assert_eq!(reason, "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_input_items_flatten_tool_round() {
        let call = ToolCall {
            id: "call_7".into(),
            name: "GetScreenSize".into(),
            arguments: "{}".into(),
        };
        let history = vec![
            Message::system("be brief"),
            Message::User {
                parts: vec![
                    ContentPart::Text("look".into()),
                    ContentPart::Image(ImageData::png(vec![0u8])),
                ],
            },
            Message::assistant_tool_calls(vec![call], ""),
            Message::tool_result("call_7", "Screen:800×600"),
        ];

        let json = serde_json::to_value(input_items(&history)).unwrap();
        assert_eq!(json[0]["type"], "message");
        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[1]["content"][1]["type"], "input_image");
        assert_eq!(json[2]["type"], "function_call");
        assert_eq!(json[2]["call_id"], "call_7");
        assert_eq!(json[3]["type"], "function_call_output");
        assert_eq!(json[3]["output"], "Screen:800×600");
        assert_eq!(json.as_array().unwrap().len(), 4);
    }
}
