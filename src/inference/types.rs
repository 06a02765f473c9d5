//! Shared types for the inference layer.
//!
//! Two groups live here:
//! - the in-memory conversation model (`Message`, `ContentPart`, `ToolCall`)
//!   that the orchestrator owns and replays to the backend every round, and
//! - the stream model (`StreamUpdate`, `ToolCallDelta`, `FinishReason`) the
//!   backend produces while a round is in flight,
//!
//! plus the OpenAI Chat Completions wire types used for request building and
//! SSE chunk parsing.

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::byte_sequence::ByteSequence;

// ─── Conversation Model ─────────────────────────────────────────────────────

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// An encoded image attached to a message (PNG unless stated otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Bytes,
    pub media_type: String,
}

impl ImageData {
    pub fn png(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: "image/png".to_string(),
        }
    }

    /// `data:<media>;base64,<payload>` form accepted by OpenAI-style endpoints.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// One ordered piece of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImageData),
}

/// A finalized tool invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Backend-issued id, or a synthesized `call_<uuid>` when the backend sent none.
    pub id: String,
    pub name: String,
    /// Raw argument payload as streamed; parsed against the tool schema at dispatch.
    pub arguments: ByteSequence,
}

/// A single entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    System {
        parts: Vec<ContentPart>,
    },
    User {
        parts: Vec<ContentPart>,
    },
    Assistant {
        parts: Vec<ContentPart>,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Message::System {
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Message::User {
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_image(image: ImageData) -> Self {
        Message::User {
            parts: vec![ContentPart::Image(image)],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Message::Assistant {
            parts: vec![ContentPart::Text(text.into())],
            tool_calls: Vec::new(),
        }
    }

    /// Assistant turn that requested tools; `text` is kept only when non-empty.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>, text: &str) -> Self {
        let parts = if text.is_empty() {
            Vec::new()
        } else {
            vec![ContentPart::Text(text.to_string())]
        };
        Message::Assistant { parts, tool_calls }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::ToolResult { .. } => Role::Tool,
        }
    }

    /// Content parts (tool results have a single implicit text part).
    pub fn parts(&self) -> &[ContentPart] {
        match self {
            Message::System { parts } | Message::User { parts } => parts,
            Message::Assistant { parts, .. } => parts,
            Message::ToolResult { .. } => &[],
        }
    }

    /// Concatenation of all text parts.
    pub fn text(&self) -> String {
        match self {
            Message::ToolResult { content, .. } => content.clone(),
            other => other
                .parts()
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(t) => Some(t.as_str()),
                    ContentPart::Image(_) => None,
                })
                .collect(),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

// ─── Stream Model ───────────────────────────────────────────────────────────

/// Why a round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    /// Anything else the backend reports (`length`, `content_filter`, ...).
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// One fragment of a tool invocation as streamed by the backend.
///
/// Every field is optional except the index; fragments for one call may be
/// spread over any number of updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    /// Backend-reported call index. Some backends always report 0.
    pub index: i32,
    pub id: Option<String>,
    pub function_name: Option<String>,
    pub arguments: Option<Bytes>,
}

/// A completed output item (Responses-API style backends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    /// A finished assistant message with its full text.
    Message { text: String },
    /// A finished function call with complete arguments.
    FunctionCall(ToolCall),
}

/// A single update pulled from the backend stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    TextDelta(String),
    ToolCallDelta(ToolCallDelta),
    ItemDone(OutputItem),
    Finish(FinishReason),
}

// ─── Tool Definitions ───────────────────────────────────────────────────────

/// Tool definition sent in the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

/// Function definition within a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// ─── Chat Completions Request Types ─────────────────────────────────────────

/// A single message in the Chat Completions request.
///
/// `content` is `""` rather than `null` for assistant messages that only carry
/// tool calls; several OpenAI-compatible servers reject `null` there.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: ChatContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

/// Plain string content, or an ordered list of typed parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Tool call as echoed back in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    pub r#type: String,
    pub function: FunctionCallResponse,
}

/// Function call details in a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub name: String,
    pub arguments: String,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub stream: bool,
}

impl ChatMessage {
    /// Convert a history entry to its Chat Completions form.
    pub fn from_message(message: &Message) -> Self {
        match message {
            Message::System { parts } | Message::User { parts } => ChatMessage {
                role: message.role(),
                content: chat_content(parts),
                tool_call_id: None,
                tool_calls: None,
            },
            Message::Assistant { parts, tool_calls } => ChatMessage {
                role: Role::Assistant,
                content: chat_content(parts),
                tool_call_id: None,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        tool_calls
                            .iter()
                            .map(|tc| ToolCallResponse {
                                id: tc.id.clone(),
                                r#type: "function".to_string(),
                                function: FunctionCallResponse {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string_lossy(),
                                },
                            })
                            .collect(),
                    )
                },
            },
            Message::ToolResult { call_id, content } => ChatMessage {
                role: Role::Tool,
                content: ChatContent::Text(content.clone()),
                tool_call_id: Some(call_id.clone()),
                tool_calls: None,
            },
        }
    }
}

/// Text-only content collapses to a plain string; anything with an image
/// becomes a typed part list.
fn chat_content(parts: &[ContentPart]) -> ChatContent {
    if parts.iter().all(|p| matches!(p, ContentPart::Text(_))) {
        let text: String = parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect();
        return ChatContent::Text(text);
    }

    ChatContent::Parts(
        parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(text) => ChatContentPart::Text { text: text.clone() },
                ContentPart::Image(image) => ChatContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            })
            .collect(),
    )
}

// ─── Chat Completions Response Types ────────────────────────────────────────

/// Raw SSE chunk from the Chat Completions API.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

/// The delta (incremental update) within a chunk choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

/// A tool call fragment within a streaming delta.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkToolCall {
    pub index: Option<i32>,
    pub id: Option<String>,
    pub function: Option<ChunkFunction>,
}

/// A function call fragment within a streaming tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(
            FinishReason::parse("length"),
            FinishReason::Other("length".into())
        );
    }

    #[test]
    fn test_text_only_user_message_serializes_as_string() {
        let msg = ChatMessage::from_message(&Message::user_text("hello"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_image_part_serializes_as_data_url() {
        let msg = ChatMessage::from_message(&Message::User {
            parts: vec![
                ContentPart::Text("what is this?".into()),
                ContentPart::Image(ImageData::png(vec![0x89, 0x50])),
            ],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,iVA="
        );
    }

    #[test]
    fn test_tool_call_assistant_message_has_empty_content() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "ClickAt".into(),
            arguments: ByteSequence::from("{\"x\":1,\"y\":2}"),
        };
        let msg = ChatMessage::from_message(&Message::assistant_tool_calls(vec![call], ""));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "");
        assert_eq!(json["tool_calls"][0]["function"]["name"], "ClickAt");
        assert_eq!(
            json["tool_calls"][0]["function"]["arguments"],
            "{\"x\":1,\"y\":2}"
        );
    }

    #[test]
    fn test_tool_result_carries_call_id() {
        let msg = ChatMessage::from_message(&Message::tool_result("call_9", "Screen:1920×1080"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_9");
    }

    #[test]
    fn test_message_text_skips_images() {
        let msg = Message::User {
            parts: vec![
                ContentPart::Text("a".into()),
                ContentPart::Image(ImageData::png(vec![1])),
                ContentPart::Text("b".into()),
            ],
        };
        assert_eq!(msg.text(), "ab");
        assert_eq!(msg.role(), Role::User);
    }
}
