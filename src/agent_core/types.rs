//! Shared types for the agent core.
//!
//! The conversation model itself (`Message`, `ContentPart`, `ImageData`)
//! lives in `inference::types` because the backend serializes it; it is
//! re-exported here so callers of the agent core need only one import path.

use std::fmt;

use serde::Serialize;

pub use crate::inference::types::{ContentPart, ImageData, Message, Role, ToolCall};

// ─── Tool Results ───────────────────────────────────────────────────────────

/// Outcome of one dispatched tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Id of the `ToolCall` this result answers.
    pub call_id: String,
    pub content: String,
    /// Set by image-producing tools (screenshots).
    pub attached_image: Option<ImageData>,
}

// ─── Request Ids ────────────────────────────────────────────────────────────

/// Opaque id minted per streaming round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ─── Ask ────────────────────────────────────────────────────────────────────

/// Input for one `Ask`.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    /// Typed prompt; blank falls back to the configured default user prompt.
    pub prompt: String,
    /// Optional image attached to the user turn.
    pub image: Option<ImageData>,
    /// Keep earlier turns for this ask; `None` uses `session.memory`.
    pub memory: Option<bool>,
}

impl AskRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_memory(mut self, memory: bool) -> Self {
        self.memory = Some(memory);
        self
    }
}

/// How an `Ask` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AskOutcome {
    /// The backend finished without requesting more tools.
    Completed,
    /// The user stopped the request.
    Cancelled,
    /// A backend failure or an unknown tool ended the loop.
    Errored,
    /// Nothing to send (no text, no image).
    EmptyInput,
    /// Endpoint or API key not configured; no round was started.
    MissingConfiguration,
}

/// Where the orchestrator is in its loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    #[default]
    Idle,
    Sending,
    Streaming,
    ToolExecuting,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Sending => "sending",
            OrchestratorState::Streaming => "streaming",
            OrchestratorState::ToolExecuting => "tool_executing",
        };
        f.write_str(s)
    }
}
