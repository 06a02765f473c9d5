//! Inference: everything on the model side of the conversation.
//!
//! - Streaming requests over the OpenAI Chat Completions or Responses API
//! - SSE parsing into `StreamUpdate`s
//! - Tool-call reconstruction from streamed fragments
//! - Settings loading from `config.yaml`
//!
//! The orchestrator only depends on the `ModelBackend` trait, so the HTTP
//! client is interchangeable with an in-memory backend in tests.

pub mod backend;
pub mod byte_sequence;
pub mod client;
pub mod config;
pub mod errors;
pub mod responses;
pub mod streaming;
pub mod tool_call_builder;
pub mod types;

// Re-exports for convenience
pub use backend::{ApiFlavor, ModelBackend, StreamRequest, UpdateStream};
pub use byte_sequence::{ByteSequence, ByteSequenceBuilder};
pub use client::InferenceClient;
pub use config::{AppSettings, FileSettings, SettingsProvider};
pub use errors::InferenceError;
pub use tool_call_builder::ToolCallBuilder;
pub use types::{
    ContentPart, FinishReason, ImageData, Message, OutputItem, Role, StreamUpdate, ToolCall,
    ToolCallDelta, ToolDefinition,
};
