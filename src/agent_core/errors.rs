//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that can occur while running a conversation.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model asked for a tool that is not in the catalogue.
    #[error("unknown tool '{name}' (call {call_id})")]
    UnknownTool { name: String, call_id: String },

    /// The backend failed to open or deliver a stream.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The stream closed before any finish signal arrived.
    #[error("stream for request {request_id} ended without a finish signal")]
    StreamEndedWithoutFinish { request_id: String },

    /// Reset or a second Ask was attempted while a round is in flight.
    #[error("orchestrator is busy ({state})")]
    NotIdle { state: String },
}

impl AgentError {
    /// One-line description for logs; backend errors are condensed.
    pub fn summary(&self) -> String {
        match self {
            AgentError::Inference(e) => e.summary(),
            other => other.to_string(),
        }
    }
}
