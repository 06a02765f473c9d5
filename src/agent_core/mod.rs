//! Agent Core: the conversation side of Deskpilot.
//!
//! Submodules:
//! - `conversation`: Message history with the system-once and memory rules
//! - `cancellation`: Per-request cancellation tokens and the stop handle
//! - `orchestrator`: Ask / Stop / Reset and the stream-dispatch-resume loop
//! - `sink`: Where streamed text and displayed messages go
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod cancellation;
pub mod conversation;
pub mod errors;
pub mod orchestrator;
pub mod sink;
pub mod types;

// Re-exports for convenience
pub use cancellation::{CancellationRegistry, StopHandle};
pub use conversation::Conversation;
pub use errors::AgentError;
pub use orchestrator::Orchestrator;
pub use sink::{CollectingSink, OutputEvent, OutputSink};
pub use types::{AskOutcome, AskRequest, OrchestratorState, RequestId, ToolResult};
