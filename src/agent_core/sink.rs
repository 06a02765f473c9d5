//! Output sink abstraction for decoupling the orchestrator from presentation.
//!
//! The orchestrator emits `OutputEvent`s without knowing whether they end up
//! in a terminal, a chat window or a test buffer.

use super::types::{Message, RequestId, ToolCall};

/// Events emitted while an `Ask` runs.
#[derive(Debug, Clone, Copy)]
pub enum OutputEvent<'a> {
    /// A round opened; a stop button should target this id.
    RequestStarted(&'a RequestId),

    /// A whole message to display (the user turn, tool results).
    Message(&'a Message),

    /// The assistant started a reply.
    AssistantTurnStarted,

    /// Incremental assistant text.
    TextChunk(&'a str),

    /// The assistant reply is complete for this round.
    AssistantTurnEnded,

    /// A finalized tool call is about to run.
    ToolCall(&'a ToolCall),

    /// Informational notice, such as the missing-configuration hint.
    Notice(&'a str),

    /// Terminal failure of the Ask.
    Error(&'a str),
}

/// Receiver of orchestrator output.
pub trait OutputSink: Send {
    fn handle(&mut self, event: OutputEvent<'_>);
}

/// A sink that records everything, for programmatic use and tests.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Every text chunk, in arrival order.
    pub chunks: Vec<String>,
    /// Whole messages appended for display.
    pub messages: Vec<Message>,
    pub request_ids: Vec<RequestId>,
    /// Names of tools announced before dispatch.
    pub tool_calls: Vec<String>,
    pub notices: Vec<String>,
    pub errors: Vec<String>,
    pub turns_started: usize,
    pub turns_ended: usize,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All streamed text concatenated.
    pub fn text(&self) -> String {
        self.chunks.concat()
    }
}

impl OutputSink for CollectingSink {
    fn handle(&mut self, event: OutputEvent<'_>) {
        match event {
            OutputEvent::RequestStarted(id) => self.request_ids.push(id.clone()),
            OutputEvent::Message(message) => self.messages.push(message.clone()),
            OutputEvent::AssistantTurnStarted => self.turns_started += 1,
            OutputEvent::TextChunk(chunk) => self.chunks.push(chunk.to_string()),
            OutputEvent::AssistantTurnEnded => self.turns_ended += 1,
            OutputEvent::ToolCall(call) => self.tool_calls.push(call.name.clone()),
            OutputEvent::Notice(notice) => self.notices.push(notice.to_string()),
            OutputEvent::Error(error) => self.errors.push(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_text() {
        let mut sink = CollectingSink::new();
        sink.handle(OutputEvent::TextChunk("Hello "));
        sink.handle(OutputEvent::TextChunk("World"));
        assert_eq!(sink.text(), "Hello World");
        assert_eq!(sink.chunks.len(), 2);
    }

    #[test]
    fn test_collecting_sink_turn_markers() {
        let mut sink = CollectingSink::new();
        sink.handle(OutputEvent::AssistantTurnStarted);
        sink.handle(OutputEvent::AssistantTurnEnded);
        sink.handle(OutputEvent::Error("Something went wrong."));
        assert_eq!((sink.turns_started, sink.turns_ended), (1, 1));
        assert_eq!(sink.errors, vec!["Something went wrong."]);
    }
}
