//! Conversation: the ordered message history of one chat session.
//!
//! Responsibilities:
//! - Keep the System message first, inserted exactly once per history
//! - Honour the memory flag (history cleared before each turn when off)
//! - Append assistant, tool-call and tool-result turns in round order
//!
//! The orchestrator is the only writer.

use super::types::{ContentPart, ImageData, Message, ToolCall, ToolResult};

#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full history, System message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Start a user turn.
    ///
    /// Without memory the history is cleared first. The System message is
    /// inserted only when the history is empty, so it is never duplicated.
    pub fn begin_turn(&mut self, system_prompt: &str, user: Message, memory: bool) {
        if !memory {
            self.messages.clear();
        }
        if self.messages.is_empty() {
            self.messages.push(Message::system(system_prompt));
        }
        self.messages.push(user);
    }

    /// Append a plain assistant reply. Empty text appends nothing.
    pub fn add_assistant_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.messages.push(Message::assistant_text(text));
        }
    }

    /// Append the assistant turn that requested `calls`.
    pub fn add_tool_calls(&mut self, calls: Vec<ToolCall>, text: &str) {
        self.messages.push(Message::assistant_tool_calls(calls, text));
    }

    /// Append a tool result, followed by a synthetic user turn carrying the
    /// attached image when there is one.
    pub fn add_tool_result(&mut self, result: ToolResult) {
        self.messages
            .push(Message::tool_result(result.call_id, result.content));
        if let Some(image) = result.attached_image {
            self.messages.push(Message::user_image(image));
        }
    }
}

/// Build the user message for a turn; `None` when there is nothing to send.
pub fn user_message(prompt: &str, image: Option<ImageData>) -> Option<Message> {
    let mut parts = Vec::with_capacity(2);
    if !prompt.trim().is_empty() {
        parts.push(ContentPart::Text(prompt.to_string()));
    }
    if let Some(image) = image {
        parts.push(ContentPart::Image(image));
    }
    if parts.is_empty() {
        None
    } else {
        Some(Message::User { parts })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::Role;

    fn roles(conv: &Conversation) -> Vec<Role> {
        conv.messages().iter().map(Message::role).collect()
    }

    #[test]
    fn test_system_inserted_once_with_memory() {
        let mut conv = Conversation::new();
        conv.begin_turn("sys", Message::user_text("one"), true);
        conv.add_assistant_text("1");
        conv.begin_turn("sys", Message::user_text("two"), true);

        assert_eq!(
            roles(&conv),
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(conv.messages()[3].text(), "two");
    }

    #[test]
    fn test_without_memory_history_restarts() {
        let mut conv = Conversation::new();
        conv.begin_turn("sys", Message::user_text("one"), false);
        conv.add_assistant_text("1");
        conv.begin_turn("sys", Message::user_text("two"), false);

        assert_eq!(roles(&conv), vec![Role::System, Role::User]);
        assert_eq!(conv.messages()[1].text(), "two");
    }

    #[test]
    fn test_empty_assistant_text_not_appended() {
        let mut conv = Conversation::new();
        conv.begin_turn("sys", Message::user_text("hi"), false);
        conv.add_assistant_text("");
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_tool_result_with_image_adds_user_turn() {
        let mut conv = Conversation::new();
        conv.add_tool_result(ToolResult {
            call_id: "call_1".into(),
            content: "TakeScreenshot: Success".into(),
            attached_image: Some(ImageData::png(vec![1, 2, 3])),
        });
        assert_eq!(roles(&conv), vec![Role::Tool, Role::User]);
        assert!(matches!(
            conv.messages()[1].parts(),
            [ContentPart::Image(_)]
        ));
    }

    #[test]
    fn test_user_message_requires_text_or_image() {
        assert!(user_message("   ", None).is_none());
        assert!(user_message("", Some(ImageData::png(vec![0]))).is_some());
        let msg = user_message("look", Some(ImageData::png(vec![0]))).unwrap();
        assert_eq!(msg.parts().len(), 2);
    }
}
