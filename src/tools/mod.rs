//! Tools: the fixed catalogue of desktop-control tools and their dispatcher.
//!
//! Dispatch contract:
//! - Unknown tool name: fatal for the round (`AgentError::UnknownTool`)
//! - Arguments that do not match the declared schema: the call is skipped,
//!   no result is produced, the round carries on
//! - Otherwise the handler runs and its text (plus any screenshot) becomes
//!   the `ToolResult`

pub mod builtin;
pub mod input;
pub mod keys;
pub mod schema;

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent_core::errors::AgentError;
use crate::agent_core::types::{ToolCall, ToolResult};
use crate::inference::types::ToolDefinition;

pub use builtin::{BuiltinTool, ToolContext, ToolOutput, CATALOGUE};
pub use input::{
    FileCapturer, HeadlessInput, InputBackend, NoCapture, ScreenCapturer, SimulationError,
};
pub use keys::{KeyCode, MouseButton, ScrollDirection};
pub use schema::{ArgumentError, ToolArgs, ToolSpec};

/// Routes finalized tool calls to their handlers.
#[derive(Clone)]
pub struct ToolDispatcher {
    context: ToolContext,
    by_name: HashMap<&'static str, BuiltinTool>,
}

impl ToolDispatcher {
    pub fn new(input: Arc<dyn InputBackend>, capturer: Arc<dyn ScreenCapturer>) -> Self {
        let by_name = CATALOGUE.iter().map(|t| (t.spec.name, *t)).collect();
        Self {
            context: ToolContext { input, capturer },
            by_name,
        }
    }

    /// Tool schemas for the backend, in catalogue order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        CATALOGUE.iter().map(|t| t.spec.definition()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Run one call. `Ok(None)` means the call was skipped.
    pub async fn dispatch(&self, call: &ToolCall) -> Result<Option<ToolResult>, AgentError> {
        let tool = self
            .by_name
            .get(call.name.as_str())
            .ok_or_else(|| AgentError::UnknownTool {
                name: call.name.clone(),
                call_id: call.id.clone(),
            })?;

        let output = match tool
            .spec
            .validate(&call.arguments)
            .and_then(|args| (tool.handler)(&self.context, &args))
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    error = %e,
                    "skipping tool call with invalid arguments"
                );
                return Ok(None);
            }
        };

        tracing::info!(
            tool = %call.name,
            call_id = %call.id,
            result = %output.content,
            "tool executed"
        );

        Ok(Some(ToolResult {
            call_id: call.id.clone(),
            content: output.content,
            attached_image: output.image,
        }))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::byte_sequence::ByteSequence;
    use crate::inference::types::ImageData;
    use crate::tools::input::InputAction;

    struct StaticCapture;

    impl ScreenCapturer for StaticCapture {
        fn capture(&self) -> Result<ImageData, SimulationError> {
            Ok(ImageData::png(vec![0x89, b'P', b'N', b'G']))
        }
    }

    fn dispatcher() -> (Arc<HeadlessInput>, ToolDispatcher) {
        let input = Arc::new(HeadlessInput::new(1280, 720));
        let dispatcher = ToolDispatcher::new(input.clone(), Arc::new(StaticCapture));
        (input, dispatcher)
    }

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: ByteSequence::from(args.to_string()),
        }
    }

    #[test]
    fn test_definitions_follow_catalogue_order() {
        let (_, dispatcher) = dispatcher();
        let names: Vec<_> = dispatcher
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names.len(), 18);
        assert_eq!(&names[..3], ["GetScreenSize", "GetCurrentCursorPosition", "GetAllKeyNames"]);
        assert!(dispatcher.has_tool("WheelMouse"));
        assert!(!dispatcher.has_tool("wheelmouse"));
    }

    #[tokio::test]
    async fn test_dispatch_screen_size() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .dispatch(&call("call_1", "GetScreenSize", ""))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.call_id, "call_1");
        assert_eq!(result.content, "Screen:1280×720");
        assert!(result.attached_image.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        let (_, dispatcher) = dispatcher();
        let err = dispatcher
            .dispatch(&call("call_9", "FormatDisk", "{}"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::UnknownTool { ref name, ref call_id } if name == "FormatDisk" && call_id == "call_9"
        ));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_skipped() {
        let (input, dispatcher) = dispatcher();
        for args in ["{\"x\": 1}", "{\"x\": \"a\", \"y\": 2}", "not json"] {
            let result = dispatcher.dispatch(&call("c", "ClickAt", args)).await.unwrap();
            assert!(result.is_none(), "expected skip for {args}");
        }
        let result = dispatcher
            .dispatch(&call("c", "PressKey", "{\"key\": \"Enter\"}"))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(input.actions().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_coordinate_is_skipped() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .dispatch(&call("c", "MoveMouse", "{\"x\": 70000, \"y\": 0}"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_screenshot_attaches_image() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .dispatch(&call("shot", "TakeScreenshot", "{}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.content, "TakeScreenshot: Success");
        assert_eq!(
            result.attached_image.map(|i| i.media_type),
            Some("image/png".to_string())
        );
    }

    #[tokio::test]
    async fn test_dispatch_order_matches_call_order() {
        let (input, dispatcher) = dispatcher();
        let calls = [
            call("a", "MoveMouse", "{\"x\": 5, \"y\": 5}"),
            call("b", "InputText", "{\"text\": \"hi\"}"),
            call("c", "PressKey", "{\"key\": \"VcEnter\"}"),
        ];
        let mut ids = Vec::new();
        for c in &calls {
            if let Some(result) = dispatcher.dispatch(c).await.unwrap() {
                ids.push(result.call_id);
            }
        }
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(
            input.actions(),
            vec![
                InputAction::MouseMove(5, 5),
                InputAction::Text("hi".to_string()),
                InputAction::KeyPress(KeyCode::VcEnter),
                InputAction::KeyRelease(KeyCode::VcEnter),
            ]
        );
    }
}
