//! The built-in desktop tools.
//!
//! Every tool is a [`ToolSpec`] paired with a plain function handler. Handlers
//! run synchronously on the dispatcher's task; only `LongPressKey` schedules
//! work (the delayed key release) off the critical path.
//!
//! A failing simulation call does not fail the tool. The failure is written
//! into the result text so the model can see it and react.

use std::sync::Arc;
use std::time::Duration;

use crate::inference::types::ImageData;

use super::input::{InputBackend, ScreenCapturer, SimulationError};
use super::keys::{KeyCode, MouseButton, ScrollDirection};
use super::schema::{ArgKind, ArgSpec, ArgumentError, ToolArgs, ToolSpec};

const KEY_HINT: &str = "The key code to press (Use GetAllKeyNames to get key names)";

// ─── Handler plumbing ────────────────────────────────────────────────────────

/// Collaborators a handler may touch.
#[derive(Clone)]
pub struct ToolContext {
    pub input: Arc<dyn InputBackend>,
    pub capturer: Arc<dyn ScreenCapturer>,
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub image: Option<ImageData>,
}

impl ToolOutput {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            image: None,
        }
    }
}

pub type Handler = fn(&ToolContext, &ToolArgs) -> Result<ToolOutput, ArgumentError>;

/// One catalogue entry.
#[derive(Clone, Copy)]
pub struct BuiltinTool {
    pub spec: ToolSpec,
    pub handler: Handler,
}

/// `"{label}: Success"`, or the failure in its place.
fn report(label: String, outcome: Result<(), SimulationError>) -> ToolOutput {
    match outcome {
        Ok(()) => ToolOutput::text(format!("{label}: Success")),
        Err(e) => {
            tracing::warn!(error = %e, "{label} failed");
            ToolOutput::text(format!("{label}: Failed ({e})"))
        }
    }
}

fn click(input: &dyn InputBackend, button: MouseButton) -> Result<(), SimulationError> {
    input.mouse_press(button, None)?;
    input.mouse_release(button, None)
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

/// Every tool, in the order offered to the model.
pub const CATALOGUE: &[BuiltinTool] = &[
    BuiltinTool {
        spec: ToolSpec {
            name: "GetScreenSize",
            description: "Get the screen size",
            args: &[],
        },
        handler: get_screen_size,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "GetCurrentCursorPosition",
            description: "Get the current cursor position",
            args: &[],
        },
        handler: get_cursor_position,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "GetAllKeyNames",
            description: "Get all available key names",
            args: &[],
        },
        handler: get_all_key_names,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "InputText",
            description: "Simulate text input. Prefer using this method for entering text instead of press keys.",
            args: &[ArgSpec::new("text", ArgKind::String, "The text to input")],
        },
        handler: input_text,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "PressKey",
            description: "Simulate a key press and release",
            args: &[ArgSpec::new("key", ArgKind::Key, KEY_HINT)],
        },
        handler: press_key,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "LongPressKey",
            description: "Simulate a key press and release after a specified duration (long press)",
            args: &[
                ArgSpec::new("key", ArgKind::Key, KEY_HINT),
                ArgSpec::new(
                    "duration_ms",
                    ArgKind::Integer,
                    "The duration in milliseconds to hold the key before releasing",
                ),
            ],
        },
        handler: long_press_key,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "PressKeyCombination",
            description: "Simulate a key combination (modifier + key)",
            // Parsed by the handler so a bad name is reported, not skipped
            args: &[
                ArgSpec::new(
                    "modifier",
                    ArgKind::String,
                    "Modifier key (Use GetAllKeyNames to get key names)",
                ),
                ArgSpec::new(
                    "key",
                    ArgKind::String,
                    "Main key to press (Use GetAllKeyNames to get key names)",
                ),
            ],
        },
        handler: press_key_combination,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "LeftClick",
            description: "Simulate left mouse click",
            args: &[],
        },
        handler: left_click,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "RightClick",
            description: "Simulate right mouse click",
            args: &[],
        },
        handler: right_click,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "MiddleClick",
            description: "Simulate middle mouse click",
            args: &[],
        },
        handler: middle_click,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "DoubleClick",
            description: "Perform a double click",
            args: &[],
        },
        handler: double_click,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "TripleClick",
            description: "Perform a triple click",
            args: &[],
        },
        handler: triple_click,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "ClickAt",
            description: "Simulate a mouse left-click at the given coordinates",
            args: &[
                ArgSpec::new("x", ArgKind::Integer, "X coordinate"),
                ArgSpec::new("y", ArgKind::Integer, "Y coordinate"),
            ],
        },
        handler: click_at,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "ClickAndDrag",
            description: "Click and drag the mouse from a start coordinate to an end coordinate",
            args: &[
                ArgSpec::new("startX", ArgKind::Integer, "Start X coordinate"),
                ArgSpec::new("startY", ArgKind::Integer, "Start Y coordinate"),
                ArgSpec::new("endX", ArgKind::Integer, "End X coordinate"),
                ArgSpec::new("endY", ArgKind::Integer, "End Y coordinate"),
            ],
        },
        handler: click_and_drag,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "MoveMouse",
            description: "Move mouse pointer to absolute coordinates",
            args: &[
                ArgSpec::new("x", ArgKind::Integer, "X coordinate"),
                ArgSpec::new("y", ArgKind::Integer, "Y coordinate"),
            ],
        },
        handler: move_mouse,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "MoveMouseRelative",
            description: "Move mouse pointer relative to current position",
            args: &[
                ArgSpec::new("dx", ArgKind::Integer, "Delta X"),
                ArgSpec::new("dy", ArgKind::Integer, "Delta Y"),
            ],
        },
        handler: move_mouse_relative,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "WheelMouse",
            description: "Scroll mouse wheel",
            args: &[
                ArgSpec::new("rotation", ArgKind::Integer, "Rotation amount"),
                ArgSpec::new(
                    "direction",
                    ArgKind::Enum(ScrollDirection::NAMES),
                    "Vertical or Horizontal",
                ),
            ],
        },
        handler: wheel_mouse,
    },
    BuiltinTool {
        spec: ToolSpec {
            name: "TakeScreenshot",
            description: "Take a screenshot of the screen.",
            args: &[],
        },
        handler: take_screenshot,
    },
];

// ─── Handlers ────────────────────────────────────────────────────────────────

fn get_screen_size(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(ToolOutput::text(match ctx.input.screen_size() {
        Some((w, h)) => format!("Screen:{w}×{h}"),
        None => "Can't get screen size".to_string(),
    }))
}

fn get_cursor_position(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(ToolOutput::text(match ctx.input.cursor_position() {
        Some((x, y)) => format!("X:{x}, Y:{y}"),
        None => "Can't get cursor position".to_string(),
    }))
}

fn get_all_key_names(_: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(ToolOutput::text(KeyCode::NAMES.join(",")))
}

fn input_text(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let text = args.str("text")?;
    Ok(report(text.to_string(), ctx.input.enter_text(text)))
}

fn press_key(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let key = args.key("key")?;
    let outcome = ctx
        .input
        .key_press(key)
        .and_then(|()| ctx.input.key_release(key));
    Ok(report(format!("PressKey: {key}"), outcome))
}

fn long_press_key(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let key = args.key("key")?;
    let duration_ms: i32 = args.int("duration_ms")?;
    // Negative durations release immediately
    let hold = Duration::from_millis(u64::try_from(duration_ms).unwrap_or(0));

    let pressed = ctx.input.key_press(key);
    if pressed.is_ok() {
        let input = Arc::clone(&ctx.input);
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            if let Err(e) = input.key_release(key) {
                tracing::warn!(key = %key, error = %e, "delayed key release failed");
            }
        });
    }
    Ok(report(format!("LongPressKey: {key}"), pressed))
}

fn press_key_combination(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let modifier = args.str("modifier")?.parse::<KeyCode>();
    let key = args.str("key")?.parse::<KeyCode>();
    let (Ok(modifier), Ok(key)) = (modifier, key) else {
        return Ok(ToolOutput::text("Invalid key combination"));
    };

    let input = &ctx.input;
    let outcome = (|| {
        input.key_press(modifier)?;
        input.key_press(key)?;
        input.key_release(key)?;
        input.key_release(modifier)
    })();
    Ok(report(format!("PressKeyCombination: {modifier}-{key}"), outcome))
}

fn left_click(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(report(
        "LeftClick".to_string(),
        click(ctx.input.as_ref(), MouseButton::Left),
    ))
}

fn right_click(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(report(
        "RightClick".to_string(),
        click(ctx.input.as_ref(), MouseButton::Right),
    ))
}

fn middle_click(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    Ok(report(
        "MiddleClick".to_string(),
        click(ctx.input.as_ref(), MouseButton::Middle),
    ))
}

fn double_click(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let input = ctx.input.as_ref();
    let outcome = click(input, MouseButton::Left).and_then(|()| click(input, MouseButton::Left));
    Ok(report("DoubleClick".to_string(), outcome))
}

fn triple_click(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let input = ctx.input.as_ref();
    let outcome = (0..3).try_for_each(|_| click(input, MouseButton::Left));
    Ok(report("TripleClick".to_string(), outcome))
}

fn click_at(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let x: i16 = args.int("x")?;
    let y: i16 = args.int("y")?;
    let at = Some((x, y));
    let outcome = ctx
        .input
        .mouse_press(MouseButton::Left, at)
        .and_then(|()| ctx.input.mouse_release(MouseButton::Left, at));
    Ok(report(format!("ClickAt: ({x},{y})"), outcome))
}

fn click_and_drag(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let start: (i16, i16) = (args.int("startX")?, args.int("startY")?);
    let end: (i16, i16) = (args.int("endX")?, args.int("endY")?);

    let input = &ctx.input;
    let outcome = (|| {
        input.mouse_press(MouseButton::Left, Some(start))?;
        input.mouse_move(end.0, end.1)?;
        input.mouse_release(MouseButton::Left, Some(end))
    })();
    Ok(report("ClickAndDrag".to_string(), outcome))
}

fn move_mouse(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let x: i16 = args.int("x")?;
    let y: i16 = args.int("y")?;
    Ok(report(
        format!("MoveMouse: ({x},{y})"),
        ctx.input.mouse_move(x, y),
    ))
}

fn move_mouse_relative(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let dx: i16 = args.int("dx")?;
    let dy: i16 = args.int("dy")?;
    Ok(report(
        format!("MoveMouseRelative: ({dx},{dy})"),
        ctx.input.mouse_move_relative(dx, dy),
    ))
}

fn wheel_mouse(ctx: &ToolContext, args: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    let rotation: i16 = args.int("rotation")?;
    let direction = args.direction("direction")?;
    Ok(report(
        format!("WheelMouse: ({direction}-{rotation})"),
        ctx.input.mouse_wheel(rotation, direction),
    ))
}

fn take_screenshot(ctx: &ToolContext, _: &ToolArgs) -> Result<ToolOutput, ArgumentError> {
    match ctx.capturer.capture() {
        Ok(image) => Ok(ToolOutput {
            content: "TakeScreenshot: Success".to_string(),
            image: Some(image),
        }),
        Err(e) => Ok(report("TakeScreenshot".to_string(), Err(e))),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::byte_sequence::ByteSequence;
    use crate::tools::input::{HeadlessInput, InputAction, NoCapture};

    fn context() -> (Arc<HeadlessInput>, ToolContext) {
        let input = Arc::new(HeadlessInput::new(1920, 1080));
        let ctx = ToolContext {
            input: input.clone(),
            capturer: Arc::new(NoCapture),
        };
        (input, ctx)
    }

    fn run(ctx: &ToolContext, name: &str, raw: &str) -> ToolOutput {
        let tool = CATALOGUE
            .iter()
            .find(|t| t.spec.name == name)
            .expect("tool in catalogue");
        let args = tool.spec.validate(&ByteSequence::from(raw.to_string())).unwrap();
        (tool.handler)(ctx, &args).unwrap()
    }

    #[test]
    fn test_catalogue_has_eighteen_unique_tools() {
        let mut names: Vec<_> = CATALOGUE.iter().map(|t| t.spec.name).collect();
        assert_eq!(names.len(), 18);
        assert_eq!(names[0], "GetScreenSize");
        assert_eq!(names[17], "TakeScreenshot");
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn test_query_tools() {
        let (_, ctx) = context();
        assert_eq!(run(&ctx, "GetScreenSize", "").content, "Screen:1920×1080");
        assert_eq!(run(&ctx, "GetCurrentCursorPosition", "{}").content, "X:0, Y:0");
        let names = run(&ctx, "GetAllKeyNames", "").content;
        assert!(names.starts_with("VcEscape,VcF1,"));
    }

    #[test]
    fn test_press_key_combination_reports_both_keys() {
        let (input, ctx) = context();
        let out = run(
            &ctx,
            "PressKeyCombination",
            r#"{"modifier": "VcLeftControl", "key": "VcC"}"#,
        );
        assert_eq!(out.content, "PressKeyCombination: VcLeftControl-VcC: Success");
        assert_eq!(
            input.actions(),
            vec![
                InputAction::KeyPress(KeyCode::VcLeftControl),
                InputAction::KeyPress(KeyCode::VcC),
                InputAction::KeyRelease(KeyCode::VcC),
                InputAction::KeyRelease(KeyCode::VcLeftControl),
            ]
        );
    }

    #[test]
    fn test_invalid_key_combination_is_reported() {
        let (input, ctx) = context();
        let out = run(
            &ctx,
            "PressKeyCombination",
            r#"{"modifier": "Ctrl", "key": "VcC"}"#,
        );
        assert_eq!(out.content, "Invalid key combination");
        assert!(input.actions().is_empty());
    }

    #[test]
    fn test_click_and_drag_sequence() {
        let (input, ctx) = context();
        let out = run(
            &ctx,
            "ClickAndDrag",
            r#"{"startX": 1, "startY": 2, "endX": 30, "endY": 40}"#,
        );
        assert_eq!(out.content, "ClickAndDrag: Success");
        assert_eq!(
            input.actions(),
            vec![
                InputAction::MousePress(MouseButton::Left, Some((1, 2))),
                InputAction::MouseMove(30, 40),
                InputAction::MouseRelease(MouseButton::Left, Some((30, 40))),
            ]
        );
    }

    #[test]
    fn test_triple_click_is_three_left_clicks() {
        let (input, ctx) = context();
        assert_eq!(run(&ctx, "TripleClick", "").content, "TripleClick: Success");
        assert_eq!(input.actions().len(), 6);
    }

    #[test]
    fn test_pointer_results_echo_arguments() {
        let (_, ctx) = context();
        assert_eq!(
            run(&ctx, "ClickAt", r#"{"x": 10, "y": -4}"#).content,
            "ClickAt: (10,-4): Success"
        );
        assert_eq!(
            run(&ctx, "MoveMouseRelative", r#"{"dx": 5, "dy": 6}"#).content,
            "MoveMouseRelative: (5,6): Success"
        );
        assert_eq!(
            run(&ctx, "WheelMouse", r#"{"rotation": -120, "direction": "Horizontal"}"#).content,
            "WheelMouse: (Horizontal--120): Success"
        );
        assert_eq!(
            run(&ctx, "InputText", r#"{"text": "hello"}"#).content,
            "hello: Success"
        );
    }

    #[test]
    fn test_screenshot_failure_is_reported_without_image() {
        let (_, ctx) = context();
        let out = run(&ctx, "TakeScreenshot", "");
        assert!(out.content.starts_with("TakeScreenshot: Failed"));
        assert!(out.image.is_none());
    }

    #[tokio::test]
    async fn test_long_press_releases_later() {
        let (input, ctx) = context();
        let out = run(&ctx, "LongPressKey", r#"{"key": "VcA", "duration_ms": 30}"#);
        assert_eq!(out.content, "LongPressKey: VcA: Success");
        assert_eq!(input.actions(), vec![InputAction::KeyPress(KeyCode::VcA)]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            input.actions(),
            vec![
                InputAction::KeyPress(KeyCode::VcA),
                InputAction::KeyRelease(KeyCode::VcA),
            ]
        );
    }
}
