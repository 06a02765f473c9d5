//! Input-simulation and screen-capture collaborators.
//!
//! The built-in tools talk to the desktop only through these two traits.
//! A platform backend drives the real mouse and keyboard; the
//! [`HeadlessInput`] backend here records every action and tracks a virtual
//! cursor, which is what the CLI dry-run mode and the tests use.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::inference::types::ImageData;

use super::keys::{KeyCode, MouseButton, ScrollDirection};

/// A simulation or capture call failed. Reported in the tool result text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("not supported by this backend: {operation}")]
    Unsupported { operation: &'static str },

    #[error("{operation} failed: {reason}")]
    Failed {
        operation: &'static str,
        reason: String,
    },
}

/// Synthetic mouse and keyboard input.
pub trait InputBackend: Send + Sync {
    /// Screen size in pixels, if known.
    fn screen_size(&self) -> Option<(u32, u32)>;
    fn cursor_position(&self) -> Option<(i32, i32)>;

    fn enter_text(&self, text: &str) -> Result<(), SimulationError>;
    fn key_press(&self, key: KeyCode) -> Result<(), SimulationError>;
    fn key_release(&self, key: KeyCode) -> Result<(), SimulationError>;

    /// Press `button`, at `at` when given, else at the current position.
    fn mouse_press(&self, button: MouseButton, at: Option<(i16, i16)>)
        -> Result<(), SimulationError>;
    fn mouse_release(
        &self,
        button: MouseButton,
        at: Option<(i16, i16)>,
    ) -> Result<(), SimulationError>;
    fn mouse_move(&self, x: i16, y: i16) -> Result<(), SimulationError>;
    fn mouse_move_relative(&self, dx: i16, dy: i16) -> Result<(), SimulationError>;
    fn mouse_wheel(&self, rotation: i16, direction: ScrollDirection)
        -> Result<(), SimulationError>;
}

/// Screenshot source.
pub trait ScreenCapturer: Send + Sync {
    fn capture(&self) -> Result<ImageData, SimulationError>;
}

// ─── Headless backend ────────────────────────────────────────────────────────

/// One recorded input action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Text(String),
    KeyPress(KeyCode),
    KeyRelease(KeyCode),
    MousePress(MouseButton, Option<(i16, i16)>),
    MouseRelease(MouseButton, Option<(i16, i16)>),
    MouseMove(i16, i16),
    MouseMoveRelative(i16, i16),
    Wheel(i16, ScrollDirection),
}

/// Oldest actions are dropped past this many.
pub const MAX_RECORDED_ACTIONS: usize = 1024;

#[derive(Debug)]
struct HeadlessState {
    cursor: (i32, i32),
    actions: VecDeque<InputAction>,
}

/// Records actions instead of performing them.
#[derive(Debug)]
pub struct HeadlessInput {
    screen: (u32, u32),
    state: Mutex<HeadlessState>,
}

impl HeadlessInput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: (width, height),
            state: Mutex::new(HeadlessState {
                cursor: (0, 0),
                actions: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The retained actions, oldest first.
    pub fn actions(&self) -> Vec<InputAction> {
        self.lock().actions.iter().cloned().collect()
    }

    /// Take the retained actions, leaving the log empty.
    pub fn drain_actions(&self) -> Vec<InputAction> {
        self.lock().actions.drain(..).collect()
    }

    fn record(&self, action: InputAction) -> Result<(), SimulationError> {
        tracing::info!(?action, "simulated input");
        let mut state = self.lock();
        match action {
            InputAction::MouseMove(x, y)
            | InputAction::MousePress(_, Some((x, y)))
            | InputAction::MouseRelease(_, Some((x, y))) => {
                state.cursor = (i32::from(x), i32::from(y));
            }
            InputAction::MouseMoveRelative(dx, dy) => {
                state.cursor.0 += i32::from(dx);
                state.cursor.1 += i32::from(dy);
            }
            _ => {}
        }
        if state.actions.len() == MAX_RECORDED_ACTIONS {
            state.actions.pop_front();
        }
        state.actions.push_back(action);
        Ok(())
    }
}

impl InputBackend for HeadlessInput {
    fn screen_size(&self) -> Option<(u32, u32)> {
        Some(self.screen)
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(self.lock().cursor)
    }

    fn enter_text(&self, text: &str) -> Result<(), SimulationError> {
        self.record(InputAction::Text(text.to_string()))
    }

    fn key_press(&self, key: KeyCode) -> Result<(), SimulationError> {
        self.record(InputAction::KeyPress(key))
    }

    fn key_release(&self, key: KeyCode) -> Result<(), SimulationError> {
        self.record(InputAction::KeyRelease(key))
    }

    fn mouse_press(
        &self,
        button: MouseButton,
        at: Option<(i16, i16)>,
    ) -> Result<(), SimulationError> {
        self.record(InputAction::MousePress(button, at))
    }

    fn mouse_release(
        &self,
        button: MouseButton,
        at: Option<(i16, i16)>,
    ) -> Result<(), SimulationError> {
        self.record(InputAction::MouseRelease(button, at))
    }

    fn mouse_move(&self, x: i16, y: i16) -> Result<(), SimulationError> {
        self.record(InputAction::MouseMove(x, y))
    }

    fn mouse_move_relative(&self, dx: i16, dy: i16) -> Result<(), SimulationError> {
        self.record(InputAction::MouseMoveRelative(dx, dy))
    }

    fn mouse_wheel(
        &self,
        rotation: i16,
        direction: ScrollDirection,
    ) -> Result<(), SimulationError> {
        self.record(InputAction::Wheel(rotation, direction))
    }
}

// ─── Capturers ───────────────────────────────────────────────────────────────

/// Capturer for environments without screen access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl ScreenCapturer for NoCapture {
    fn capture(&self) -> Result<ImageData, SimulationError> {
        Err(SimulationError::Unsupported {
            operation: "screen capture",
        })
    }
}

/// Serves a PNG read from disk on every capture.
#[derive(Debug, Clone)]
pub struct FileCapturer {
    path: PathBuf,
}

impl FileCapturer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScreenCapturer for FileCapturer {
    fn capture(&self) -> Result<ImageData, SimulationError> {
        let bytes = std::fs::read(&self.path).map_err(|e| SimulationError::Failed {
            operation: "screen capture",
            reason: format!("{}: {e}", self.path.display()),
        })?;
        Ok(ImageData::png(bytes))
    }
}
