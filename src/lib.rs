//! Deskpilot: a chat assistant that can drive the desktop.
//!
//! The model streams text and tool calls; the orchestrator reassembles the
//! calls, runs them against the input backend and feeds the results back
//! until the model is done.

pub mod agent_core;
pub mod inference;
pub mod logging;
pub mod tools;

use std::path::PathBuf;

/// Return the platform-standard data directory for Deskpilot.
///
/// - macOS: `~/Library/Application Support/deskpilot/`
/// - Windows: `{FOLDERID_RoamingAppData}\deskpilot\`
/// - Linux: `$XDG_DATA_HOME/deskpilot/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.deskpilot/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("deskpilot");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".deskpilot")
}
