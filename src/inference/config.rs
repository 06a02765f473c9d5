//! Application settings loading and validation.
//!
//! Reads `config.yaml` (see [`find_config_path`]) and resolves environment
//! variables. The orchestrator asks a [`SettingsProvider`] for a fresh
//! snapshot on every `Ask`, so edits to the file take effect without a
//! restart.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::backend::ApiFlavor;
use super::errors::InferenceError;

/// Env var that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DESKPILOT_CONFIG";

const DEFAULT_SYSTEM_PROMPT: &str = "You are Deskpilot, an assistant that can see and operate \
the user's desktop. Use the provided tools to inspect the screen and drive the mouse and \
keyboard. Take a screenshot before acting on anything you have not seen yet.";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Model provider connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub api: ApiFlavor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub system_prompt: String,
    /// Used in place of a blank typed prompt (e.g. "What's on my screen?").
    pub user_prompt: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Keep history across `Ask`s.
    pub memory: bool,
    /// Offer the desktop-control tools to the model.
    pub computer_use: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            memory: false,
            computer_use: true,
        }
    }
}

/// Screen geometry reported by the headless input backend.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Top-level settings (mirrors `config.yaml`). Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub provider: ProviderSettings,
    pub prompts: PromptSettings,
    pub session: SessionSettings,
    pub screen: ScreenSettings,
}

impl AppSettings {
    /// Endpoint (without trailing slash) and API key, or the first missing field.
    pub fn credentials(&self) -> Result<(String, String), InferenceError> {
        let endpoint = self.provider.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(InferenceError::MissingCredentials { field: "endpoint" });
        }
        let api_key = self.provider.api_key.trim();
        if api_key.is_empty() {
            return Err(InferenceError::MissingCredentials { field: "api_key" });
        }
        Ok((endpoint.to_string(), api_key.to_string()))
    }
}

// ─── Providers ───────────────────────────────────────────────────────────────

/// Source of settings snapshots.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> Result<AppSettings, InferenceError>;
}

/// A fixed snapshot.
impl SettingsProvider for AppSettings {
    fn settings(&self) -> Result<AppSettings, InferenceError> {
        Ok(self.clone())
    }
}

/// Re-reads a YAML file on every call. A missing file yields defaults.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for FileSettings {
    fn settings(&self) -> Result<AppSettings, InferenceError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "config file absent, using defaults");
            return Ok(AppSettings::default());
        }
        load_settings(&self.path)
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Resolve the config file location.
///
/// `DESKPILOT_CONFIG` wins when set; otherwise
/// `<config_dir>/deskpilot/config.yaml`. The file need not exist.
pub fn find_config_path() -> PathBuf {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        if !explicit.trim().is_empty() {
            return PathBuf::from(expand_tilde(explicit.trim()));
        }
    }

    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deskpilot")
        .join("config.yaml")
}

/// Load and parse the settings file.
///
/// Performs environment-variable interpolation on string values matching
/// `${VAR_NAME}` or `${VAR_NAME:-default}`.
pub fn load_settings(path: &Path) -> Result<AppSettings, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_settings(&raw)
}

/// Parse settings from YAML text.
pub fn parse_settings(raw: &str) -> Result<AppSettings, InferenceError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(AppSettings::default());
    }

    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse config: {e}"),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                result.push_str(&resolve_var_expr(&after[..end]));
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated: keep verbatim
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);

    result
}

/// Resolve `VAR` or `VAR:-default`. An empty variable counts as unset.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((name, default)) => std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| expand_tilde(default)),
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
