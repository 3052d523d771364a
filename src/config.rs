//! Configuration for the evolve plugin.
//!
//! Resolved once at plugin load and never mutated. Values come from an
//! optional JSONC document at `<workspace>/config/evolve.jsonc` merged
//! over built-in defaults; the workspace root itself comes from the
//! environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::util::strip_jsonc_comments;

/// Preferred environment variable naming the workspace root.
pub const WORKSPACE_ENV: &str = "OPENCODE_EVOLVE_WORKSPACE";

/// Legacy alias kept for workspaces created by older releases.
pub const WORKSPACE_ENV_LEGACY: &str = "OPENCODE_SIDECAR_WORKSPACE";

/// Resolved plugin configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace root directory.
    pub workspace: PathBuf,
    /// Hook script basename under `<workspace>/hooks/`.
    pub hook: String,
    /// Heartbeat period.
    pub heartbeat: Duration,
    /// Per-subprocess timeout (hook invocations and sandbox test runs).
    pub hook_timeout: Duration,
    /// Title of the background heartbeat session.
    pub heartbeat_title: String,
    /// Agent id used for injected prompts.
    pub heartbeat_agent: String,
    /// Prefix glyph for log/output lines.
    pub glyph: String,
    /// Workspace-relative test command for sandbox validation.
    pub test_script: Option<String>,
}

/// On-disk configuration document. All fields optional; anything absent
/// falls back to the defaults in [`Config::load_from`].
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    hook: Option<String>,
    heartbeat_ms: Option<u64>,
    hook_timeout: Option<u64>,
    heartbeat_title: Option<String>,
    heartbeat_agent: Option<String>,
    glyph: Option<String>,
    test_script: Option<String>,
}

impl Config {
    /// Load configuration for the workspace named by the environment.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load_from(workspace_from_env())
    }

    /// Load configuration for an explicit workspace root.
    pub fn load_from(workspace: PathBuf) -> Result<Self, ConfigError> {
        let doc = read_document(&workspace.join("config").join("evolve.jsonc"));

        let heartbeat_ms = doc.heartbeat_ms.unwrap_or(1_800_000);
        if heartbeat_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "heartbeat_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }
        let hook_timeout_ms = doc.hook_timeout.unwrap_or(30_000);
        if hook_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "hook_timeout".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        Ok(Self {
            workspace,
            hook: doc.hook.unwrap_or_else(|| "evolve.py".to_string()),
            heartbeat: Duration::from_millis(heartbeat_ms),
            hook_timeout: Duration::from_millis(hook_timeout_ms),
            heartbeat_title: doc
                .heartbeat_title
                .unwrap_or_else(|| "heartbeat".to_string()),
            heartbeat_agent: doc.heartbeat_agent.unwrap_or_else(|| "evolve".to_string()),
            glyph: doc.glyph.unwrap_or_else(|| "⚡".to_string()),
            test_script: doc.test_script.filter(|s| !s.is_empty()),
        })
    }

    /// Absolute path of the hook script.
    pub fn hook_path(&self) -> PathBuf {
        self.hooks_dir().join(&self.hook)
    }

    /// Directory holding the hook script.
    pub fn hooks_dir(&self) -> PathBuf {
        self.workspace.join("hooks")
    }

    /// Directory holding prompt fragments (`*.md`).
    pub fn prompts_dir(&self) -> PathBuf {
        self.workspace.join("prompts")
    }

    /// Path of the persisted runtime state document.
    pub fn runtime_state_path(&self) -> PathBuf {
        self.workspace.join("config").join("runtime.json")
    }

    /// File stem of the hook script, used as the tool-name prefix.
    ///
    /// Replacing `evolve.py` with `persona.py` renames every registered
    /// tool uniformly.
    pub fn hook_stem(&self) -> &str {
        Path::new(&self.hook)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.hook)
    }
}

/// Resolve the workspace root from the environment, falling back to
/// `<home>/workspace`.
fn workspace_from_env() -> PathBuf {
    for var in [WORKSPACE_ENV, WORKSPACE_ENV_LEGACY] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return PathBuf::from(value);
            }
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("workspace")
}

/// Read and parse the optional JSONC config document.
///
/// A missing file is the common case; a malformed one must not keep the
/// plugin from loading, so it degrades to defaults with a warning.
fn read_document(path: &Path) -> ConfigDocument {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return ConfigDocument::default(),
    };
    match serde_json::from_str(&strip_jsonc_comments(&raw)) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Ignoring malformed config at {}: {}", path.display(), e);
            ConfigDocument::default()
        }
    }
}
