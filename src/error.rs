//! Error types for the evolve plugin.

use std::time::Duration;

/// Top-level error type for the plugin.
///
/// Host callbacks never let this escape: every callback catches, logs, and
/// degrades to a no-op. The variants exist so that internal components can
/// propagate failures with `?` up to the boundary that decides the policy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hook subprocess errors.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Failed to spawn hook {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Hook {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("Hook {name} failed: exit {status}")]
    Exit {
        name: String,
        /// Exit code as a string, or `"signal"` when killed by a signal.
        status: String,
        stderr: String,
    },

    #[error("Hook {name} produced malformed output line {line:?}: {reason}")]
    Malformed {
        name: String,
        line: String,
        reason: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sandbox validation errors.
///
/// Only covers failures of the sandbox machinery itself; a test command
/// that exits non-zero is a *validation result*, not an error.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Failed to materialize sandbox workspace: {0}")]
    Setup(std::io::Error),

    #[error("Failed to launch test command {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Workspace snapshot (version control) errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

/// Host SDK errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error("Host call failed: {0}")]
    Sdk(String),
}

/// Result type alias for the plugin.
pub type Result<T> = std::result::Result<T, Error>;
