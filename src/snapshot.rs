//! Workspace snapshotting through the `git` binary.
//!
//! The workspace is a content-versioned tree so every hook/prompt edit the
//! agent makes is recoverable. Version control is an external collaborator:
//! the plugin shells out to `git` and treats its failures as log-worthy but
//! never user-visible.

use std::path::PathBuf;

use tokio::process::Command;

use crate::config::Config;
use crate::error::SnapshotError;

const IDENTITY_NAME: &str = "evolve";
const IDENTITY_EMAIL: &str = "evolve@localhost";

/// Commits workspace changes with a message; no-ops on a clean tree.
#[derive(Clone)]
pub struct Snapshotter {
    workspace: PathBuf,
    glyph: String,
}

impl Snapshotter {
    pub fn new(config: &Config) -> Self {
        Self {
            workspace: config.workspace.clone(),
            glyph: config.glyph.clone(),
        }
    }

    /// Initialize the repository and its commit identity.
    ///
    /// Safe to call on every plugin load; `git init` on an existing
    /// repository is harmless. Failures (git missing, unwritable tree)
    /// are logged and swallowed; snapshotting is best-effort.
    pub async fn init(&self) {
        if !self.workspace.join(".git").exists() {
            if let Err(e) = self.run(&["init"]).await {
                tracing::warn!("{} git init failed: {}", self.glyph, e);
                return;
            }
        }
        for (key, value) in [("user.name", IDENTITY_NAME), ("user.email", IDENTITY_EMAIL)] {
            if let Err(e) = self.run(&["config", key, value]).await {
                tracing::warn!("{} git config {} failed: {}", self.glyph, key, e);
            }
        }
    }

    /// Stage everything and commit with `message`.
    ///
    /// Returns without committing when the staged tree is empty.
    pub async fn commit(&self, message: &str) -> Result<(), SnapshotError> {
        self.run(&["add", "-A"]).await?;
        let status = self.run(&["status", "--porcelain"]).await?;
        if status.trim().is_empty() {
            return Ok(());
        }
        self.run(&["commit", "-m", message]).await?;
        tracing::debug!("{} committed: {}", self.glyph, message);
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<String, SnapshotError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workspace)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(SnapshotError::Git {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
