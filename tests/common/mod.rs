//! Shared fixtures for the integration suites: a scratch workspace with a
//! generated `/bin/sh` hook script, and a mock host that records every
//! SDK call the plugin makes.
#![allow(dead_code)] // each suite uses a different subset of the fixtures

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use evolve::config::Config;
use evolve::error::HostError;
use evolve::host::{Host, PromptRequest, SessionInfo};
use evolve::plugin::Plugin;

/// Scratch workspace with helpers to install hook scripts and config docs.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create workspace tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Install a hook script at `hooks/evolve.py` with execute permission.
    pub fn write_hook(&self, script: &str) {
        self.write_executable("hooks/evolve.py", script);
    }

    /// Write the workspace config document.
    pub fn write_config(&self, body: &str) {
        self.write_file("config/evolve.jsonc", body);
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write file");
    }

    pub fn write_executable(&self, relative: &str, content: &str) {
        self.write_file(relative, content);
        let path = self.path().join(relative);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod executable");
        }
    }

    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path().join(relative)).expect("read file")
    }

    pub fn config(&self) -> Config {
        Config::load_from(self.path().to_path_buf()).expect("load config")
    }

    /// How many times the hook was invoked with a given hook name, as
    /// recorded by scripts generated with [`counting_preamble`].
    pub fn invocations(&self, hook_name: &str) -> usize {
        match std::fs::read_to_string(self.path().join("calls.log")) {
            Ok(log) => log.lines().filter(|l| *l == hook_name).count(),
            Err(_) => 0,
        }
    }
}

/// Shell fragment that records each invocation's hook name into
/// `calls.log` inside the workspace.
pub fn counting_preamble(workspace: &Path) -> String {
    format!("echo \"$1\" >> \"{}/calls.log\"\n", workspace.display())
}

/// Mock host recording sessions and prompts.
#[derive(Default)]
pub struct MockHost {
    pub sessions: Mutex<Vec<SessionInfo>>,
    pub prompts: Mutex<Vec<PromptRequest>>,
    pub detached: Mutex<Vec<PromptRequest>>,
    /// Artificial latency for blocking prompts, to simulate long turns.
    pub prompt_delay: Duration,
    counter: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_prompt_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            prompt_delay: delay,
            ..Self::default()
        })
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().expect("lock").len()
    }

    pub fn detached_count(&self) -> usize {
        self.detached.lock().expect("lock").len()
    }
}

#[async_trait]
impl Host for MockHost {
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, HostError> {
        Ok(self.sessions.lock().expect("lock").clone())
    }

    async fn create_session(&self, title: &str) -> Result<SessionInfo, HostError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let session = SessionInfo {
            id: format!("session-{n}"),
            title: title.to_string(),
        };
        self.sessions.lock().expect("lock").push(session.clone());
        Ok(session)
    }

    async fn prompt(&self, request: PromptRequest) -> Result<(), HostError> {
        if !self.prompt_delay.is_zero() {
            tokio::time::sleep(self.prompt_delay).await;
        }
        self.prompts.lock().expect("lock").push(request);
        Ok(())
    }

    async fn prompt_detached(&self, request: PromptRequest) -> Result<(), HostError> {
        self.detached.lock().expect("lock").push(request);
        Ok(())
    }
}

/// Build a plugin over the workspace with the given host.
pub async fn plugin_for(workspace: &TestWorkspace, host: Arc<MockHost>) -> Arc<Plugin> {
    Plugin::new(workspace.config(), host).await
}

/// Text of the single text part of a prompt request.
pub fn prompt_text(request: &PromptRequest) -> String {
    request
        .parts
        .iter()
        .filter_map(|p| match p {
            evolve::host::MessagePart::Text { text } => Some(text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
