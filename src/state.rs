//! In-memory plugin state and the persisted runtime document.
//!
//! Everything here lives for the plugin's lifetime and is lost on reload,
//! except `RuntimeState`, which caches the last-observed model on disk so
//! heartbeats can resume without waiting for a fresh user turn.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::{MessagePart, MessageRecord, ModelRef};

/// Persisted runtime document: `{ "model": { "providerID", "modelID" } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(default)]
    pub model: Option<ModelRef>,
}

impl RuntimeState {
    /// Load from disk, degrading to defaults when absent or unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Write to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, json)
    }
}

/// Mutable state shared by all host callbacks and the heartbeat task.
#[derive(Debug, Default)]
pub struct PluginState {
    /// Per-session frozen system prompt. Write-once per session.
    pub frozen_prompts: HashMap<String, Vec<String>>,
    /// Per-session notifications awaiting the session's next agent-marked cycle.
    pub pending: HashMap<String, Vec<Value>>,
    /// Captured message histories: pushed by messages-transform, popped by
    /// the next agent-marked system-transform.
    pub messages_fifo: VecDeque<Vec<MessageRecord>>,
    /// Formatted part-lists awaiting injection: pushed by system-transform,
    /// popped by the next messages-transform.
    pub injection_fifo: VecDeque<Vec<Vec<MessagePart>>>,
    /// Most recently captured history per session, injected into hook calls.
    pub session_history: HashMap<String, Vec<MessageRecord>>,
    /// Agent id last seen per session.
    pub session_agents: HashMap<String, String>,
    /// Every session id the plugin has seen.
    pub known_sessions: HashSet<String>,
    /// Most recently observed provider/model pair.
    pub last_model: Option<ModelRef>,
    /// Cached id of the background heartbeat session.
    pub heartbeat_session: Option<String>,
    /// Overlap guard for the heartbeat scheduler.
    pub heartbeat_busy: bool,
    /// Workspace has hook-reported modifications awaiting the next commit.
    pub dirty: bool,
}

impl PluginState {
    pub fn new(model: Option<ModelRef>) -> Self {
        Self {
            last_model: model,
            ..Self::default()
        }
    }

    /// Record that a session exists.
    pub fn touch_session(&mut self, session_id: &str) {
        if !self.known_sessions.contains(session_id) {
            self.known_sessions.insert(session_id.to_string());
        }
    }

    /// Install a frozen prompt for a session unless one is already set,
    /// and return the prompt that is now in force.
    pub fn freeze_prompt(&mut self, session_id: &str, prompt: Vec<String>) -> Vec<String> {
        self.frozen_prompts
            .entry(session_id.to_string())
            .or_insert(prompt)
            .clone()
    }

    /// Fan a batch of notifications out to every known session except the
    /// one that produced them.
    pub fn enqueue_notifications(&mut self, source_session: &str, notifications: &[Value]) {
        if notifications.is_empty() {
            return;
        }
        for session in &self.known_sessions {
            if session == source_session {
                continue;
            }
            self.pending
                .entry(session.clone())
                .or_default()
                .extend(notifications.iter().cloned());
        }
    }

    /// Take every pending notification for a session.
    pub fn drain_notifications(&mut self, session_id: &str) -> Vec<Value> {
        self.pending.remove(session_id).unwrap_or_default()
    }

    /// Record the observed model, persisting the runtime document only
    /// when the value actually changed. Returns whether a write happened.
    pub fn record_model(&mut self, model: ModelRef, runtime_path: &Path) -> bool {
        if self.last_model.as_ref() == Some(&model) {
            return false;
        }
        self.last_model = Some(model.clone());
        let runtime = RuntimeState { model: Some(model) };
        if let Err(e) = runtime.save(runtime_path) {
            tracing::warn!(
                "Failed to persist runtime state to {}: {}",
                runtime_path.display(),
                e
            );
        }
        true
    }
}
