//! Host callback glue.
//!
//! Binds the host's lifecycle callbacks to the hook engine while holding
//! the ordering contract together: within one prompt cycle the host fires
//! `transform_messages` before `transform_system`, and the two global
//! FIFOs (captured histories, pending injections) are correlated across
//! that pair. Nothing in here ever propagates an error back into the
//! host; the worst case is a debug log line and a no-op.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::actions;
use crate::config::Config;
use crate::hook::{HookCaller, HookKind, HookOutput};
use crate::host::{
    AssistantTurn, Host, MessagePart, MessageRecord, PromptRequest,
};
use crate::snapshot::Snapshotter;
use crate::state::{PluginState, RuntimeState};
use crate::tools::{self, registry, ToolSchema};

/// Sentinel substring in the inbound system array that signals the plugin
/// to take ownership of the cycle.
pub const AGENT_MARKER: &str = "<~ PERSONA AGENT MARKER ~>";

/// The plugin: one instance per host process, shared by every callback
/// and the heartbeat task.
pub struct Plugin {
    pub(crate) config: Arc<Config>,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) caller: HookCaller,
    pub(crate) snapshot: Snapshotter,
    pub(crate) state: Mutex<PluginState>,
}

impl Plugin {
    /// Create the plugin: initialize the workspace repository and recover
    /// the last-known model from the persisted runtime document.
    pub async fn new(config: Config, host: Arc<dyn Host>) -> Arc<Self> {
        let config = Arc::new(config);
        let snapshot = Snapshotter::new(&config);
        snapshot.init().await;
        let runtime = RuntimeState::load(&config.runtime_state_path());
        Arc::new(Self {
            caller: HookCaller::new(Arc::clone(&config)),
            snapshot,
            state: Mutex::new(PluginState::new(runtime.model)),
            host,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `messages-transform` callback: capture the cycle's message history
    /// and inject any formatted notification staged by an earlier cycle.
    pub async fn transform_messages(&self, messages: &mut Vec<MessageRecord>) {
        let mut state = self.state.lock().await;
        state.messages_fifo.push_back(messages.clone());
        if let Some(part_lists) = state.injection_fifo.pop_front() {
            for parts in part_lists {
                messages.push(MessageRecord {
                    role: "user".to_string(),
                    agent: None,
                    parts,
                });
            }
        }
    }

    /// `system-transform` callback: freeze (or replay) the session's
    /// system prompt and stage pending notifications for injection.
    pub async fn transform_system(&self, session_id: &str, system: &mut Vec<String>) {
        if !system.iter().any(|s| s.contains(AGENT_MARKER)) {
            // This cycle belongs to another plugin/agent.
            return;
        }

        let (frozen, history) = {
            let mut state = self.state.lock().await;
            state.touch_session(session_id);
            if let Some(captured) = state.messages_fifo.pop_front() {
                state
                    .session_history
                    .insert(session_id.to_string(), captured);
            }
            (
                state.frozen_prompts.get(session_id).cloned(),
                state.session_history.get(session_id).cloned(),
            )
        };

        match frozen {
            // Byte-identical replay keeps the upstream LLM cache warm.
            Some(prompt) => *system = prompt,
            None => {
                let mut ctx = Map::new();
                ctx.insert("session".to_string(), json!({ "id": session_id }));
                let out = self
                    .caller
                    .call(HookKind::MutateRequest, ctx, history.as_deref())
                    .await;
                if !out.system.is_empty() {
                    // First writer wins; a racing cycle reuses the installed prompt.
                    let prompt = self
                        .state
                        .lock()
                        .await
                        .freeze_prompt(session_id, out.system);
                    *system = prompt;
                }
            }
        }

        let drained = self.state.lock().await.drain_notifications(session_id);
        if drained.is_empty() {
            return;
        }
        let history = self.history_for(session_id).await;
        let mut ctx = Map::new();
        ctx.insert("notifications".to_string(), Value::Array(drained));
        let out = self
            .caller
            .call(HookKind::FormatNotification, ctx, history.as_deref())
            .await;
        if let Some(message) = out.message.filter(|m| !m.is_empty()) {
            let wrapped = format!("<internal-notification>\n{message}\n</internal-notification>");
            self.state
                .lock()
                .await
                .injection_fifo
                .push_back(vec![vec![MessagePart::text(wrapped)]]);
        }
    }

    /// Chat-message callback: observe an assistant turn, apply its hook
    /// side-effects, and drive idle continuation when the turn made no
    /// tool calls.
    pub async fn observe_turn(&self, turn: AssistantTurn) {
        let session_id = turn.session_id.clone();

        let history = {
            let mut state = self.state.lock().await;
            state.touch_session(&session_id);
            if let Some(agent) = &turn.agent {
                state
                    .session_agents
                    .insert(session_id.clone(), agent.clone());
            }
            if let Some(model) = &turn.model {
                state.record_model(model.clone(), &self.config.runtime_state_path());
            }
            state.session_history.get(&session_id).cloned()
        };

        let answer = joined_text(&turn.parts);
        let reasoning = joined_reasoning(&turn.parts);
        let tool_calls = tool_call_values(&turn.parts);
        let had_tool_calls = !tool_calls.is_empty();

        let mut ctx = Map::new();
        ctx.insert("reasoning".to_string(), Value::String(reasoning));
        ctx.insert("tool_calls".to_string(), Value::Array(tool_calls));
        ctx.insert("answer".to_string(), Value::String(answer.clone()));
        ctx.insert(
            "session".to_string(),
            json!({ "id": session_id, "agent": &turn.agent }),
        );
        let out = self
            .caller
            .call(HookKind::ObserveMessage, ctx, history.as_deref())
            .await;
        self.apply_side_effects(&session_id, &out).await;

        if had_tool_calls {
            return;
        }

        // The turn ended with a final answer; give the hook one chance to
        // resurrect it.
        let mut ctx = Map::new();
        ctx.insert("answer".to_string(), Value::String(answer));
        ctx.insert(
            "session".to_string(),
            json!({ "id": session_id, "agent": &turn.agent }),
        );
        let out = self
            .caller
            .call(HookKind::Idle, ctx, history.as_deref())
            .await;
        let Some(text) = out.continuation.filter(|c| !c.is_empty()) else {
            return;
        };

        let (agent, model) = {
            let state = self.state.lock().await;
            (
                state
                    .session_agents
                    .get(&session_id)
                    .cloned()
                    .unwrap_or_else(|| self.config.heartbeat_agent.clone()),
                state.last_model.clone(),
            )
        };
        let request = PromptRequest {
            session_id: session_id.clone(),
            parts: vec![MessagePart::text(text)],
            agent: Some(agent),
            model,
            synthetic: true,
        };
        if let Err(e) = self.host.prompt_detached(request).await {
            tracing::warn!(
                "{} idle continuation for {} failed: {}",
                self.config.glyph,
                session_id,
                e
            );
        }
    }

    /// Tool-before callback (observational).
    pub async fn tool_before(&self, session_id: &str, tool: &str, call_id: &str, args: &Value) {
        let history = self.history_for(session_id).await;
        let mut ctx = Map::new();
        ctx.insert("session".to_string(), json!({ "id": session_id }));
        ctx.insert("tool".to_string(), Value::String(tool.to_string()));
        ctx.insert("callID".to_string(), Value::String(call_id.to_string()));
        ctx.insert("args".to_string(), args.clone());
        let _ = self
            .caller
            .call(HookKind::ToolBefore, ctx, history.as_deref())
            .await;
    }

    /// Tool-after callback (observational).
    pub async fn tool_after(
        &self,
        session_id: &str,
        tool: &str,
        call_id: &str,
        title: &str,
        output: &str,
    ) {
        let history = self.history_for(session_id).await;
        let mut ctx = Map::new();
        ctx.insert("session".to_string(), json!({ "id": session_id }));
        ctx.insert("tool".to_string(), Value::String(tool.to_string()));
        ctx.insert("callID".to_string(), Value::String(call_id.to_string()));
        ctx.insert("title".to_string(), Value::String(title.to_string()));
        ctx.insert("output".to_string(), Value::String(output.to_string()));
        let _ = self
            .caller
            .call(HookKind::ToolAfter, ctx, history.as_deref())
            .await;
    }

    /// Session-compacting callback: the hook may supply a compaction prompt.
    pub async fn compacting(&self, session_id: &str) -> Option<String> {
        let history = self.history_for(session_id).await;
        let mut ctx = Map::new();
        ctx.insert("session".to_string(), json!({ "id": session_id }));
        let out = self
            .caller
            .call(HookKind::Compacting, ctx, history.as_deref())
            .await;
        out.prompt.filter(|p| !p.is_empty())
    }

    /// Tool descriptors to register with the host: whatever `discover`
    /// declares, plus the built-ins (present even when the hook is broken).
    pub async fn tool_schemas(&self) -> Vec<ToolSchema> {
        let out = self.caller.call(HookKind::Discover, Map::new(), None).await;
        registry::build(self.config.hook_stem(), &out.tools)
    }

    /// Execute a registered tool on behalf of a session and return its
    /// textual result. Never fails; failures are surfaced as text.
    pub async fn run_tool(&self, name: &str, args: &Value, session_id: &str) -> String {
        self.state.lock().await.touch_session(session_id);

        let prefix = format!("{}_", self.config.hook_stem());
        let bare = name.strip_prefix(&prefix).unwrap_or(name);

        if registry::is_builtin(bare) {
            return tools::builtin::run(self, bare, args, session_id).await;
        }

        let history = self.history_for(session_id).await;
        let mut ctx = Map::new();
        ctx.insert("tool".to_string(), Value::String(bare.to_string()));
        ctx.insert("args".to_string(), args.clone());
        ctx.insert("session".to_string(), json!({ "id": session_id }));
        let out = self
            .caller
            .call(HookKind::ExecuteTool, ctx, history.as_deref())
            .await;
        self.apply_side_effects(session_id, &out).await;
        self.commit_workspace(&format!("update {bare}")).await;

        if let Some(error) = out.error {
            return format!("error: {error}");
        }
        out.result.unwrap_or_else(|| "done".to_string())
    }

    /// Apply a hook result's side-effects: `modified` marks the workspace
    /// dirty, `notify` fans out to every live session but the source, and
    /// `actions` go to the host (each failure isolated).
    pub(crate) async fn apply_side_effects(&self, source_session: &str, out: &HookOutput) {
        let model = {
            let mut state = self.state.lock().await;
            if !out.modified.is_empty() {
                state.dirty = true;
                tracing::debug!(
                    "{} workspace dirty: {:?}",
                    self.config.glyph,
                    out.modified
                );
            }
            state.enqueue_notifications(source_session, &out.notify);
            state.last_model.clone()
        };

        if !out.actions.is_empty() {
            let created =
                actions::execute(&self.host, &out.actions, model.as_ref(), &self.config.glyph)
                    .await;
            if !created.is_empty() {
                let mut state = self.state.lock().await;
                for id in created {
                    state.touch_session(&id);
                }
            }
        }
    }

    /// Commit the workspace, clearing the dirty flag on success. Commit
    /// failures are logged and never surface to the host.
    pub(crate) async fn commit_workspace(&self, message: &str) {
        match self.snapshot.commit(message).await {
            Ok(()) => self.state.lock().await.dirty = false,
            Err(e) => tracing::warn!("{} commit failed: {}", self.config.glyph, e),
        }
    }

    /// Queue a plugin-originated notification for every session except the
    /// source.
    pub(crate) async fn queue_notification(&self, source_session: &str, notification: Value) {
        self.state
            .lock()
            .await
            .enqueue_notifications(source_session, &[notification]);
    }

    pub(crate) async fn history_for(&self, session_id: &str) -> Option<Vec<MessageRecord>> {
        self.state
            .lock()
            .await
            .session_history
            .get(session_id)
            .cloned()
    }
}

fn joined_text(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn joined_reasoning(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::Reasoning { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool_call_values(parts: &[MessagePart]) -> Vec<Value> {
    parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::ToolCall { name, arguments } => {
                Some(json!({ "name": name, "arguments": arguments }))
            }
            _ => None,
        })
        .collect()
}
