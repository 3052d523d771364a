//! Named hook dispatch with history injection and the recover cascade.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::HookError;
use crate::hook::ipc;
use crate::hook::output::HookOutput;
use crate::host::MessageRecord;

/// The hooks the plugin knows how to invoke.
///
/// The observational set is encoded here, not inferred: failures of
/// observational hooks are swallowed outright, while any other failing
/// hook gets exactly one `recover` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Discover,
    MutateRequest,
    ObserveMessage,
    Idle,
    Heartbeat,
    Compacting,
    FormatNotification,
    Recover,
    ExecuteTool,
    ToolBefore,
    ToolAfter,
}

impl HookKind {
    /// Wire name of the hook, as passed in argv and the `hook` input field.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Discover => "discover",
            HookKind::MutateRequest => "mutate_request",
            HookKind::ObserveMessage => "observe_message",
            HookKind::Idle => "idle",
            HookKind::Heartbeat => "heartbeat",
            HookKind::Compacting => "compacting",
            HookKind::FormatNotification => "format_notification",
            HookKind::Recover => "recover",
            HookKind::ExecuteTool => "execute_tool",
            HookKind::ToolBefore => "tool_before",
            HookKind::ToolAfter => "tool_after",
        }
    }

    /// Observational hooks witness events; their failures never cascade.
    pub fn is_observational(&self) -> bool {
        matches!(
            self,
            HookKind::ToolBefore
                | HookKind::ToolAfter
                | HookKind::ObserveMessage
                | HookKind::FormatNotification
        )
    }
}

/// Dispatches hooks by name and applies the recover-cascade policy.
#[derive(Clone)]
pub struct HookCaller {
    config: Arc<Config>,
}

impl HookCaller {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Invoke a hook with the given context, injecting cached message
    /// history when the caller has one for the session.
    ///
    /// Never fails: observational hooks degrade to an empty result, and
    /// any other failure triggers a single `recover` invocation whose own
    /// outcome (success or failure) is ignored.
    pub async fn call(
        &self,
        kind: HookKind,
        context: Map<String, Value>,
        history: Option<&[MessageRecord]>,
    ) -> HookOutput {
        match self.invoke_once(kind, context, history).await {
            Ok(merged) => HookOutput::from_map(merged),
            Err(e) => {
                if kind.is_observational() {
                    tracing::debug!(
                        "{} observational hook {} failed: {}",
                        self.config.glyph,
                        kind.as_str(),
                        e
                    );
                    return HookOutput::default();
                }

                tracing::warn!("{} hook {} failed: {}", self.config.glyph, kind.as_str(), e);

                // One recovery attempt; recover never re-enters itself.
                if kind != HookKind::Recover {
                    let mut recover_ctx = Map::new();
                    recover_ctx.insert("error".to_string(), Value::String(e.to_string()));
                    recover_ctx.insert(
                        "failed_hook".to_string(),
                        Value::String(kind.as_str().to_string()),
                    );
                    match self.invoke_once(HookKind::Recover, recover_ctx, None).await {
                        // The recover result is ignored at this call site.
                        Ok(_) => {}
                        Err(re) => {
                            tracing::debug!(
                                "{} recover hook failed: {}",
                                self.config.glyph,
                                re
                            );
                        }
                    }
                }

                HookOutput::default()
            }
        }
    }

    async fn invoke_once(
        &self,
        kind: HookKind,
        context: Map<String, Value>,
        history: Option<&[MessageRecord]>,
    ) -> Result<Map<String, Value>, HookError> {
        let mut input = Map::new();
        input.insert(
            "hook".to_string(),
            Value::String(kind.as_str().to_string()),
        );
        for (key, value) in context {
            input.insert(key, value);
        }
        if let Some(history) = history {
            input.insert("history".to_string(), serde_json::to_value(history)?);
        }

        let started = Instant::now();
        let merged = ipc::invoke(&self.config, kind.as_str(), &Value::Object(input)).await?;
        tracing::debug!(
            "{} hook {} completed in {}ms",
            self.config.glyph,
            kind.as_str(),
            started.elapsed().as_millis()
        );
        Ok(merged)
    }
}
