//! Typed view over a hook's merged JSONL result.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::actions::Action;
use crate::tools::ToolDefinition;

/// The recognized fields of a hook result.
///
/// Hooks are free-form subprocesses, so extraction is lenient: a field of
/// the wrong shape is dropped with a debug log rather than failing the
/// invocation. Unrecognized fields are ignored.
#[derive(Debug, Default)]
pub struct HookOutput {
    pub system: Vec<String>,
    pub user: Option<String>,
    pub prompt: Option<String>,
    pub result: Option<String>,
    pub tools: Vec<ToolDefinition>,
    pub modified: Vec<String>,
    pub notify: Vec<Value>,
    pub actions: Vec<Action>,
    /// Wire name `continue`.
    pub continuation: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl HookOutput {
    /// Build from the merged JSONL object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            system: field(&map, "system").unwrap_or_default(),
            user: field(&map, "user"),
            prompt: field(&map, "prompt"),
            result: field(&map, "result"),
            tools: field(&map, "tools").unwrap_or_default(),
            modified: field(&map, "modified").unwrap_or_default(),
            notify: field(&map, "notify").unwrap_or_default(),
            actions: field(&map, "actions").unwrap_or_default(),
            continuation: field(&map, "continue"),
            message: field(&map, "message"),
            error: field(&map, "error"),
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!("Dropping malformed hook result field {key:?}: {e}");
            None
        }
    }
}
