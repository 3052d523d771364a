//! Host-facing tool descriptors.
//!
//! The registered tool set is the union of whatever the hook declares via
//! `discover` and a fixed set of built-ins. Every name is prefixed with
//! the hook's file stem, so swapping `evolve.py` for `persona.py` renames
//! the whole surface uniformly. Built-ins win name collisions: they are
//! the escape hatch that must survive a broken hook.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool as the hook declares it: parameter name → description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// A tool as registered with the host, parameters as JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Bare names of the built-in tools (without the stem prefix).
pub const BUILTIN_NAMES: &[&str] = &[
    "prompt_list",
    "prompt_read",
    "prompt_write",
    "prompt_patch",
    "hook_validate",
    "hook_read",
    "hook_write",
    "hook_patch",
];

/// Whether a bare tool name is one of the built-ins.
pub fn is_builtin(bare_name: &str) -> bool {
    BUILTIN_NAMES.contains(&bare_name)
}

/// Build the full registry for a hook stem: declared tools plus built-ins.
pub fn build(stem: &str, hook_tools: &[ToolDefinition]) -> Vec<ToolSchema> {
    let builtins = builtin_schemas(stem);
    let mut registry: Vec<ToolSchema> = hook_tools
        .iter()
        .map(|def| hook_tool_schema(stem, def))
        .filter(|schema| !builtins.iter().any(|b| b.name == schema.name))
        .collect();
    registry.extend(builtins);
    registry
}

/// Descriptor for one hook-declared tool.
pub fn hook_tool_schema(stem: &str, def: &ToolDefinition) -> ToolSchema {
    ToolSchema {
        name: format!("{stem}_{}", def.name),
        description: def.description.clone(),
        parameters: parameters_schema(
            def.parameters
                .iter()
                .map(|(name, desc)| (name.as_str(), desc.as_str())),
        ),
    }
}

/// Descriptors for the built-in tools.
///
/// These are registered even when the hook cannot execute its own
/// `discover`, so the agent can always repair itself through this path.
pub fn builtin_schemas(stem: &str) -> Vec<ToolSchema> {
    let name = "prompt filename (e.g. chat.md)";
    let old = "exact text to replace; must occur exactly once";
    let new = "replacement text";
    vec![
        builtin(stem, "prompt_list", "List prompt files under prompts/", &[]),
        builtin(stem, "prompt_read", "Read a prompt file", &[("name", name)]),
        builtin(
            stem,
            "prompt_write",
            "Replace a prompt file's content",
            &[("name", name), ("content", "full content for the file")],
        ),
        builtin(
            stem,
            "prompt_patch",
            "Apply a single find/replace to a prompt file",
            &[("name", name), ("old_string", old), ("new_string", new)],
        ),
        builtin(
            stem,
            "hook_validate",
            "Run the sandbox test suite against a candidate hook script",
            &[("content", "candidate hook script content")],
        ),
        builtin(stem, "hook_read", "Read the current hook script", &[]),
        builtin(
            stem,
            "hook_write",
            "Validate a candidate hook script and install it",
            &[("content", "full hook script content")],
        ),
        builtin(
            stem,
            "hook_patch",
            "Apply a single find/replace to the hook script, validating before install",
            &[("old_string", old), ("new_string", new)],
        ),
    ]
}

fn builtin(stem: &str, name: &str, description: &str, params: &[(&str, &str)]) -> ToolSchema {
    ToolSchema {
        name: format!("{stem}_{name}"),
        description: description.to_string(),
        parameters: parameters_schema(params.iter().copied()),
    }
}

/// JSON Schema for a parameter map. The hook protocol only carries a
/// description per parameter, so every parameter is a required string.
fn parameters_schema<'a>(params: impl Iterator<Item = (&'a str, &'a str)>) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for (name, description) in params {
        properties.insert(
            name.to_string(),
            json!({ "type": "string", "description": description }),
        );
        required.push(Value::String(name.to_string()));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
