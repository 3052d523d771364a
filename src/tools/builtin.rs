//! Built-in tools for prompt and hook read/write/patch/validate.
//!
//! These exist outside the hook so the agent can always repair itself: if
//! an edit leaves the hook unable to execute its own `discover`, the
//! built-in path still reads, patches, validates and reinstalls it. Every
//! failure is surfaced as text; nothing here returns an error to the host.

use serde_json::{json, Value};

use crate::plugin::Plugin;
use crate::sandbox;
use crate::util::replace_once;

/// Run a built-in tool by its bare (unprefixed) name.
pub async fn run(plugin: &Plugin, bare_name: &str, args: &Value, session_id: &str) -> String {
    match bare_name {
        "prompt_list" => prompt_list(plugin),
        "prompt_read" => prompt_read(plugin, args),
        "prompt_write" => prompt_write(plugin, args, session_id).await,
        "prompt_patch" => prompt_patch(plugin, args).await,
        "hook_validate" => hook_validate(plugin, args).await,
        "hook_read" => hook_read(plugin),
        "hook_write" => hook_write(plugin, args).await,
        "hook_patch" => hook_patch(plugin, args).await,
        other => format!("unknown tool: {other}"),
    }
}

fn prompt_list(plugin: &Plugin) -> String {
    let dir = plugin.config().prompts_dir();
    let mut names: Vec<String> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".md"))
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    if names.is_empty() {
        "no prompts".to_string()
    } else {
        names.join("\n")
    }
}

fn prompt_read(plugin: &Plugin, args: &Value) -> String {
    let name = match require_str(args, "name") {
        Ok(name) => name,
        Err(e) => return e,
    };
    match std::fs::read_to_string(plugin.config().prompts_dir().join(name)) {
        Ok(content) => content,
        Err(_) => format!("not found: {name}"),
    }
}

async fn prompt_write(plugin: &Plugin, args: &Value, session_id: &str) -> String {
    let (name, content) = match (require_str(args, "name"), require_str(args, "content")) {
        (Ok(name), Ok(content)) => (name, content),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let dir = plugin.config().prompts_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        return format!("failed to write {name}: {e}");
    }
    if let Err(e) = std::fs::write(dir.join(name), content) {
        return format!("failed to write {name}: {e}");
    }
    plugin
        .queue_notification(session_id, json!({ "type": "trait_changed", "files": [name] }))
        .await;
    plugin.commit_workspace(&format!("update {name}")).await;
    format!("wrote {name}")
}

async fn prompt_patch(plugin: &Plugin, args: &Value) -> String {
    let (name, old, new) = match (
        require_str(args, "name"),
        require_str(args, "old_string"),
        require_str(args, "new_string"),
    ) {
        (Ok(name), Ok(old), Ok(new)) => (name, old, new),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };
    let path = plugin.config().prompts_dir().join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return format!("not found: {name}"),
    };
    let patched = match replace_once(&content, old, new) {
        Ok(patched) => patched,
        Err(e) => return e,
    };
    if let Err(e) = std::fs::write(&path, patched) {
        return format!("failed to write {name}: {e}");
    }
    plugin.commit_workspace(&format!("update {name}")).await;
    format!("patched {name}")
}

async fn hook_validate(plugin: &Plugin, args: &Value) -> String {
    let content = match require_str(args, "content") {
        Ok(content) => content,
        Err(e) => return e,
    };
    match sandbox::validate(plugin.config(), content).await {
        Ok(validation) if validation.ok => format!("ok: {}", validation.output),
        Ok(validation) => format!("validation failed: {}", validation.output),
        Err(e) => format!("validation failed: {e}"),
    }
}

fn hook_read(plugin: &Plugin) -> String {
    match std::fs::read_to_string(plugin.config().hook_path()) {
        Ok(content) => content,
        Err(_) => format!("not found: {}", plugin.config().hook),
    }
}

async fn hook_write(plugin: &Plugin, args: &Value) -> String {
    let content = match require_str(args, "content") {
        Ok(content) => content,
        Err(e) => return e,
    };
    install_validated(plugin, content).await
}

async fn hook_patch(plugin: &Plugin, args: &Value) -> String {
    let (old, new) = match (require_str(args, "old_string"), require_str(args, "new_string")) {
        (Ok(old), Ok(new)) => (old, new),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let current = match std::fs::read_to_string(plugin.config().hook_path()) {
        Ok(current) => current,
        Err(_) => return format!("not found: {}", plugin.config().hook),
    };
    let patched = match replace_once(&current, old, new) {
        Ok(patched) => patched,
        Err(e) => return e,
    };
    install_validated(plugin, &patched).await
}

/// Gate for every self-modification: the candidate must pass sandbox
/// validation before it replaces the live hook.
async fn install_validated(plugin: &Plugin, candidate: &str) -> String {
    match sandbox::validate(plugin.config(), candidate).await {
        Ok(validation) if validation.ok => {}
        Ok(validation) => return format!("validation failed: {}", validation.output),
        Err(e) => return format!("validation failed: {e}"),
    }

    let hook = plugin.config().hook.clone();
    let path = plugin.config().hook_path();
    if let Err(e) = std::fs::create_dir_all(plugin.config().hooks_dir()) {
        return format!("failed to install {hook}: {e}");
    }
    if let Err(e) = std::fs::write(&path, candidate) {
        return format!("failed to install {hook}: {e}");
    }
    if let Err(e) = sandbox::set_executable(&path) {
        return format!("failed to install {hook}: {e}");
    }
    plugin.commit_workspace(&format!("update {hook}")).await;
    format!("installed {hook}")
}

fn require_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing '{name}' parameter"))
}
