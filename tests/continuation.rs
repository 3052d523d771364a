//! Integration tests for assistant-turn observation: hook context, idle
//! continuation, and model persistence.

mod common;

use evolve::host::{AssistantTurn, MessagePart, ModelRef};
use evolve::state::RuntimeState;
use serde_json::json;

use common::{counting_preamble, plugin_for, prompt_text, MockHost, TestWorkspace};

fn model(provider: &str, id: &str) -> ModelRef {
    ModelRef {
        provider_id: provider.to_string(),
        model_id: id.to_string(),
    }
}

fn turn(session: &str, parts: Vec<MessagePart>) -> AssistantTurn {
    AssistantTurn {
        session_id: session.to_string(),
        agent: Some("coder".to_string()),
        model: Some(model("anthropic", "claude")),
        parts,
    }
}

#[tokio::test]
async fn observe_message_receives_the_turn_breakdown() {
    let ws = TestWorkspace::new();
    let dump = ws.path().join("observe_ctx.json");
    ws.write_hook(&format!(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           observe_message) cat > \"{}\"; echo '{{}}' ;;\n\
           *) echo '{{}}' ;;\n\
         esac\n",
        dump.display()
    ));
    let plugin = plugin_for(&ws, MockHost::new()).await;

    plugin
        .observe_turn(turn(
            "s1",
            vec![
                MessagePart::Reasoning {
                    text: "think first".to_string(),
                },
                MessagePart::text("part one"),
                MessagePart::ToolCall {
                    name: "grep".to_string(),
                    arguments: json!({"pattern": "x"}),
                },
                MessagePart::text("part two"),
            ],
        ))
        .await;

    let ctx: serde_json::Value =
        serde_json::from_str(&ws.read_file("observe_ctx.json")).expect("ctx");
    assert_eq!(ctx["hook"], "observe_message");
    assert_eq!(ctx["reasoning"], "think first");
    assert_eq!(ctx["answer"], "part one\npart two");
    assert_eq!(ctx["tool_calls"][0]["name"], "grep");
    assert_eq!(ctx["session"]["id"], "s1");
    assert_eq!(ctx["session"]["agent"], "coder");
}

#[tokio::test]
async fn idle_continuation_dispatches_one_synthetic_prompt() {
    let ws = TestWorkspace::new();
    ws.write_hook(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           idle) echo '{\"continue\": \"go on\"}' ;;\n\
           *) echo '{}' ;;\n\
         esac\n",
    );
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;

    plugin
        .observe_turn(turn("s1", vec![MessagePart::text("final answer")]))
        .await;

    let detached = host.detached.lock().expect("lock");
    assert_eq!(detached.len(), 1, "exactly one continuation prompt");
    let request = &detached[0];
    assert_eq!(request.session_id, "s1");
    assert_eq!(prompt_text(request), "go on");
    assert_eq!(request.parts.len(), 1, "single synthetic text part");
    assert!(request.synthetic);
    assert_eq!(request.agent.as_deref(), Some("coder"));
    assert_eq!(request.model, Some(model("anthropic", "claude")));
}

#[tokio::test]
async fn turns_with_tool_calls_are_not_idle() {
    let ws = TestWorkspace::new();
    ws.write_hook(&format!(
        "#!/bin/sh\n{count}\
         case \"$1\" in\n\
           idle) echo '{{\"continue\": \"go on\"}}' ;;\n\
           *) echo '{{}}' ;;\n\
         esac\n",
        count = counting_preamble(ws.path()),
    ));
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;

    plugin
        .observe_turn(turn(
            "s1",
            vec![
                MessagePart::text("working on it"),
                MessagePart::ToolCall {
                    name: "shell".to_string(),
                    arguments: json!({"cmd": "ls"}),
                },
            ],
        ))
        .await;

    assert_eq!(ws.invocations("observe_message"), 1);
    assert_eq!(ws.invocations("idle"), 0);
    assert_eq!(host.detached_count(), 0);
}

#[tokio::test]
async fn empty_idle_result_ends_the_turn() {
    let ws = TestWorkspace::new();
    ws.write_hook("#!/bin/sh\necho '{}'\n");
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;

    plugin
        .observe_turn(turn("s1", vec![MessagePart::text("done")]))
        .await;
    assert_eq!(host.detached_count(), 0);
}

#[tokio::test]
async fn continuation_falls_back_to_the_heartbeat_agent() {
    let ws = TestWorkspace::new();
    ws.write_hook(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           idle) echo '{\"continue\": \"keep going\"}' ;;\n\
           *) echo '{}' ;;\n\
         esac\n",
    );
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;

    plugin
        .observe_turn(AssistantTurn {
            session_id: "s1".to_string(),
            agent: None,
            model: Some(model("anthropic", "claude")),
            parts: vec![MessagePart::text("answer")],
        })
        .await;

    let detached = host.detached.lock().expect("lock");
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].agent.as_deref(), Some("evolve"));
}

#[tokio::test]
async fn observed_model_is_persisted_only_on_change() {
    let ws = TestWorkspace::new();
    let plugin = plugin_for(&ws, MockHost::new()).await;
    let runtime_path = ws.path().join("config/runtime.json");

    plugin
        .observe_turn(turn("s1", vec![MessagePart::text("a")]))
        .await;
    assert_eq!(
        RuntimeState::load(&runtime_path).model,
        Some(model("anthropic", "claude"))
    );

    // Same model again: the document is not rewritten.
    std::fs::remove_file(&runtime_path).expect("remove runtime doc");
    plugin
        .observe_turn(turn("s1", vec![MessagePart::text("b")]))
        .await;
    assert!(!runtime_path.exists(), "unchanged model must cause no write");

    // A different model is persisted again.
    plugin
        .observe_turn(AssistantTurn {
            session_id: "s1".to_string(),
            agent: None,
            model: Some(model("anthropic", "opus")),
            parts: vec![MessagePart::text("c")],
        })
        .await;
    assert_eq!(
        RuntimeState::load(&runtime_path).model,
        Some(model("anthropic", "opus"))
    );
}

#[tokio::test]
async fn persisted_model_survives_reload() {
    let ws = TestWorkspace::new();
    ws.write_hook(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           idle) echo '{\"continue\": \"resume\"}' ;;\n\
           *) echo '{}' ;;\n\
         esac\n",
    );

    {
        let plugin = plugin_for(&ws, MockHost::new()).await;
        plugin
            .observe_turn(turn("s1", vec![MessagePart::text("a")]))
            .await;
    }

    // A fresh plugin instance (process restart) recovers the model and can
    // use it for continuations before any new observation.
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;
    plugin
        .observe_turn(AssistantTurn {
            session_id: "s2".to_string(),
            agent: None,
            model: None,
            parts: vec![MessagePart::text("answer")],
        })
        .await;

    let detached = host.detached.lock().expect("lock");
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].model, Some(model("anthropic", "claude")));
}

#[tokio::test]
async fn observe_side_effects_reach_other_sessions_and_actions() {
    let ws = TestWorkspace::new();
    ws.write_hook(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           observe_message) echo '{\"notify\": [{\"type\": \"seen\"}], \"actions\": [{\"type\": \"create_session\", \"title\": \"spawned\"}]}' ;;\n\
           *) echo '{}' ;;\n\
         esac\n",
    );
    let host = MockHost::new();
    let plugin = plugin_for(&ws, host.clone()).await;

    plugin
        .observe_turn(turn("s1", vec![MessagePart::text("a")]))
        .await;

    let sessions = host.sessions.lock().expect("lock");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title, "spawned");
}

#[tokio::test]
async fn tool_passthrough_hooks_receive_call_context() {
    let ws = TestWorkspace::new();
    let before = ws.path().join("before_ctx.json");
    let after = ws.path().join("after_ctx.json");
    ws.write_hook(&format!(
        "#!/bin/sh\n\
         case \"$1\" in\n\
           tool_before) cat > \"{}\"; echo '{{}}' ;;\n\
           tool_after) cat > \"{}\"; echo '{{}}' ;;\n\
           *) echo '{{}}' ;;\n\
         esac\n",
        before.display(),
        after.display(),
    ));
    let plugin = plugin_for(&ws, MockHost::new()).await;

    plugin
        .tool_before("s1", "shell", "call-9", &json!({"cmd": "ls"}))
        .await;
    plugin
        .tool_after("s1", "shell", "call-9", "List files", "a.txt\nb.txt")
        .await;

    let ctx: serde_json::Value =
        serde_json::from_str(&ws.read_file("before_ctx.json")).expect("before ctx");
    assert_eq!(ctx["hook"], "tool_before");
    assert_eq!(ctx["session"]["id"], "s1");
    assert_eq!(ctx["tool"], "shell");
    assert_eq!(ctx["callID"], "call-9");
    assert_eq!(ctx["args"]["cmd"], "ls");

    let ctx: serde_json::Value =
        serde_json::from_str(&ws.read_file("after_ctx.json")).expect("after ctx");
    assert_eq!(ctx["hook"], "tool_after");
    assert_eq!(ctx["callID"], "call-9");
    assert_eq!(ctx["title"], "List files");
    assert_eq!(ctx["output"], "a.txt\nb.txt");
}

#[tokio::test]
async fn tool_passthrough_failures_never_recover() {
    let ws = TestWorkspace::new();
    ws.write_hook(&format!(
        "#!/bin/sh\n{count}\
         case \"$1\" in\n\
           tool_before|tool_after) exit 1 ;;\n\
           *) echo '{{}}' ;;\n\
         esac\n",
        count = counting_preamble(ws.path()),
    ));
    let plugin = plugin_for(&ws, MockHost::new()).await;

    plugin.tool_before("s1", "shell", "c1", &json!({})).await;
    plugin.tool_after("s1", "shell", "c1", "t", "o").await;

    assert_eq!(ws.invocations("tool_before"), 1);
    assert_eq!(ws.invocations("tool_after"), 1);
    assert_eq!(ws.invocations("recover"), 0);
}
