//! Heartbeat scheduler.
//!
//! A single repeating timer drives the background session. Ticks are
//! coalesced rather than queued: while one tick is still running, later
//! ticks are dropped with a log line, so a slow hook or a long blocking
//! prompt can never pile work up behind itself.

use std::sync::Arc;

use serde_json::{json, Map};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::hook::HookKind;
use crate::host::{MessagePart, PromptRequest};
use crate::plugin::Plugin;

/// Spawn the heartbeat timer task for the plugin's lifetime.
pub fn spawn_heartbeat(plugin: Arc<Plugin>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(plugin.config().heartbeat);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;

            {
                let mut state = plugin.state.lock().await;
                if state.heartbeat_busy {
                    tracing::info!(
                        "{} heartbeat tick skipped (previous tick still running)",
                        plugin.config().glyph
                    );
                    continue;
                }
                state.heartbeat_busy = true;
            }

            // The tick runs off-timer so the interval keeps firing (and
            // skipping) while a slow tick is still in flight.
            let plugin = Arc::clone(&plugin);
            tokio::spawn(async move {
                if let Err(e) = tick(&plugin).await {
                    tracing::warn!("{} heartbeat tick failed: {}", plugin.config().glyph, e);
                }
                plugin.state.lock().await.heartbeat_busy = false;
            });
        }
    })
}

/// One heartbeat: resolve the background session, gate on a known model,
/// invoke the hook, dispatch its prompt, and apply side-effects.
async fn tick(plugin: &Plugin) -> Result<()> {
    let session_id = resolve_session(plugin).await?;

    let (model, history) = {
        let state = plugin.state.lock().await;
        (
            state.last_model.clone(),
            state.session_history.get(&session_id).cloned(),
        )
    };
    let Some(model) = model else {
        // No chat turn observed yet, so there is no provider/model to use.
        tracing::debug!(
            "{} heartbeat waiting for a first observed model",
            plugin.config().glyph
        );
        return Ok(());
    };

    let mut ctx = Map::new();
    ctx.insert("sessions".to_string(), json!([]));
    let out = plugin
        .caller
        .call(HookKind::Heartbeat, ctx, history.as_deref())
        .await;

    if let Some(user) = out.user.as_deref().filter(|u| !u.trim().is_empty()) {
        let request = PromptRequest {
            session_id: session_id.clone(),
            parts: vec![MessagePart::text(format!("[heartbeat] {user}"))],
            agent: Some(plugin.config().heartbeat_agent.clone()),
            model: Some(model),
            synthetic: true,
        };
        plugin.host.prompt(request).await?;
    }

    plugin.apply_side_effects(&session_id, &out).await;
    Ok(())
}

/// Find or create the heartbeat session by title; the id is cached for
/// the process lifetime.
async fn resolve_session(plugin: &Plugin) -> Result<String> {
    if let Some(id) = plugin.state.lock().await.heartbeat_session.clone() {
        return Ok(id);
    }

    let title = &plugin.config().heartbeat_title;
    let sessions = plugin.host.list_sessions().await?;
    let session = match sessions.into_iter().find(|s| &s.title == title) {
        Some(session) => session,
        None => plugin.host.create_session(title).await?,
    };

    let mut state = plugin.state.lock().await;
    state.heartbeat_session = Some(session.id.clone());
    state.touch_session(&session.id);
    Ok(session.id)
}
