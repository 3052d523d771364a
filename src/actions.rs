//! Hook-returned actions and their execution against the host SDK.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::host::{Host, MessagePart, ModelRef, PromptRequest};

fn default_synthetic() -> bool {
    true
}

/// A side-effect request returned by a hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Send a message into an existing session.
    Send {
        session_id: String,
        message: String,
        #[serde(default = "default_synthetic")]
        synthetic: bool,
    },
    /// Create a new session with the given title.
    CreateSession { title: String },
}

/// Execute a batch of actions against the host.
///
/// Failures are logged per action and do not stop the rest of the batch;
/// the hook result they came from has already been applied. Returns the
/// ids of any sessions created, so the caller can track them.
pub async fn execute(
    host: &Arc<dyn Host>,
    actions: &[Action],
    model: Option<&ModelRef>,
    glyph: &str,
) -> Vec<String> {
    let mut created = Vec::new();
    for action in actions {
        match action {
            Action::Send {
                session_id,
                message,
                synthetic,
            } => {
                let request = PromptRequest {
                    session_id: session_id.clone(),
                    parts: vec![MessagePart::text(message.clone())],
                    agent: None,
                    model: model.cloned(),
                    synthetic: *synthetic,
                };
                if let Err(e) = host.prompt_detached(request).await {
                    tracing::warn!("{} action send to {} failed: {}", glyph, session_id, e);
                }
            }
            Action::CreateSession { title } => match host.create_session(title).await {
                Ok(session) => {
                    tracing::debug!("{} action created session {} ({})", glyph, session.id, title);
                    created.push(session.id);
                }
                Err(e) => {
                    tracing::warn!("{} action create_session {:?} failed: {}", glyph, title, e);
                }
            },
        }
    }
    created
}
