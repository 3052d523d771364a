//! Host SDK surface consumed by the plugin.
//!
//! The chat host (session CRUD, LLM streaming, tool registration) is an
//! external collaborator. Everything the plugin needs from it fits behind
//! the [`Host`] trait: list/create sessions and two prompt flavors, one
//! blocking until the turn completes and one fire-and-forget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// A chat session as the host reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Provider/model pair identifying the LLM behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(rename = "providerID")]
    pub provider_id: String,
    #[serde(rename = "modelID")]
    pub model_id: String,
}

/// One part of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolCall {
        name: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
}

impl MessagePart {
    /// Shorthand for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }
}

/// Compact record of one message, as captured for hook history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// An assistant turn as observed through the host's chat-message callback.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub session_id: String,
    pub agent: Option<String>,
    pub model: Option<ModelRef>,
    pub parts: Vec<MessagePart>,
}

/// A prompt dispatched back into the host.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub session_id: String,
    pub parts: Vec<MessagePart>,
    pub agent: Option<String>,
    pub model: Option<ModelRef>,
    /// Synthetic prompts are plugin-injected and not attributed to the user.
    pub synthetic: bool,
}

/// The host SDK calls the plugin is allowed to make.
#[async_trait]
pub trait Host: Send + Sync {
    /// Enumerate the host's sessions.
    async fn list_sessions(&self) -> Result<Vec<SessionInfo>, HostError>;

    /// Create a new session with the given title.
    async fn create_session(&self, title: &str) -> Result<SessionInfo, HostError>;

    /// Send a prompt and wait for the resulting turn to complete.
    async fn prompt(&self, request: PromptRequest) -> Result<(), HostError>;

    /// Send a prompt without waiting for the turn (fire-and-forget).
    async fn prompt_detached(&self, request: PromptRequest) -> Result<(), HostError>;
}
