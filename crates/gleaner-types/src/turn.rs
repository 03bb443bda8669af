//! Conversational input types handed to the evaluator by the host runtime.
//!
//! A [`Turn`] is one inbound message; a [`SessionState`] is the host's
//! read-only snapshot of the surrounding session. Neither is persisted here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::MessageRole;

/// One inbound conversational message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Generated when the host does not supply one.
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    /// Free-form message text. Missing text deserializes as empty.
    #[serde(default)]
    pub text: String,
    /// Room (session) the message belongs to.
    pub room_id: Uuid,
    /// Entity that sent the message.
    pub entity_id: Uuid,
}

impl Turn {
    /// Create a turn with a fresh time-sortable ID.
    pub fn new(text: impl Into<String>, room_id: Uuid, entity_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            room_id,
            entity_id,
        }
    }
}

/// A message from the host's recent-message window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub text: String,
}

/// Result of an action previously executed in the same session.
///
/// `data` is whatever the action attached; the evaluator only inspects it
/// for a task-correlation key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Read-only snapshot of session state supplied by the host per turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Recent messages, most-recent-last.
    #[serde(default)]
    pub recent_messages: Vec<RecentMessage>,
    /// Prior action results from the same session.
    #[serde(default)]
    pub action_results: Vec<ActionResult>,
}
