//! Frame-local forwarding state and conversation state persistence.
mod conversation_ids;
mod memory;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillgate_core::{DeliveryMode, TurnContext};
use time::OffsetDateTime;

pub use conversation_ids::MemorySkillConversationIdFactory;
pub use memory::MemoryConversationState;

/// Shared conversation state handle used across dialogs.
pub type SharedConversationState = Arc<dyn ConversationState>;

/// State owned by one active skill dialog frame.
///
/// Both values are fixed when the frame begins; there are no setters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivery_mode: Option<DeliveryMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sso_connection_name: Option<String>,
}

impl ForwardingSession {
    pub fn new(delivery_mode: Option<DeliveryMode>, sso_connection_name: Option<String>) -> Self {
        Self {
            delivery_mode,
            sso_connection_name,
        }
    }

    /// Delivery mode of the activity that started the session, resent on every turn.
    pub fn delivery_mode(&self) -> Option<DeliveryMode> {
        self.delivery_mode
    }

    pub fn sso_connection_name(&self) -> Option<&str> {
        self.sso_connection_name.as_deref()
    }
}

/// One frame on the dialog stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogInstance {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding: Option<ForwardingSession>,
}

impl DialogInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            forwarding: None,
        }
    }
}

/// Dialog stack persisted per conversation; the last element is the active frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogState {
    #[serde(default)]
    pub stack: Vec<DialogInstance>,
}

impl DialogState {
    pub fn active(&self) -> Option<&DialogInstance> {
        self.stack.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut DialogInstance> {
        self.stack.last_mut()
    }

    pub fn push(&mut self, instance: DialogInstance) {
        self.stack.push(instance);
    }

    pub fn pop(&mut self) -> Option<DialogInstance> {
        self.stack.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Persisted snapshot of a conversation's dialog state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: DialogState,
    pub updated_unix_ms: i128,
}

impl StateRecord {
    pub fn new(state: DialogState) -> Self {
        Self {
            state,
            updated_unix_ms: OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000,
        }
    }
}

/// Storage key for the conversation a turn belongs to.
pub fn state_key(turn: &TurnContext) -> Result<String> {
    let activity = turn.activity();
    let channel = activity
        .channel_id
        .as_deref()
        .filter(|channel| !channel.is_empty())
        .ok_or_else(|| anyhow!("activity is missing channelId"))?;
    let conversation = activity
        .conversation_id()
        .ok_or_else(|| anyhow!("activity is missing conversation.id"))?;
    Ok(format!("{channel}/conversations/{conversation}"))
}

#[async_trait]
pub trait ConversationState: Send + Sync {
    /// Returns the stored state, or an empty stack for a new conversation.
    async fn load(&self, turn: &TurnContext) -> Result<DialogState>;
    /// Persists `state`; with `force` the write happens even if nothing changed.
    async fn save_changes(&self, turn: &TurnContext, state: &DialogState, force: bool)
    -> Result<()>;
    async fn delete(&self, turn: &TurnContext) -> Result<()>;
}

/// Returns an in-memory conversation state wrapped in an [`Arc`].
pub fn shared_memory_state() -> SharedConversationState {
    Arc::new(MemoryConversationState::new())
}
