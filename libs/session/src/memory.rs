use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use skillgate_core::TurnContext;
use tracing::trace;

use crate::{ConversationState, DialogState, StateRecord, state_key};

#[derive(Default)]
pub struct MemoryConversationState {
    by_conversation: DashMap<String, StateRecord>,
}

impl MemoryConversationState {
    pub fn new() -> Self {
        Self {
            by_conversation: DashMap::new(),
        }
    }

    /// Returns the stored record for `key` (`{channelId}/conversations/{id}`).
    pub fn get(&self, key: &str) -> Option<StateRecord> {
        self.by_conversation
            .get(key)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ConversationState for MemoryConversationState {
    async fn load(&self, turn: &TurnContext) -> Result<DialogState> {
        let key = state_key(turn)?;
        Ok(self
            .by_conversation
            .get(&key)
            .map(|entry| entry.value().state.clone())
            .unwrap_or_default())
    }

    async fn save_changes(
        &self,
        turn: &TurnContext,
        state: &DialogState,
        force: bool,
    ) -> Result<()> {
        let key = state_key(turn)?;
        let unchanged = self
            .by_conversation
            .get(&key)
            .is_some_and(|entry| entry.value().state == *state);
        if unchanged && !force {
            return Ok(());
        }
        trace!(key = key.as_str(), frames = state.stack.len(), "saving dialog state");
        self.by_conversation.insert(key, StateRecord::new(state.clone()));
        Ok(())
    }

    async fn delete(&self, turn: &TurnContext) -> Result<()> {
        let key = state_key(turn)?;
        self.by_conversation.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DialogInstance, ForwardingSession};
    use async_trait::async_trait;
    use skillgate_core::{
        Activity, AdapterError, ChannelAdapter, ConversationAccount, DeliveryMode,
        ResourceResponse,
    };
    use std::sync::Arc;

    struct NullAdapter;

    #[async_trait]
    impl ChannelAdapter for NullAdapter {
        async fn send_activities(
            &self,
            _turn: &TurnContext,
            activities: Vec<Activity>,
        ) -> Result<Vec<ResourceResponse>, AdapterError> {
            Ok(activities.iter().map(|_| ResourceResponse::default()).collect())
        }
    }

    fn turn(conversation: &str) -> TurnContext {
        let mut activity = Activity::message("hi");
        activity.channel_id = Some("msteams".into());
        activity.conversation = Some(ConversationAccount::new(conversation));
        TurnContext::new(Arc::new(NullAdapter), activity)
    }

    #[tokio::test]
    async fn save_then_load_round_trips_frames() {
        let store = MemoryConversationState::new();
        let turn = turn("conv-1");
        assert!(store.load(&turn).await.unwrap().is_empty());

        let mut state = DialogState::default();
        let mut frame = DialogInstance::new("skill");
        frame.forwarding = Some(ForwardingSession::new(
            Some(DeliveryMode::ExpectReplies),
            Some("graph".into()),
        ));
        state.push(frame);
        store.save_changes(&turn, &state, true).await.unwrap();

        assert_eq!(store.load(&turn).await.unwrap(), state);
        assert!(store.load(&self::turn("conv-2")).await.unwrap().is_empty());
        assert!(store.get("msteams/conversations/conv-1").is_some());

        store.delete(&turn).await.unwrap();
        assert!(store.load(&turn).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unforced_save_skips_unchanged_state() {
        let store = MemoryConversationState::new();
        let turn = turn("conv-1");
        let state = DialogState::default();
        store.save_changes(&turn, &state, true).await.unwrap();
        let first = store.get("msteams/conversations/conv-1").unwrap().updated_unix_ms;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save_changes(&turn, &state, false).await.unwrap();
        let second = store.get("msteams/conversations/conv-1").unwrap().updated_unix_ms;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_conversation_is_an_error() {
        let store = MemoryConversationState::new();
        let turn = TurnContext::new(Arc::new(NullAdapter), Activity::message("hi"));
        assert!(store.load(&turn).await.is_err());
    }
}
