use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use skillgate_core::TurnContext;
use skillgate_session::{ConversationState, DialogState, MemoryConversationState};

use crate::timeline::Timeline;

/// Snapshot taken by [`RecordingConversationState::save_changes`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSave {
    pub state: DialogState,
    pub force: bool,
}

/// In-memory conversation state that records every save.
#[derive(Default)]
pub struct RecordingConversationState {
    inner: MemoryConversationState,
    saves: Mutex<Vec<RecordedSave>>,
    fail_saves: bool,
    timeline: Option<Timeline>,
}

impl RecordingConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Every save fails with a storage error.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn saves(&self) -> Vec<RecordedSave> {
        self.saves.lock().expect("lock saves").clone()
    }
}

#[async_trait]
impl ConversationState for RecordingConversationState {
    async fn load(&self, turn: &TurnContext) -> Result<DialogState> {
        self.inner.load(turn).await
    }

    async fn save_changes(
        &self,
        turn: &TurnContext,
        state: &DialogState,
        force: bool,
    ) -> Result<()> {
        if let Some(timeline) = &self.timeline {
            timeline.record("save");
        }
        self.saves.lock().expect("lock saves").push(RecordedSave {
            state: state.clone(),
            force,
        });
        if self.fail_saves {
            return Err(anyhow!("storage unavailable"));
        }
        self.inner.save_changes(turn, state, force).await
    }

    async fn delete(&self, turn: &TurnContext) -> Result<()> {
        self.inner.delete(turn).await
    }
}
