use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::activity::Activity;
use crate::token::ExtendedUserTokenProvider;

pub const EMULATOR_CHANNEL: &str = "emulator";

/// Identifier returned by a channel for an activity it accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceResponse {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("channel rejected activity (status {status})")]
    Rejected { status: u16, message: String },
    #[error("channel adapter error")]
    Internal(#[source] anyhow::Error),
}

/// Delivers activities to the end user's channel.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    async fn send_activities(
        &self,
        turn: &TurnContext,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, AdapterError>;

    /// Token exchange capability; `None` when the adapter cannot exchange tokens.
    fn token_provider(&self) -> Option<&dyn ExtendedUserTokenProvider> {
        None
    }
}

pub type SharedChannelAdapter = Arc<dyn ChannelAdapter>;

/// Values attached to a single turn by the hosting pipeline.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    /// OAuth scope of the bot that called us, when the turn came from another bot.
    pub caller_oauth_scope: Option<String>,
}

/// Everything the forwarding layer needs about the turn being processed.
pub struct TurnContext {
    activity: Activity,
    adapter: SharedChannelAdapter,
    turn_state: TurnState,
}

impl TurnContext {
    pub fn new(adapter: SharedChannelAdapter, activity: Activity) -> Self {
        Self {
            activity,
            adapter,
            turn_state: TurnState::default(),
        }
    }

    pub fn with_turn_state(mut self, turn_state: TurnState) -> Self {
        self.turn_state = turn_state;
        self
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn adapter(&self) -> &dyn ChannelAdapter {
        self.adapter.as_ref()
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn_state
    }

    pub fn caller_oauth_scope(&self) -> Option<&str> {
        self.turn_state.caller_oauth_scope.as_deref()
    }

    /// Sends `activity` to the user as a reply within this turn's conversation.
    pub async fn send_activity(&self, activity: Activity) -> Result<ResourceResponse, AdapterError> {
        let mut activity = activity;
        activity.apply_conversation_reference(&self.activity.conversation_reference(), false);
        let responses = self.adapter.send_activities(self, vec![activity]).await?;
        Ok(responses.into_iter().next().unwrap_or_default())
    }

    /// Emits a diagnostic trace; only the emulator channel receives it as an activity.
    pub async fn send_trace_activity(
        &self,
        name: &str,
        label: impl Into<String>,
        value: Option<Value>,
    ) -> Result<Option<ResourceResponse>, AdapterError> {
        let label = label.into();
        debug!(trace = name, label = label.as_str(), "turn trace");
        if self.activity.channel_id.as_deref() != Some(EMULATOR_CHANNEL) {
            return Ok(None);
        }
        let trace = Activity::trace(name, Some(label), value);
        self.send_activity(trace).await.map(Some)
    }
}
