use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use skillgate_core::{
    Activity, AdapterError, ChannelAdapter, ExtendedUserTokenProvider, ResourceResponse,
    SharedTokenProvider, TurnContext,
};

/// Channel adapter that keeps everything sent to the user.
#[derive(Default)]
pub struct RecordingAdapter {
    sent: Mutex<Vec<Activity>>,
    token_provider: Option<SharedTokenProvider>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter that also offers the token exchange capability.
    pub fn with_token_provider(provider: SharedTokenProvider) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            token_provider: Some(provider),
        }
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn sent(&self) -> Vec<Activity> {
        self.sent.lock().expect("lock sent").clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|activity| activity.text)
            .collect()
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    async fn send_activities(
        &self,
        _turn: &TurnContext,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, AdapterError> {
        let mut sent = self.sent.lock().expect("lock sent");
        let start = sent.len();
        let responses = (0..activities.len())
            .map(|offset| ResourceResponse {
                id: format!("sent-{}", start + offset),
            })
            .collect();
        sent.extend(activities);
        Ok(responses)
    }

    fn token_provider(&self) -> Option<&dyn ExtendedUserTokenProvider> {
        self.token_provider.as_deref()
    }
}
