use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use skillgate_core::{Activity, InvokeResponse, SkillClient, SkillClientError};

use crate::timeline::Timeline;

/// One call made to [`RecordingSkillClient::post_activity`].
#[derive(Debug, Clone)]
pub struct PostedActivity {
    pub from_bot_id: String,
    pub to_bot_id: String,
    pub to_url: String,
    pub service_url: String,
    pub conversation_id: String,
    pub activity: Activity,
}

enum Scripted {
    Respond(InvokeResponse),
    Fail(String),
}

/// Skill client answering from a script; answers `200` with no body once the
/// script runs out.
#[derive(Default)]
pub struct RecordingSkillClient {
    script: Mutex<VecDeque<Scripted>>,
    posted: Mutex<Vec<PostedActivity>>,
    timeline: Option<Timeline>,
}

impl RecordingSkillClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn respond(&self, response: InvokeResponse) -> &Self {
        self.script
            .lock()
            .expect("lock script")
            .push_back(Scripted::Respond(response));
        self
    }

    /// Queues a transport failure for the next post.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.script
            .lock()
            .expect("lock script")
            .push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn posted(&self) -> Vec<PostedActivity> {
        self.posted.lock().expect("lock posted").clone()
    }

    pub fn posted_activities(&self) -> Vec<Activity> {
        self.posted()
            .into_iter()
            .map(|posted| posted.activity)
            .collect()
    }
}

#[async_trait]
impl SkillClient for RecordingSkillClient {
    async fn post_activity(
        &self,
        from_bot_id: &str,
        to_bot_id: &str,
        to_url: &str,
        service_url: &str,
        conversation_id: &str,
        activity: &Activity,
    ) -> Result<InvokeResponse, SkillClientError> {
        if let Some(timeline) = &self.timeline {
            timeline.record(format!("post:{}", activity.r#type));
        }
        self.posted.lock().expect("lock posted").push(PostedActivity {
            from_bot_id: from_bot_id.to_string(),
            to_bot_id: to_bot_id.to_string(),
            to_url: to_url.to_string(),
            service_url: service_url.to_string(),
            conversation_id: conversation_id.to_string(),
            activity: activity.clone(),
        });

        match self.script.lock().expect("lock script").pop_front() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(SkillClientError::Config(anyhow!(message))),
            None => Ok(InvokeResponse::ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_from_script_then_ok() {
        let client = RecordingSkillClient::new();
        client.respond(InvokeResponse::new(500, None)).fail("down");
        let activity = Activity::message("hi");

        let first = client
            .post_activity("bot", "skill", "http://skill", "http://host", "c1", &activity)
            .await
            .unwrap();
        assert_eq!(first.status, 500);
        assert!(
            client
                .post_activity("bot", "skill", "http://skill", "http://host", "c1", &activity)
                .await
                .is_err()
        );
        let third = client
            .post_activity("bot", "skill", "http://skill", "http://host", "c1", &activity)
            .await
            .unwrap();
        assert_eq!(third, InvokeResponse::ok());
        assert_eq!(client.posted().len(), 3);
    }
}
