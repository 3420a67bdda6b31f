use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use skillgate_core::{
    SkillConversationIdFactory, SkillConversationIdFactoryOptions, SkillConversationReference,
};

use crate::timeline::Timeline;

/// Deterministic factory: `{skill}:{conversation}`, keeping every request.
#[derive(Default)]
pub struct RecordingConversationIdFactory {
    requests: Mutex<Vec<SkillConversationIdFactoryOptions>>,
    timeline: Option<Timeline>,
}

impl RecordingConversationIdFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = Some(timeline);
        self
    }

    pub fn requests(&self) -> Vec<SkillConversationIdFactoryOptions> {
        self.requests.lock().expect("lock requests").clone()
    }
}

#[async_trait]
impl SkillConversationIdFactory for RecordingConversationIdFactory {
    async fn create_skill_conversation_id(
        &self,
        options: SkillConversationIdFactoryOptions,
    ) -> Result<String> {
        if let Some(timeline) = &self.timeline {
            timeline.record("create_id");
        }
        let conversation = options
            .activity
            .conversation_id()
            .ok_or_else(|| anyhow!("activity has no conversation"))?
            .to_string();
        let id = format!("{}:{}", options.skill.id, conversation);
        self.requests.lock().expect("lock requests").push(options);
        Ok(id)
    }

    async fn get_skill_conversation_reference(
        &self,
        _skill_conversation_id: &str,
    ) -> Result<Option<SkillConversationReference>> {
        Ok(None)
    }

    async fn delete_conversation_reference(&self, _skill_conversation_id: &str) -> Result<()> {
        Ok(())
    }
}
