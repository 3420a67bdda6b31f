use anyhow::{Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use skillgate_core::{
    SkillConversationIdFactory, SkillConversationIdFactoryOptions, SkillConversationReference,
};
use uuid::Uuid;

/// Hands out one skill conversation id per (channel, root conversation, skill).
#[derive(Default)]
pub struct MemorySkillConversationIdFactory {
    by_scope: DashMap<String, String>,
    by_id: DashMap<String, SkillConversationReference>,
}

impl MemorySkillConversationIdFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_key(options: &SkillConversationIdFactoryOptions) -> Result<String> {
        let activity = &options.activity;
        let conversation = activity
            .conversation_id()
            .ok_or_else(|| anyhow!("activity is missing conversation.id"))?;
        Ok(format!(
            "{}:{}:{}",
            activity.channel_id.as_deref().unwrap_or_default(),
            conversation,
            options.skill.id
        ))
    }
}

#[async_trait]
impl SkillConversationIdFactory for MemorySkillConversationIdFactory {
    async fn create_skill_conversation_id(
        &self,
        options: SkillConversationIdFactoryOptions,
    ) -> Result<String> {
        let scope = Self::scope_key(&options)?;
        let id = self
            .by_scope
            .entry(scope)
            .or_insert_with(|| Uuid::new_v4().to_string())
            .value()
            .clone();
        self.by_id
            .entry(id.clone())
            .or_insert_with(|| SkillConversationReference {
                conversation_reference: options.activity.conversation_reference(),
                oauth_scope: options.from_bot_oauth_scope.clone(),
            });
        Ok(id)
    }

    async fn get_skill_conversation_reference(
        &self,
        skill_conversation_id: &str,
    ) -> Result<Option<SkillConversationReference>> {
        Ok(self
            .by_id
            .get(skill_conversation_id)
            .map(|entry| entry.value().clone()))
    }

    async fn delete_conversation_reference(&self, skill_conversation_id: &str) -> Result<()> {
        self.by_id.remove(skill_conversation_id);
        self.by_scope
            .retain(|_, id| id.as_str() != skill_conversation_id);
        Ok(())
    }
}
