use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::activity::{Activity, ConversationReference};

/// Static description of a remote skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDescriptor {
    pub id: String,
    pub app_id: String,
    pub skill_endpoint: String,
}

impl SkillDescriptor {
    pub fn new(
        id: impl Into<String>,
        app_id: impl Into<String>,
        skill_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            app_id: app_id.into(),
            skill_endpoint: skill_endpoint.into(),
        }
    }
}

/// Inputs used to mint the conversation id a skill sees.
#[derive(Debug, Clone)]
pub struct SkillConversationIdFactoryOptions {
    pub from_bot_oauth_scope: Option<String>,
    pub from_bot_id: String,
    pub activity: Activity,
    pub skill: SkillDescriptor,
}

/// What a skill conversation id resolves back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillConversationReference {
    pub conversation_reference: ConversationReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_scope: Option<String>,
}

/// Maps a (root conversation, skill) pair to the id used on every call to that skill.
#[async_trait]
pub trait SkillConversationIdFactory: Send + Sync {
    /// Must return the same id for the same root conversation and skill.
    async fn create_skill_conversation_id(
        &self,
        options: SkillConversationIdFactoryOptions,
    ) -> anyhow::Result<String>;

    async fn get_skill_conversation_reference(
        &self,
        skill_conversation_id: &str,
    ) -> anyhow::Result<Option<SkillConversationReference>>;

    async fn delete_conversation_reference(&self, skill_conversation_id: &str)
    -> anyhow::Result<()>;
}

pub type SharedConversationIdFactory = Arc<dyn SkillConversationIdFactory>;
