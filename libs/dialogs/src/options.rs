use serde::{Deserialize, Serialize};
use serde_json::Value;
use skillgate_core::{
    Activity, SharedConversationIdFactory, SharedSkillClient, SkillDescriptor, SkillHostConfig,
};
use skillgate_session::SharedConversationState;

use crate::error::DialogError;

/// Arguments for starting a skill dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginSkillDialogOptions {
    /// Activity forwarded to the skill to start the exchange.
    #[serde(default)]
    pub activity: Option<Activity>,
    /// OAuth connection used to silently answer sign-in cards from the skill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
}

impl BeginSkillDialogOptions {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity: Some(activity),
            connection_name: None,
        }
    }

    pub fn with_connection_name(mut self, connection_name: impl Into<String>) -> Self {
        self.connection_name = Some(connection_name.into());
        self
    }

    /// Reads options supplied as loosely typed JSON by a host.
    pub fn from_value(value: Value) -> Result<Self, DialogError> {
        if !value.is_object() {
            return Err(DialogError::InvalidArgument(
                "options object not valid as BeginSkillDialogOptions",
            ));
        }
        serde_json::from_value(value).map_err(|_| {
            DialogError::InvalidArgument("options object not valid as BeginSkillDialogOptions")
        })
    }
}

/// Static configuration and collaborators of a skill dialog.
#[derive(Clone)]
pub struct SkillDialogOptions {
    /// App id of the root bot calling the skill.
    pub bot_id: String,
    /// Endpoint the skill uses to call back into the root bot.
    pub skill_host_endpoint: String,
    pub skill: SkillDescriptor,
    pub conversation_id_factory: SharedConversationIdFactory,
    pub skill_client: SharedSkillClient,
    pub conversation_state: SharedConversationState,
}

impl SkillDialogOptions {
    pub fn from_config(
        config: &SkillHostConfig,
        skill_id: &str,
        conversation_id_factory: SharedConversationIdFactory,
        skill_client: SharedSkillClient,
        conversation_state: SharedConversationState,
    ) -> Result<Self, DialogError> {
        let skill = config
            .skill(skill_id)
            .cloned()
            .ok_or_else(|| DialogError::UnknownSkill(skill_id.to_string()))?;
        Ok(Self {
            bot_id: config.bot_id.clone(),
            skill_host_endpoint: config.skill_host_endpoint.clone(),
            skill,
            conversation_id_factory,
            skill_client,
            conversation_state,
        })
    }
}
