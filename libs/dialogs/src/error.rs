use skillgate_core::{AdapterError, SkillClientError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("dialog {0} has no active forwarding session")]
    NotActive(String),
    #[error("skill {0} is not configured")]
    UnknownSkill(String),
    #[error(
        "error invoking the skill id: \"{skill_id}\" at \"{endpoint}\" (status is {status}). {body}"
    )]
    SkillInvocation {
        skill_id: String,
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("failed to create skill conversation id")]
    ConversationId(#[source] anyhow::Error),
    #[error("failed to save conversation state")]
    State(#[source] anyhow::Error),
    #[error("skill transport failed")]
    Transport(#[from] SkillClientError),
    #[error("failed to deliver activity to the channel")]
    Channel(#[from] AdapterError),
}
