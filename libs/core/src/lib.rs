//! Skill forwarding contracts and value types.
//!
//! This crate exposes the Bot Framework activity model exchanged between a root
//! bot, its channel and the skills it delegates to, together with the
//! collaborator contracts the dialog layer relies on: the channel adapter (and
//! its optional token exchange capability), the skill transport client and the
//! skill conversation id factory.
pub mod activity;
pub mod cards;
pub mod client;
pub mod config;
pub mod skill;
pub mod token;
pub mod turn;

pub use activity::{
    Activity, Attachment, ChannelAccount, ConversationAccount, ConversationReference,
    DeliveryMode, ExpectedReplies, TRACE_VALUE_TYPE, activity_types,
};
pub use cards::{OAUTH_CARD_CONTENT_TYPE, OAuthCard, TokenExchangeResource, contains_oauth_card};
pub use client::{
    CredentialProvider, HttpSkillClient, InvokeResponse, SharedSkillClient, SkillClient,
    SkillClientError, StaticCredentials, prepare_skill_activity,
};
pub use config::{ConfigError, DEFAULT_TOKEN_SERVICE_URL, SkillHostConfig};
pub use skill::{
    SharedConversationIdFactory, SkillConversationIdFactory, SkillConversationIdFactoryOptions,
    SkillConversationReference, SkillDescriptor,
};
pub use token::{
    ExtendedUserTokenProvider, SharedTokenProvider, TOKEN_EXCHANGE_OPERATION_NAME,
    TokenExchangeAdapter, TokenExchangeInvokeRequest, TokenExchangeRequest, TokenResponse,
    TokenServiceClient,
};
pub use turn::{
    AdapterError, ChannelAdapter, EMULATOR_CHANNEL, ResourceResponse, SharedChannelAdapter,
    TurnContext, TurnState,
};

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(skillgate_core::version(), env!("CARGO_PKG_VERSION"));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
