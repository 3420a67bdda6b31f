use metrics::counter;
use skillgate_core::{
    Activity, Attachment, ExtendedUserTokenProvider, SkillClientError,
    TOKEN_EXCHANGE_OPERATION_NAME, TokenExchangeInvokeRequest, TokenExchangeRequest, TurnContext,
    activity_types,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::skill_dialog::SkillDialog;

#[derive(Debug, Error)]
enum InterceptError {
    #[error("oauth card content is malformed")]
    InvalidCard(#[source] serde_json::Error),
    #[error("turn activity has no user id")]
    MissingUser,
    #[error("token exchange failed")]
    Exchange(#[source] anyhow::Error),
    #[error("skill reply has no conversation id")]
    MissingConversation,
    #[error("failed to encode token exchange invoke")]
    Encode(#[source] serde_json::Error),
    #[error("token exchange invoke could not be delivered")]
    Transport(#[source] SkillClientError),
}

impl InterceptError {
    fn kind(&self) -> &'static str {
        match self {
            InterceptError::InvalidCard(_) => "invalid_card",
            InterceptError::MissingUser => "missing_user",
            InterceptError::Exchange(_) => "exchange_failed",
            InterceptError::MissingConversation => "missing_conversation",
            InterceptError::Encode(_) => "encode_failed",
            InterceptError::Transport(_) => "transport_failed",
        }
    }
}

impl SkillDialog {
    /// Answers an OAuth card from the skill with a silently exchanged token.
    ///
    /// Returns `true` only when the skill accepted the token, in which case
    /// the card must not be shown to the user. Every failure falls back to
    /// showing the card.
    pub(crate) async fn intercept_oauth_cards(
        &self,
        turn: &TurnContext,
        activity: &Activity,
        connection_name: Option<&str>,
    ) -> bool {
        let Some(connection_name) = connection_name.filter(|name| !name.is_empty()) else {
            return false;
        };
        let Some(provider) = turn.adapter().token_provider() else {
            return false;
        };

        match self
            .try_intercept(turn, provider, activity, connection_name)
            .await
        {
            Ok(intercepted) => {
                if intercepted {
                    counter!("skill_dialog_oauth_intercept_total", "outcome" => "intercepted")
                        .increment(1);
                }
                intercepted
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = err.kind(),
                    skill = self.options.skill.id.as_str(),
                    connection = connection_name,
                    "oauth card interception failed; card will be shown"
                );
                counter!("skill_dialog_oauth_intercept_total", "outcome" => err.kind())
                    .increment(1);
                false
            }
        }
    }

    async fn try_intercept(
        &self,
        turn: &TurnContext,
        provider: &dyn ExtendedUserTokenProvider,
        activity: &Activity,
        connection_name: &str,
    ) -> Result<bool, InterceptError> {
        let Some(card) = activity.attachments.iter().find_map(Attachment::oauth_card) else {
            return Ok(false);
        };
        let card = card.map_err(InterceptError::InvalidCard)?;
        let Some(resource) = card.exchangeable_resource() else {
            return Ok(false);
        };
        let uri = resource.uri.clone().unwrap_or_default();
        let user_id = turn
            .activity()
            .from_id()
            .ok_or(InterceptError::MissingUser)?;

        let response = provider
            .exchange_token(turn, connection_name, user_id, &TokenExchangeRequest::for_uri(uri))
            .await
            .map_err(InterceptError::Exchange)?;
        let Some(token) = response.map(|r| r.token).filter(|token| !token.is_empty()) else {
            debug!(connection = connection_name, "no token available for silent sign-in");
            return Ok(false);
        };

        self.send_token_exchange_invoke_to_skill(
            activity,
            resource.id.clone().unwrap_or_default(),
            card.connection_name.clone(),
            token,
        )
        .await
    }

    async fn send_token_exchange_invoke_to_skill(
        &self,
        incoming: &Activity,
        request_id: String,
        connection_name: String,
        token: String,
    ) -> Result<bool, InterceptError> {
        let mut invoke = incoming.create_reply();
        invoke.r#type = activity_types::INVOKE.to_string();
        invoke.name = Some(TOKEN_EXCHANGE_OPERATION_NAME.to_string());
        invoke.text = None;
        invoke.value = Some(
            serde_json::to_value(TokenExchangeInvokeRequest {
                id: request_id,
                connection_name,
                token,
            })
            .map_err(InterceptError::Encode)?,
        );

        let conversation_id = incoming
            .conversation_id()
            .ok_or(InterceptError::MissingConversation)?;
        let options = &self.options;
        let response = options
            .skill_client
            .post_activity(
                &options.bot_id,
                &options.skill.app_id,
                &options.skill.skill_endpoint,
                &options.skill_host_endpoint,
                conversation_id,
                &invoke,
            )
            .await
            .map_err(InterceptError::Transport)?;

        if !response.is_success_status_code() {
            debug!(status = response.status, "skill declined exchanged token");
        }
        Ok(response.is_success_status_code())
    }
}
