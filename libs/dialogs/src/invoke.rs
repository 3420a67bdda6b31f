use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use skillgate_core::{Activity, SkillConversationIdFactoryOptions};
use skillgate_telemetry::{record_skill_conversation, record_status, span_for_skill};
use tracing::{Instrument, Span, debug, warn};

use crate::dialog::DialogContext;
use crate::error::DialogError;
use crate::skill_dialog::SkillDialog;

/// `ExpectedReplies` body read leniently: each reply is parsed on its own so
/// one bad entry cannot drop its siblings.
#[derive(Debug, Default, Deserialize)]
struct BufferedReplies {
    #[serde(default)]
    activities: Vec<Value>,
}

impl SkillDialog {
    /// Posts `activity` to the skill and relays its buffered replies.
    ///
    /// Returns the `endOfConversation` activity found among the replies, if
    /// any; the last one wins when the skill sent several. Replies that do
    /// not parse as activities are logged and skipped.
    pub(crate) async fn send_to_skill(
        &self,
        dc: &DialogContext<'_>,
        activity: Activity,
        connection_name: Option<&str>,
    ) -> Result<Option<Activity>, DialogError> {
        let span = span_for_skill(&self.options.skill.id, &activity.r#type);
        self.round_trip(dc, activity, connection_name)
            .instrument(span)
            .await
    }

    async fn round_trip(
        &self,
        dc: &DialogContext<'_>,
        activity: Activity,
        connection_name: Option<&str>,
    ) -> Result<Option<Activity>, DialogError> {
        let turn = dc.turn();
        let options = &self.options;
        let skill = &options.skill;

        let skill_conversation_id = options
            .conversation_id_factory
            .create_skill_conversation_id(SkillConversationIdFactoryOptions {
                from_bot_oauth_scope: turn.caller_oauth_scope().map(str::to_string),
                from_bot_id: options.bot_id.clone(),
                activity: activity.clone(),
                skill: skill.clone(),
            })
            .await
            .map_err(DialogError::ConversationId)?;
        record_skill_conversation(&Span::current(), &skill_conversation_id);

        // The skill may call back before the post returns, so the stack is
        // persisted first.
        options
            .conversation_state
            .save_changes(turn, dc.state(), true)
            .await
            .map_err(DialogError::State)?;

        let response = options
            .skill_client
            .post_activity(
                &options.bot_id,
                &skill.app_id,
                &skill.skill_endpoint,
                &options.skill_host_endpoint,
                &skill_conversation_id,
                &activity,
            )
            .await?;
        record_status(&Span::current(), response.status);

        if !response.is_success_status_code() {
            warn!(
                status = response.status,
                endpoint = skill.skill_endpoint.as_str(),
                "skill rejected activity"
            );
            return Err(DialogError::SkillInvocation {
                skill_id: skill.id.clone(),
                endpoint: skill.skill_endpoint.clone(),
                status: response.status,
                body: response.body_text(),
            });
        }
        debug!(status = response.status, "skill accepted activity");

        if !activity.expects_replies() {
            return Ok(None);
        }
        let Some(body) = response.body_value() else {
            return Ok(None);
        };
        let replies = match serde_json::from_value::<BufferedReplies>(body.clone()) {
            Ok(replies) => replies,
            Err(err) => {
                warn!(error = %err, "skill replies body is not an ExpectedReplies object");
                BufferedReplies::default()
            }
        };
        debug!(replies = replies.activities.len(), "skill returned buffered replies");

        let mut end_of_conversation = None;
        for (index, raw) in replies.activities.into_iter().enumerate() {
            let reply = match serde_json::from_value::<Activity>(raw) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(error = %err, index, "skipping malformed skill reply");
                    counter!("skill_dialog_replies_total", "skill" => skill.id.clone(), "outcome" => "malformed").increment(1);
                    continue;
                }
            };
            if reply.is_end_of_conversation() {
                counter!("skill_dialog_replies_total", "skill" => skill.id.clone(), "outcome" => "end_of_conversation").increment(1);
                end_of_conversation = Some(reply);
            } else if self.intercept_oauth_cards(turn, &reply, connection_name).await {
                counter!("skill_dialog_replies_total", "skill" => skill.id.clone(), "outcome" => "intercepted").increment(1);
            } else {
                counter!("skill_dialog_replies_total", "skill" => skill.id.clone(), "outcome" => "relayed").increment(1);
                turn.send_activity(reply).await?;
            }
        }

        Ok(end_of_conversation)
    }
}
