use async_trait::async_trait;
use serde_json::Value;
use skillgate_core::Activity;
use skillgate_session::{DialogInstance, ForwardingSession};
use tracing::debug;

use crate::dialog::{Dialog, DialogContext, DialogReason, DialogTurnResult};
use crate::error::DialogError;
use crate::options::{BeginSkillDialogOptions, SkillDialogOptions};

/// Event name sent to a skill when its dialog should re-prompt the user.
pub const REPROMPT_DIALOG_EVENT: &str = "repromptDialog";

/// Forwards the conversation of its frame to a remote skill until the skill
/// ends it or the host tears the frame down.
pub struct SkillDialog {
    id: String,
    pub(crate) options: SkillDialogOptions,
}

impl SkillDialog {
    pub fn new(options: SkillDialogOptions, dialog_id: impl Into<String>) -> Self {
        Self {
            id: dialog_id.into(),
            options,
        }
    }

    pub fn options(&self) -> &SkillDialogOptions {
        &self.options
    }

    /// Forwarding state of the active frame when it belongs to this dialog.
    pub fn forwarding_session<'s>(&self, dc: &'s DialogContext<'_>) -> Option<&'s ForwardingSession> {
        dc.active_dialog()
            .filter(|frame| frame.id == self.id)
            .and_then(|frame| frame.forwarding.as_ref())
    }

    fn validate_begin_dialog_args(
        options: Option<BeginSkillDialogOptions>,
    ) -> Result<(Activity, Option<String>), DialogError> {
        let options = options.ok_or(DialogError::InvalidArgument("options cannot be None"))?;
        let activity = options.activity.ok_or(DialogError::InvalidArgument(
            "activity in BeginSkillDialogOptions cannot be None",
        ))?;
        Ok((activity, options.connection_name))
    }

    fn finish(dc: &mut DialogContext<'_>, end_of_conversation: Option<Activity>) -> DialogTurnResult {
        match end_of_conversation {
            Some(eoc) => dc.end_dialog(eoc.value),
            None => DialogTurnResult::end_of_turn(),
        }
    }
}

#[async_trait]
impl Dialog for SkillDialog {
    type Options = BeginSkillDialogOptions;

    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<BeginSkillDialogOptions>,
    ) -> Result<DialogTurnResult, DialogError> {
        let (activity, connection_name) = Self::validate_begin_dialog_args(options)?;
        let turn = dc.turn();
        turn.send_trace_activity(
            "SkillDialog.begin_dialog()",
            format!("Using activity of type: {}", activity.r#type),
            None,
        )
        .await?;

        let mut skill_activity = activity.clone();
        skill_activity.apply_conversation_reference(&turn.activity().conversation_reference(), true);

        let frame = dc
            .active_dialog_mut()
            .filter(|frame| frame.id == self.id)
            .ok_or_else(|| DialogError::NotActive(self.id.clone()))?;
        frame.forwarding = Some(ForwardingSession::new(
            activity.delivery_mode,
            connection_name.clone(),
        ));
        debug!(
            dialog = self.id.as_str(),
            skill = self.options.skill.id.as_str(),
            delivery_mode = ?activity.delivery_mode,
            "forwarding session started"
        );

        let eoc = self
            .send_to_skill(dc, skill_activity, connection_name.as_deref())
            .await?;
        Ok(Self::finish(dc, eoc))
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        let session = self
            .forwarding_session(dc)
            .cloned()
            .ok_or_else(|| DialogError::NotActive(self.id.clone()))?;
        let turn = dc.turn();
        let inbound = turn.activity();
        turn.send_trace_activity(
            "SkillDialog.continue_dialog()",
            format!("ActivityType: {}", inbound.r#type),
            None,
        )
        .await?;

        // Relayed back by the skill handler when the skill ended the conversation.
        if inbound.is_end_of_conversation() {
            turn.send_trace_activity(
                "SkillDialog.continue_dialog()",
                "Got endOfConversation",
                None,
            )
            .await?;
            return Ok(dc.end_dialog(inbound.value.clone()));
        }

        let mut skill_activity = inbound.clone();
        skill_activity.delivery_mode = session.delivery_mode();

        let eoc = self
            .send_to_skill(dc, skill_activity, session.sso_connection_name())
            .await?;
        Ok(Self::finish(dc, eoc))
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.reprompt_dialog(dc).await?;
        Ok(DialogTurnResult::end_of_turn())
    }

    async fn reprompt_dialog(&self, dc: &DialogContext<'_>) -> Result<(), DialogError> {
        let mut reprompt = Activity::event(REPROMPT_DIALOG_EVENT);
        reprompt.apply_conversation_reference(&dc.turn().activity().conversation_reference(), true);

        // No sign-in card is expected in reply to a reprompt.
        self.send_to_skill(dc, reprompt, None).await?;
        Ok(())
    }

    async fn end_dialog(
        &self,
        dc: &DialogContext<'_>,
        _instance: &DialogInstance,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        if !reason.is_interruption() {
            return Ok(());
        }

        let turn = dc.turn();
        let inbound = turn.activity();
        turn.send_trace_activity(
            "SkillDialog.end_dialog()",
            format!("ActivityType: {}", inbound.r#type),
            None,
        )
        .await?;

        let mut eoc = Activity::end_of_conversation();
        eoc.apply_conversation_reference(&inbound.conversation_reference(), true);
        eoc.channel_data = inbound.channel_data.clone();
        eoc.additional_properties = inbound.additional_properties.clone();
        debug!(
            dialog = self.id.as_str(),
            skill = self.options.skill.id.as_str(),
            ?reason,
            "notifying skill of teardown"
        );

        self.send_to_skill(dc, eoc, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_requires_options() {
        assert!(matches!(
            SkillDialog::validate_begin_dialog_args(None),
            Err(DialogError::InvalidArgument("options cannot be None"))
        ));
    }

    #[test]
    fn begin_requires_an_activity() {
        let options = BeginSkillDialogOptions {
            activity: None,
            connection_name: Some("graph".into()),
        };
        assert!(matches!(
            SkillDialog::validate_begin_dialog_args(Some(options)),
            Err(DialogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn begin_args_keep_connection_name() {
        let options =
            BeginSkillDialogOptions::new(Activity::message("hi")).with_connection_name("graph");
        let (activity, connection) =
            SkillDialog::validate_begin_dialog_args(Some(options)).unwrap();
        assert_eq!(activity.text.as_deref(), Some("hi"));
        assert_eq!(connection.as_deref(), Some("graph"));
    }
}
