use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skillgate_core::TurnContext;
use skillgate_session::{DialogInstance, DialogState};

use crate::error::DialogError;

/// Why a dialog method was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogReason {
    BeginCalled,
    ContinueCalled,
    /// The dialog completed on its own.
    EndCalled,
    /// The dialog is being replaced by another one.
    ReplaceCalled,
    /// The dialog is being cancelled by the host.
    CancelCalled,
    NextCalled,
}

impl DialogReason {
    /// Teardown initiated by the host rather than by the dialog finishing.
    pub fn is_interruption(self) -> bool {
        matches!(self, DialogReason::CancelCalled | DialogReason::ReplaceCalled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogTurnStatus {
    /// Nothing on the stack handled the turn.
    Empty,
    /// The active dialog consumed the turn and waits for more input.
    Waiting,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTurnResult {
    pub status: DialogTurnStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl DialogTurnResult {
    pub fn new(status: DialogTurnStatus, result: Option<Value>) -> Self {
        Self { status, result }
    }

    pub fn end_of_turn() -> Self {
        Self::new(DialogTurnStatus::Waiting, None)
    }

    pub fn empty() -> Self {
        Self::new(DialogTurnStatus::Empty, None)
    }

    pub fn complete(result: Option<Value>) -> Self {
        Self::new(DialogTurnStatus::Complete, result)
    }

    pub fn cancelled() -> Self {
        Self::new(DialogTurnStatus::Cancelled, None)
    }
}

#[async_trait]
pub trait Dialog: Send + Sync {
    type Options: Send;

    fn id(&self) -> &str;

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Self::Options>,
    ) -> Result<DialogTurnResult, DialogError>;

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(dc.end_dialog(None))
    }

    /// Called when a child of this dialog completed and the frame is active again.
    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        Ok(dc.end_dialog(result))
    }

    async fn reprompt_dialog(&self, _dc: &DialogContext<'_>) -> Result<(), DialogError> {
        Ok(())
    }

    /// Runs while `instance` is still the active frame, before it is popped.
    async fn end_dialog(
        &self,
        _dc: &DialogContext<'_>,
        _instance: &DialogInstance,
        _reason: DialogReason,
    ) -> Result<(), DialogError> {
        Ok(())
    }
}

/// Dialog stack of one conversation, bound to the turn being processed.
pub struct DialogContext<'a> {
    turn: &'a TurnContext,
    state: &'a mut DialogState,
}

impl<'a> DialogContext<'a> {
    pub fn new(turn: &'a TurnContext, state: &'a mut DialogState) -> Self {
        Self { turn, state }
    }

    pub fn turn(&self) -> &'a TurnContext {
        self.turn
    }

    pub fn state(&self) -> &DialogState {
        &*self.state
    }

    pub fn active_dialog(&self) -> Option<&DialogInstance> {
        self.state.active()
    }

    pub fn active_dialog_mut(&mut self) -> Option<&mut DialogInstance> {
        self.state.active_mut()
    }

    /// Pushes a frame for `dialog` and begins it; the frame is removed again if begin fails.
    ///
    /// Only the in-memory stack is rolled back. A dialog that persisted the
    /// stack before failing (the skill dialog saves before posting) leaves the
    /// frame in the conversation store; callers that keep using the turn's
    /// state after an error should save it again or reload it.
    pub async fn begin_dialog<D: Dialog>(
        &mut self,
        dialog: &D,
        options: Option<D::Options>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.state.push(DialogInstance::new(dialog.id()));
        let depth = self.state.stack.len();
        let outcome = dialog.begin_dialog(self, options).await;
        if outcome.is_err() && self.state.stack.len() == depth {
            self.state.pop();
        }
        outcome
    }

    pub async fn continue_dialog<D: Dialog>(
        &mut self,
        dialog: &D,
    ) -> Result<DialogTurnResult, DialogError> {
        if self.active_dialog().is_none() {
            return Ok(DialogTurnResult::empty());
        }
        dialog.continue_dialog(self).await
    }

    pub async fn resume_dialog<D: Dialog>(
        &mut self,
        dialog: &D,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        if self.active_dialog().is_none() {
            return Ok(DialogTurnResult::empty());
        }
        dialog.resume_dialog(self, reason, result).await
    }

    pub async fn reprompt_dialog<D: Dialog>(&mut self, dialog: &D) -> Result<(), DialogError> {
        if self.active_dialog().is_none() {
            return Ok(());
        }
        dialog.reprompt_dialog(self).await
    }

    /// Natural completion of the active frame: pops it and reports `result`.
    pub fn end_dialog(&mut self, result: Option<Value>) -> DialogTurnResult {
        self.state.pop();
        DialogTurnResult::complete(result)
    }

    /// Tears down the active frame for `reason`, giving `dialog` the chance to
    /// clean up while the frame is still on the stack.
    pub async fn end_active_dialog<D: Dialog>(
        &mut self,
        dialog: &D,
        reason: DialogReason,
    ) -> Result<(), DialogError> {
        let Some(instance) = self.active_dialog().cloned() else {
            return Ok(());
        };
        dialog.end_dialog(self, &instance, reason).await?;
        self.state.pop();
        Ok(())
    }

    pub async fn cancel_dialog<D: Dialog>(
        &mut self,
        dialog: &D,
    ) -> Result<DialogTurnResult, DialogError> {
        if self.active_dialog().is_none() {
            return Ok(DialogTurnResult::empty());
        }
        self.end_active_dialog(dialog, DialogReason::CancelCalled)
            .await?;
        Ok(DialogTurnResult::cancelled())
    }

    /// Ends `current` with [`DialogReason::ReplaceCalled`] and begins `next` in its place.
    pub async fn replace_dialog<C: Dialog, N: Dialog>(
        &mut self,
        current: &C,
        next: &N,
        options: Option<N::Options>,
    ) -> Result<DialogTurnResult, DialogError> {
        self.end_active_dialog(current, DialogReason::ReplaceCalled)
            .await?;
        self.begin_dialog(next, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillgate_core::{
        Activity, AdapterError, ChannelAdapter, ConversationAccount, ResourceResponse,
    };
    use std::sync::{Arc, Mutex};

    struct NullAdapter;

    #[async_trait]
    impl ChannelAdapter for NullAdapter {
        async fn send_activities(
            &self,
            _turn: &TurnContext,
            activities: Vec<Activity>,
        ) -> Result<Vec<ResourceResponse>, AdapterError> {
            Ok(activities.iter().map(|_| ResourceResponse::default()).collect())
        }
    }

    #[derive(Default)]
    struct Probe {
        fail_begin: bool,
        ended: Mutex<Vec<(usize, DialogReason)>>,
    }

    #[async_trait]
    impl Dialog for Probe {
        type Options = ();

        fn id(&self) -> &str {
            "probe"
        }

        async fn begin_dialog(
            &self,
            _dc: &mut DialogContext<'_>,
            _options: Option<()>,
        ) -> Result<DialogTurnResult, DialogError> {
            if self.fail_begin {
                return Err(DialogError::InvalidArgument("probe"));
            }
            Ok(DialogTurnResult::end_of_turn())
        }

        async fn end_dialog(
            &self,
            dc: &DialogContext<'_>,
            _instance: &DialogInstance,
            reason: DialogReason,
        ) -> Result<(), DialogError> {
            self.ended
                .lock()
                .unwrap()
                .push((dc.state().stack.len(), reason));
            Ok(())
        }
    }

    fn turn() -> TurnContext {
        let mut activity = Activity::message("hi");
        activity.channel_id = Some("test".into());
        activity.conversation = Some(ConversationAccount::new("conv"));
        TurnContext::new(Arc::new(NullAdapter), activity)
    }

    #[tokio::test]
    async fn failed_begin_leaves_no_frame() {
        let turn = turn();
        let mut state = DialogState::default();
        let mut dc = DialogContext::new(&turn, &mut state);
        let probe = Probe {
            fail_begin: true,
            ..Probe::default()
        };
        assert!(dc.begin_dialog(&probe, None).await.is_err());
        assert!(dc.active_dialog().is_none());
    }

    #[tokio::test]
    async fn cancel_runs_teardown_before_pop() {
        let turn = turn();
        let mut state = DialogState::default();
        let mut dc = DialogContext::new(&turn, &mut state);
        let probe = Probe::default();

        let result = dc.begin_dialog(&probe, None).await.unwrap();
        assert_eq!(result.status, DialogTurnStatus::Waiting);

        let result = dc.cancel_dialog(&probe).await.unwrap();
        assert_eq!(result.status, DialogTurnStatus::Cancelled);
        assert!(dc.active_dialog().is_none());
        assert_eq!(
            *probe.ended.lock().unwrap(),
            vec![(1, DialogReason::CancelCalled)]
        );
    }

    #[tokio::test]
    async fn continue_without_frame_is_empty() {
        let turn = turn();
        let mut state = DialogState::default();
        let mut dc = DialogContext::new(&turn, &mut state);
        let result = dc.continue_dialog(&Probe::default()).await.unwrap();
        assert_eq!(result, DialogTurnResult::empty());
    }

    #[test]
    fn interruption_reasons() {
        assert!(DialogReason::CancelCalled.is_interruption());
        assert!(DialogReason::ReplaceCalled.is_interruption());
        assert!(!DialogReason::EndCalled.is_interruption());
    }
}
