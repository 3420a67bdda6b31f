use std::sync::Arc;

use serde_json::json;
use skillgate_core::{
    InvokeResponse, TOKEN_EXCHANGE_OPERATION_NAME, activity_types, contains_oauth_card,
};
use skillgate_dialogs::{BeginSkillDialogOptions, DialogContext, DialogTurnStatus};
use skillgate_session::DialogState;
use skillgate_testutil::fixtures::{
    USER_ID, expect_replies, oauth_card_reply, replies, skill_message, user_message,
};
use skillgate_testutil::{ExchangeCall, RecordingAdapter, TokenBehavior};
use tracing_test::traced_test;

#[path = "dialog_support.rs"]
mod support;

use support::{Harness, adapter, adapter_with_tokens, turn};

const CARD_URI: &str = "api://skill-app/access_as_user";

/// Begins the dialog on an `expectReplies` turn; responses must already be queued.
async fn begin(
    harness: &Harness,
    adapter: &Arc<RecordingAdapter>,
    connection_name: Option<&str>,
) -> DialogTurnStatus {
    let turn = turn(adapter, expect_replies(user_message("sign me in")));
    let mut state = DialogState::default();
    let mut options = BeginSkillDialogOptions::new(turn.activity().clone());
    options.connection_name = connection_name.map(str::to_string);
    DialogContext::new(&turn, &mut state)
        .begin_dialog(&harness.dialog, Some(options))
        .await
        .unwrap()
        .status
}

fn shown_cards(adapter: &RecordingAdapter) -> usize {
    adapter
        .sent()
        .iter()
        .filter(|activity| contains_oauth_card(activity))
        .count()
}

#[tokio::test]
async fn exchanged_token_is_sent_to_skill_and_card_suppressed() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]))
        .respond(InvokeResponse::ok());

    let status = begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(status, DialogTurnStatus::Waiting);
    assert!(adapter.sent().is_empty());
    assert_eq!(
        provider.calls(),
        vec![ExchangeCall {
            connection_name: "graph".into(),
            user_id: USER_ID.into(),
            uri: Some(CARD_URI.into()),
        }]
    );

    let posted = harness.client.posted();
    assert_eq!(posted.len(), 2);
    let invoke = &posted[1];
    assert_eq!(invoke.conversation_id, "skill-conv");
    assert!(invoke.activity.is_type(activity_types::INVOKE));
    assert_eq!(
        invoke.activity.name.as_deref(),
        Some(TOKEN_EXCHANGE_OPERATION_NAME)
    );
    assert_eq!(invoke.activity.reply_to_id.as_deref(), Some("card-1"));
    assert_eq!(
        invoke.activity.value,
        Some(json!({
            "id": "exchange-1",
            "connectionName": "skill-conn",
            "token": "tok-123"
        }))
    );
}

#[tokio::test]
async fn card_is_shown_without_connection_name() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]));

    begin(&harness, &adapter, None).await;

    assert_eq!(shown_cards(&adapter), 1);
    assert!(provider.calls().is_empty());
    assert_eq!(harness.client.posted().len(), 1);
}

#[tokio::test]
async fn card_is_shown_when_channel_cannot_exchange_tokens() {
    let harness = Harness::new();
    let adapter = adapter();
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]));

    begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(shown_cards(&adapter), 1);
    assert_eq!(harness.client.posted().len(), 1);
}

#[tokio::test]
async fn card_without_exchange_uri_is_shown() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", None)]));

    begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(shown_cards(&adapter), 1);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn plain_messages_skip_the_token_service() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![skill_message("no card here")]));

    begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(adapter.sent_texts(), vec!["no card here"]);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn missing_token_shows_the_card() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::NoToken);
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]));

    let status = begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(status, DialogTurnStatus::Waiting);
    assert_eq!(shown_cards(&adapter), 1);
    assert_eq!(provider.calls().len(), 1);
    assert_eq!(harness.client.posted().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn exchange_failure_is_logged_and_card_shown() {
    let harness = Harness::new();
    let (adapter, _provider) = adapter_with_tokens(TokenBehavior::Fail("token service down".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]));

    let status = begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(status, DialogTurnStatus::Waiting);
    assert_eq!(shown_cards(&adapter), 1);
    assert!(logs_contain("oauth card interception failed"));
    assert!(logs_contain("exchange_failed"));
}

#[tokio::test]
async fn rejected_token_invoke_shows_the_card() {
    let harness = Harness::new();
    let (adapter, _provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]))
        .respond(InvokeResponse::new(500, None));

    begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(shown_cards(&adapter), 1);
    let posted = harness.client.posted_activities();
    assert_eq!(posted.len(), 2);
    assert!(posted[1].is_type(activity_types::INVOKE));
}

#[tokio::test]
#[traced_test]
async fn undeliverable_token_invoke_is_logged_and_card_shown() {
    let harness = Harness::new();
    let (adapter, _provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]))
        .fail("connection reset");

    let status = begin(&harness, &adapter, Some("graph")).await;

    assert_eq!(status, DialogTurnStatus::Waiting);
    assert_eq!(shown_cards(&adapter), 1);
    assert!(logs_contain("transport_failed"));
}

#[tokio::test]
async fn continue_uses_connection_stored_at_begin() {
    let harness = Harness::new();
    let (adapter, provider) = adapter_with_tokens(TokenBehavior::Token("tok-123".into()));
    let mut state = DialogState::default();

    let first = turn(&adapter, expect_replies(user_message("start")));
    let options = BeginSkillDialogOptions::new(first.activity().clone()).with_connection_name("graph");
    DialogContext::new(&first, &mut state)
        .begin_dialog(&harness.dialog, Some(options))
        .await
        .unwrap();

    harness
        .client
        .respond(replies(vec![oauth_card_reply("skill-conn", Some(CARD_URI))]))
        .respond(InvokeResponse::ok());
    let second = turn(&adapter, user_message("show my mail"));
    DialogContext::new(&second, &mut state)
        .continue_dialog(&harness.dialog)
        .await
        .unwrap();

    assert_eq!(shown_cards(&adapter), 0);
    assert_eq!(provider.calls()[0].connection_name, "graph");
}
