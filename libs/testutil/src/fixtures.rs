//! Canned activities for a conversation between one user and the root bot.
use serde_json::json;
use skillgate_core::{
    Activity, Attachment, ChannelAccount, ConversationAccount, DeliveryMode, ExpectedReplies,
    InvokeResponse, OAuthCard, SharedChannelAdapter, TokenExchangeResource, TurnContext,
};

pub const CHANNEL_ID: &str = "test";
pub const CONVERSATION_ID: &str = "conv-1";
pub const USER_ID: &str = "user-1";
pub const BOT_ID: &str = "root-bot";
pub const SERVICE_URL: &str = "https://channel.example.com/";

/// Message from the user to the root bot, as received from the channel.
pub fn user_message(text: &str) -> Activity {
    let mut activity = Activity::message(text);
    activity.id = Some("incoming-1".into());
    activity.channel_id = Some(CHANNEL_ID.into());
    activity.service_url = Some(SERVICE_URL.into());
    activity.conversation = Some(ConversationAccount::new(CONVERSATION_ID));
    activity.from = Some(ChannelAccount::new(USER_ID));
    activity.recipient = Some(ChannelAccount::new(BOT_ID));
    activity
}

pub fn expect_replies(mut activity: Activity) -> Activity {
    activity.delivery_mode = Some(DeliveryMode::ExpectReplies);
    activity
}

pub fn turn(adapter: SharedChannelAdapter, activity: Activity) -> TurnContext {
    TurnContext::new(adapter, activity)
}

/// Reply a skill would buffer for the user.
pub fn skill_message(text: &str) -> Activity {
    let mut activity = Activity::message(text);
    activity.conversation = Some(ConversationAccount::new("skill-conv"));
    activity.from = Some(ChannelAccount::new("skill"));
    activity
}

pub fn skill_end_of_conversation(value: Option<serde_json::Value>) -> Activity {
    let mut activity = Activity::end_of_conversation();
    activity.conversation = Some(ConversationAccount::new("skill-conv"));
    activity.value = value;
    activity
}

/// Skill reply carrying an OAuth card; `uri` is left out when `None`.
pub fn oauth_card_reply(connection_name: &str, uri: Option<&str>) -> Activity {
    let card = OAuthCard {
        text: Some("Please sign in".into()),
        connection_name: connection_name.to_string(),
        buttons: vec![json!({"type": "signin", "title": "Sign in"})],
        token_exchange_resource: Some(TokenExchangeResource {
            id: Some("exchange-1".into()),
            uri: uri.map(str::to_string),
            provider_id: None,
        }),
    };
    let mut activity = skill_message("");
    activity.id = Some("card-1".into());
    activity.attachments = vec![Attachment::from_oauth_card(&card).expect("encode oauth card")];
    activity
}

/// Successful skill response buffering `activities`.
pub fn replies(activities: Vec<Activity>) -> InvokeResponse {
    let body = serde_json::to_value(ExpectedReplies { activities }).expect("encode replies");
    InvokeResponse::new(200, Some(body))
}
