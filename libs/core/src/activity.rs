use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// Activity type names understood by the forwarding layer.
pub mod activity_types {
    pub const MESSAGE: &str = "message";
    pub const EVENT: &str = "event";
    pub const INVOKE: &str = "invoke";
    pub const END_OF_CONVERSATION: &str = "endOfConversation";
    pub const TRACE: &str = "trace";
}

pub const TRACE_VALUE_TYPE: &str = "https://www.botframework.com/schemas/trace";

/// How replies to an activity are delivered back to the sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// Replies arrive asynchronously through the host's callback endpoint.
    #[default]
    Normal,
    Notification,
    /// Replies are returned synchronously in the response body.
    ExpectReplies,
    Ephemeral,
}

/// Bot Framework activity exchanged between the root bot, the channel and skills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<DeliveryMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<Box<ConversationReference>>,
    /// Fields this model does not name explicitly; preserved verbatim on the wire.
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl Activity {
    /// Creates a new activity with the provided type and empty payload.
    pub fn new(r#type: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            id: None,
            name: None,
            timestamp: None,
            service_url: None,
            channel_id: None,
            from: None,
            recipient: None,
            conversation: None,
            text: None,
            attachments: Vec::new(),
            entities: Vec::new(),
            channel_data: None,
            value: None,
            value_type: None,
            label: None,
            locale: None,
            reply_to_id: None,
            delivery_mode: None,
            caller_id: None,
            relates_to: None,
            additional_properties: Map::new(),
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        let mut activity = Self::new(activity_types::MESSAGE);
        activity.text = Some(text.into());
        activity
    }

    pub fn event(name: impl Into<String>) -> Self {
        let mut activity = Self::new(activity_types::EVENT);
        activity.name = Some(name.into());
        activity
    }

    pub fn end_of_conversation() -> Self {
        Self::new(activity_types::END_OF_CONVERSATION)
    }

    /// Builds a `trace` activity; channels other than the emulator drop these.
    pub fn trace(name: impl Into<String>, label: Option<String>, value: Option<Value>) -> Self {
        let mut activity = Self::new(activity_types::TRACE);
        activity.name = Some(name.into());
        activity.label = label;
        activity.value = value;
        activity.value_type = Some(TRACE_VALUE_TYPE.to_string());
        activity.timestamp = Some(OffsetDateTime::now_utc());
        activity
    }

    pub fn is_type(&self, r#type: &str) -> bool {
        self.r#type.eq_ignore_ascii_case(r#type)
    }

    pub fn is_end_of_conversation(&self) -> bool {
        self.is_type(activity_types::END_OF_CONVERSATION)
    }

    pub fn expects_replies(&self) -> bool {
        self.delivery_mode == Some(DeliveryMode::ExpectReplies)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .map(|conversation| conversation.id.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    pub fn from_id(&self) -> Option<&str> {
        self.from
            .as_ref()
            .map(|account| account.id.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    /// Captures the routing information needed to address this conversation later.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            activity_id: self.id.clone(),
            user: self.from.clone(),
            bot: self.recipient.clone(),
            conversation: self.conversation.clone(),
            channel_id: self.channel_id.clone(),
            locale: self.locale.clone(),
            service_url: self.service_url.clone(),
        }
    }

    /// Stamps routing fields from `reference` onto this activity.
    ///
    /// With `is_incoming` the activity is addressed as if the user had sent it
    /// to the bot (`from = user`, `recipient = bot`, `id = activityId`);
    /// otherwise it is addressed as a bot reply to that activity.
    pub fn apply_conversation_reference(
        &mut self,
        reference: &ConversationReference,
        is_incoming: bool,
    ) {
        self.channel_id = reference.channel_id.clone();
        self.service_url = reference.service_url.clone();
        self.conversation = reference.conversation.clone();
        if reference.locale.is_some() {
            self.locale = reference.locale.clone();
        }

        if is_incoming {
            self.from = reference.user.clone();
            self.recipient = reference.bot.clone();
            if reference.activity_id.is_some() {
                self.id = reference.activity_id.clone();
            }
        } else {
            self.from = reference.bot.clone();
            self.recipient = reference.user.clone();
            if reference.activity_id.is_some() {
                self.reply_to_id = reference.activity_id.clone();
            }
        }
    }

    /// Creates a message addressed back to the sender of this activity.
    pub fn create_reply(&self) -> Activity {
        let mut reply = Activity::new(activity_types::MESSAGE);
        reply.timestamp = Some(OffsetDateTime::now_utc());
        reply.from = self.recipient.as_ref().map(ChannelAccount::without_role);
        reply.recipient = self.from.as_ref().map(ChannelAccount::without_role);
        reply.reply_to_id = self.id.clone();
        reply.service_url = self.service_url.clone();
        reply.channel_id = self.channel_id.clone();
        reply.conversation = self.conversation.clone();
        reply.locale = self.locale.clone();
        reply.text = Some(String::new());
        reply
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            role: None,
        }
    }

    fn without_role(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            role: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl ConversationAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Routing information for a conversation, as seen from one specific activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<ChannelAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

/// Body returned by a skill when the request used [`DeliveryMode::ExpectReplies`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedReplies {
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inbound() -> Activity {
        serde_json::from_value(json!({
            "type": "message",
            "id": "act-1",
            "channelId": "msteams",
            "serviceUrl": "https://smba.example/",
            "from": {"id": "user-1", "name": "Ada", "role": "user"},
            "recipient": {"id": "root-bot", "role": "bot"},
            "conversation": {"id": "conv-1"},
            "locale": "en-US",
            "text": "hi",
            "deliveryMode": "expectReplies",
            "x-custom": {"keep": true}
        }))
        .unwrap()
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let activity = inbound();
        assert_eq!(
            activity.additional_properties.get("x-custom"),
            Some(&json!({"keep": true}))
        );
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["x-custom"]["keep"], json!(true));
        assert_eq!(value["deliveryMode"], json!("expectReplies"));
        assert!(value.get("replyToId").is_none());
    }

    #[test]
    fn incoming_reference_addresses_user_to_bot() {
        let source = inbound();
        let mut forwarded = Activity::event("ping");
        forwarded.apply_conversation_reference(&source.conversation_reference(), true);

        assert_eq!(forwarded.from_id(), Some("user-1"));
        assert_eq!(forwarded.recipient.as_ref().unwrap().id, "root-bot");
        assert_eq!(forwarded.id.as_deref(), Some("act-1"));
        assert_eq!(forwarded.conversation_id(), Some("conv-1"));
        assert_eq!(forwarded.service_url.as_deref(), Some("https://smba.example/"));
        assert_eq!(forwarded.locale.as_deref(), Some("en-US"));
        assert!(forwarded.reply_to_id.is_none());
    }

    #[test]
    fn outgoing_reference_addresses_bot_to_user() {
        let source = inbound();
        let mut reply = Activity::message("hello");
        reply.apply_conversation_reference(&source.conversation_reference(), false);

        assert_eq!(reply.from_id(), Some("root-bot"));
        assert_eq!(reply.recipient.as_ref().unwrap().id, "user-1");
        assert_eq!(reply.reply_to_id.as_deref(), Some("act-1"));
        assert!(reply.id.is_none());
    }

    #[test]
    fn create_reply_swaps_accounts() {
        let source = inbound();
        let reply = source.create_reply();
        assert!(reply.is_type(activity_types::MESSAGE));
        assert_eq!(reply.from_id(), Some("root-bot"));
        assert_eq!(reply.recipient.as_ref().unwrap().id, "user-1");
        assert!(reply.recipient.as_ref().unwrap().role.is_none());
        assert_eq!(reply.reply_to_id.as_deref(), Some("act-1"));
        assert_eq!(reply.conversation_id(), Some("conv-1"));
        assert!(reply.delivery_mode.is_none());
        assert!(reply.timestamp.is_some());
    }

    #[test]
    fn end_of_conversation_type_matches_case_insensitively() {
        let mut activity = Activity::new("EndOfConversation");
        assert!(activity.is_end_of_conversation());
        activity.r#type = activity_types::MESSAGE.into();
        assert!(!activity.is_end_of_conversation());
    }

    #[test]
    fn expected_replies_preserve_order() {
        let replies: ExpectedReplies = serde_json::from_value(json!({
            "activities": [
                {"type": "message", "text": "one"},
                {"type": "message", "text": "two"},
                {"type": "endOfConversation", "value": {"done": true}}
            ]
        }))
        .unwrap();
        let texts: Vec<_> = replies
            .activities
            .iter()
            .map(|a| a.text.clone().unwrap_or_default())
            .collect();
        assert_eq!(texts, vec!["one", "two", ""]);
        assert!(replies.activities[2].is_end_of_conversation());
    }

    #[test]
    fn partially_filled_accounts_and_attachments_parse() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "message",
            "text": "second",
            "from": {"name": "Skill"},
            "conversation": {"name": "skill chat"},
            "attachments": [{"content": {"title": "card"}}]
        }))
        .unwrap();
        assert_eq!(activity.from.as_ref().unwrap().name.as_deref(), Some("Skill"));
        assert_eq!(activity.from_id(), None);
        assert_eq!(activity.conversation_id(), None);
        assert_eq!(activity.attachments[0].content_type, "");
    }
}
