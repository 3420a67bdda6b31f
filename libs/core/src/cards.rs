use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::activity::{Activity, Attachment};

pub const OAUTH_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.oauth";

/// Sign-in card a skill sends when it needs a user token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub connection_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_exchange_resource: Option<TokenExchangeResource>,
}

impl OAuthCard {
    /// Returns the exchange resource when it carries a usable URI.
    pub fn exchangeable_resource(&self) -> Option<&TokenExchangeResource> {
        self.token_exchange_resource
            .as_ref()
            .filter(|resource| resource.uri.as_deref().is_some_and(|uri| !uri.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl Attachment {
    pub fn is_oauth_card(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .starts_with(OAUTH_CARD_CONTENT_TYPE)
    }

    /// Parses the content as an [`OAuthCard`] when the content type says it is one.
    pub fn oauth_card(&self) -> Option<Result<OAuthCard, serde_json::Error>> {
        self.is_oauth_card()
            .then(|| serde_json::from_value(self.content.clone()))
    }

    pub fn from_oauth_card(card: &OAuthCard) -> Result<Self, serde_json::Error> {
        Ok(Self {
            content_type: OAUTH_CARD_CONTENT_TYPE.to_string(),
            content: serde_json::to_value(card)?,
            content_url: None,
            name: None,
            thumbnail_url: None,
        })
    }
}

pub fn contains_oauth_card(activity: &Activity) -> bool {
    activity.attachments.iter().any(Attachment::is_oauth_card)
}
