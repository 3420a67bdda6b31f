use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use metrics::{counter, histogram};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::activity::{Activity, ChannelAccount, ConversationAccount, ConversationReference};

const CALLER_ID_PREFIX: &str = "urn:botframework:aadappid:";
const MAX_ERROR_BODY: usize = 512;

/// Status and body returned by a skill endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InvokeResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn ok() -> Self {
        Self::new(200, None)
    }

    pub fn is_success_status_code(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body as a value, ignoring absent and `null` bodies.
    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref().filter(|body| !body.is_null())
    }

    /// Body rendered for diagnostics, truncated.
    pub fn body_text(&self) -> String {
        let text = match self.body_value() {
            None => String::new(),
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
        };
        if text.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text[..cut].to_string()
        } else {
            text
        }
    }
}

#[derive(Debug, Error)]
pub enum SkillClientError {
    #[error("skill client configuration error")]
    Config(#[source] anyhow::Error),
    #[error("skill credentials unavailable for app {app_id}")]
    Credentials {
        app_id: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("skill transport error")]
    Transport(#[source] reqwest::Error),
}

/// Posts activities to skill endpoints.
#[async_trait]
pub trait SkillClient: Send + Sync {
    /// Non-2xx statuses are returned in the response; only transport failures are errors.
    async fn post_activity(
        &self,
        from_bot_id: &str,
        to_bot_id: &str,
        to_url: &str,
        service_url: &str,
        conversation_id: &str,
        activity: &Activity,
    ) -> Result<InvokeResponse, SkillClientError>;
}

pub type SharedSkillClient = Arc<dyn SkillClient>;

/// Supplies bearer tokens for calls to a skill's app id.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token_for(&self, app_id: &str) -> anyhow::Result<Option<String>>;
}

/// Same bearer token for every skill; `None` disables authentication.
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token_for(&self, _app_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// HTTP transport to skill endpoints.
pub struct HttpSkillClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpSkillClient {
    pub fn new(client: Client, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    pub fn anonymous(client: Client) -> Self {
        Self::new(client, Arc::new(StaticCredentials::anonymous()))
    }
}

/// Rewrites a copy of `activity` so the skill sees the skill conversation and
/// can reply through `service_url`.
pub fn prepare_skill_activity(
    from_bot_id: &str,
    to_bot_id: &str,
    service_url: &str,
    conversation_id: &str,
    activity: &Activity,
) -> Activity {
    let mut outbound = activity.clone();
    outbound.relates_to = Some(Box::new(ConversationReference {
        activity_id: activity.id.clone(),
        user: None,
        bot: None,
        conversation: activity.conversation.clone(),
        channel_id: activity.channel_id.clone(),
        locale: activity.locale.clone(),
        service_url: activity.service_url.clone(),
    }));

    let mut conversation = activity
        .conversation
        .clone()
        .unwrap_or_else(|| ConversationAccount::new(""));
    conversation.id = conversation_id.to_string();
    outbound.conversation = Some(conversation);
    outbound.service_url = Some(service_url.to_string());
    outbound.caller_id = Some(format!("{CALLER_ID_PREFIX}{from_bot_id}"));

    let recipient = outbound
        .recipient
        .get_or_insert_with(|| ChannelAccount::new(to_bot_id));
    recipient.role = Some("skill".to_string());
    outbound
}

#[async_trait]
impl SkillClient for HttpSkillClient {
    async fn post_activity(
        &self,
        from_bot_id: &str,
        to_bot_id: &str,
        to_url: &str,
        service_url: &str,
        conversation_id: &str,
        activity: &Activity,
    ) -> Result<InvokeResponse, SkillClientError> {
        let url = Url::parse(to_url).map_err(|err| SkillClientError::Config(err.into()))?;
        let token = self
            .credentials
            .token_for(to_bot_id)
            .await
            .map_err(|source| SkillClientError::Credentials {
                app_id: to_bot_id.to_string(),
                source,
            })?;

        let outbound =
            prepare_skill_activity(from_bot_id, to_bot_id, service_url, conversation_id, activity);

        let mut request = self.client.post(url).json(&outbound);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            counter!("skill_client_errors_total", "kind" => "transport").increment(1);
            SkillClientError::Transport(err)
        })?;

        let status = response.status();
        histogram!(
            "skill_client_roundtrip_seconds",
            "status" => status.as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        let raw = response.text().await.map_err(|err| {
            counter!("skill_client_errors_total", "kind" => "body").increment(1);
            SkillClientError::Transport(err)
        })?;
        debug!(
            status = status.as_u16(),
            conversation_id,
            activity_type = activity.r#type.as_str(),
            "skill responded"
        );

        Ok(InvokeResponse::new(status.as_u16(), parse_body(status, &raw)))
    }
}

fn parse_body(status: StatusCode, raw: &str) -> Option<Value> {
    if raw.trim().is_empty() || status == StatusCode::NO_CONTENT {
        return None;
    }
    Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}
