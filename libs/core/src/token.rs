use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activity::Activity;
use crate::turn::{AdapterError, ChannelAdapter, ResourceResponse, SharedChannelAdapter, TurnContext};

/// Invoke name a skill listens on for a silently exchanged token.
pub const TOKEN_EXCHANGE_OPERATION_NAME: &str = "signin/tokenExchange";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TokenExchangeRequest {
    pub fn for_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub connection_name: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// Value of the `signin/tokenExchange` invoke sent to a skill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeInvokeRequest {
    pub id: String,
    pub connection_name: String,
    pub token: String,
}

/// Silent token exchange against the user token service.
#[async_trait]
pub trait ExtendedUserTokenProvider: Send + Sync {
    /// Returns `Ok(None)` when the service has no token for the user.
    async fn exchange_token(
        &self,
        turn: &TurnContext,
        connection_name: &str,
        user_id: &str,
        request: &TokenExchangeRequest,
    ) -> anyhow::Result<Option<TokenResponse>>;
}

pub type SharedTokenProvider = Arc<dyn ExtendedUserTokenProvider>;

/// Client for the Bot Framework user token service.
pub struct TokenServiceClient {
    client: Client,
    base_url: Url,
}

impl TokenServiceClient {
    pub fn new(client: Client, base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).context("invalid token service url")?;
        Ok(Self { client, base_url })
    }

    fn exchange_url(
        &self,
        connection_name: &str,
        user_id: &str,
        channel_id: Option<&str>,
    ) -> anyhow::Result<Url> {
        let mut url = self
            .base_url
            .join("api/usertoken/exchange")
            .context("failed to resolve token exchange endpoint")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("userId", user_id);
            pairs.append_pair("connectionName", connection_name);
            if let Some(channel_id) = channel_id {
                pairs.append_pair("channelId", channel_id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ExtendedUserTokenProvider for TokenServiceClient {
    async fn exchange_token(
        &self,
        turn: &TurnContext,
        connection_name: &str,
        user_id: &str,
        request: &TokenExchangeRequest,
    ) -> anyhow::Result<Option<TokenResponse>> {
        let url = self.exchange_url(
            connection_name,
            user_id,
            turn.activity().channel_id.as_deref(),
        )?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .context("token exchange request failed")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(connection_name, "token service has no token for user");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(anyhow!("token exchange failed ({status}): {body}"));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .context("token exchange decode failed")?;
        Ok(Some(token).filter(|token| !token.token.trim().is_empty()))
    }
}

/// Channel adapter that also advertises the token exchange capability.
pub struct TokenExchangeAdapter {
    inner: SharedChannelAdapter,
    provider: SharedTokenProvider,
}

impl TokenExchangeAdapter {
    pub fn new(inner: SharedChannelAdapter, provider: SharedTokenProvider) -> Self {
        Self { inner, provider }
    }
}

#[async_trait]
impl ChannelAdapter for TokenExchangeAdapter {
    async fn send_activities(
        &self,
        turn: &TurnContext,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, AdapterError> {
        self.inner.send_activities(turn, activities).await
    }

    fn token_provider(&self) -> Option<&dyn ExtendedUserTokenProvider> {
        Some(self.provider.as_ref())
    }
}
