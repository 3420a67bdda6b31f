use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use skillgate_core::{ExtendedUserTokenProvider, TokenExchangeRequest, TokenResponse, TurnContext};

#[derive(Debug, Clone)]
pub enum TokenBehavior {
    /// Exchange succeeds with this token.
    Token(String),
    /// The token service has nothing for the user.
    NoToken,
    /// The exchange raises.
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCall {
    pub connection_name: String,
    pub user_id: String,
    pub uri: Option<String>,
}

pub struct StaticTokenProvider {
    behavior: TokenBehavior,
    calls: Mutex<Vec<ExchangeCall>>,
}

impl StaticTokenProvider {
    pub fn new(behavior: TokenBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::new(TokenBehavior::Token(token.into()))
    }

    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().expect("lock calls").clone()
    }
}

#[async_trait]
impl ExtendedUserTokenProvider for StaticTokenProvider {
    async fn exchange_token(
        &self,
        _turn: &TurnContext,
        connection_name: &str,
        user_id: &str,
        request: &TokenExchangeRequest,
    ) -> anyhow::Result<Option<TokenResponse>> {
        self.calls.lock().expect("lock calls").push(ExchangeCall {
            connection_name: connection_name.to_string(),
            user_id: user_id.to_string(),
            uri: request.uri.clone(),
        });
        match &self.behavior {
            TokenBehavior::Token(token) => Ok(Some(TokenResponse {
                channel_id: None,
                connection_name: connection_name.to_string(),
                token: token.clone(),
                expiration: None,
            })),
            TokenBehavior::NoToken => Ok(None),
            TokenBehavior::Fail(message) => Err(anyhow!(message.clone())),
        }
    }
}
