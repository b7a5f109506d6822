//! OAuth2 token management for the DAM API.
//!
//! Tracks one access token per process: `Unauthenticated` →
//! `Authenticated(token, expiry)` → expired. Expired tokens are
//! refreshed transparently when a refresh token is held; manually
//! supplied (pre-issued / service-account) tokens are flagged and
//! never refreshed — attempting to is a programming error and fails
//! loudly before any network call.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use damlink_core::error::CoreError;
use damlink_core::types::Timestamp;

use crate::error::DamError;

/// A persisted token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Timestamp,
}

/// Persistence seam for per-user OAuth tokens. The manager only keeps
/// token state in memory for the lifetime of one process; durable
/// storage belongs to the host system's credential store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredTokens>, CoreError>;
    async fn save(&self, tokens: &StoredTokens) -> Result<(), CoreError>;
    async fn clear(&self) -> Result<(), CoreError>;
}

/// OAuth2 endpoint and client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Token endpoint URL.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Wire shape of a token-endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug)]
enum TokenState {
    Unauthenticated,
    Authenticated { tokens: StoredTokens, manual: bool },
}

/// In-memory OAuth2 session for the DAM.
pub struct TokenManager {
    http: reqwest::Client,
    config: OAuthConfig,
    store: Arc<dyn TokenStore>,
    state: Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, config: OAuthConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            http,
            config,
            store,
            state: Mutex::new(TokenState::Unauthenticated),
        }
    }

    /// Install a pre-issued token (service account). Flagged so that a
    /// later expiry fails with [`DamError::ManualTokenRefresh`] instead
    /// of attempting a refresh that cannot succeed.
    pub async fn set_manual_token(&self, access_token: String, expires_at: Timestamp) {
        let mut state = self.state.lock().await;
        *state = TokenState::Authenticated {
            tokens: StoredTokens {
                access_token,
                refresh_token: None,
                expires_at,
            },
            manual: true,
        };
    }

    /// Resource-owner password grant (service-account login).
    pub async fn authenticate_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), DamError> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", username),
            ("password", password),
        ];
        self.obtain(&params).await
    }

    /// Authorization-code exchange (end-user login).
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<(), DamError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        self.obtain(&params).await
    }

    /// A currently valid bearer token, refreshing transparently if
    /// needed. The token state is re-hydrated from the [`TokenStore`]
    /// on first use in a process.
    pub async fn bearer_token(&self) -> Result<String, DamError> {
        let mut state = self.state.lock().await;

        if matches!(*state, TokenState::Unauthenticated) {
            match self.store.load().await {
                Ok(Some(tokens)) => {
                    *state = TokenState::Authenticated {
                        tokens,
                        manual: false,
                    };
                }
                Ok(None) => {
                    return Err(DamError::InvalidCredentials(
                        "no DAM session; authenticate first".into(),
                    ));
                }
                Err(e) => {
                    return Err(DamError::InvalidCredentials(format!(
                        "token store unavailable: {e}"
                    )));
                }
            }
        }

        let TokenState::Authenticated { tokens, manual } = &*state else {
            unreachable!("state hydrated above");
        };

        if Utc::now() < tokens.expires_at {
            return Ok(tokens.access_token.clone());
        }

        if *manual {
            return Err(DamError::ManualTokenRefresh);
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(DamError::InvalidCredentials(
                "access token expired and no refresh token is held".into(),
            ));
        };

        tracing::debug!("DAM access token expired; refreshing");
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let refreshed = self.request_token(&params).await?;
        let access = refreshed.access_token.clone();
        self.persist(&mut state, refreshed).await;
        Ok(access)
    }

    /// Run a grant request and store the resulting tokens.
    async fn obtain(&self, params: &[(&str, &str)]) -> Result<(), DamError> {
        let tokens = self.request_token(params).await?;
        let mut state = self.state.lock().await;
        self.persist(&mut state, tokens).await;
        Ok(())
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<StoredTokens, DamError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            let body = response.text().await.unwrap_or_default();
            return Err(DamError::InvalidCredentials(format!(
                "token endpoint rejected the grant ({status}): {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DamError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(StoredTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token_response.expires_in),
        })
    }

    /// Update in-memory state and hand the tokens to the store. A
    /// persistence failure is logged, not fatal: the in-memory session
    /// stays usable for the rest of the process.
    async fn persist(&self, state: &mut TokenState, tokens: StoredTokens) {
        if let Err(e) = self.store.save(&tokens).await {
            tracing::warn!(error = %e, "Failed to persist DAM tokens");
        }
        *state = TokenState::Authenticated {
            tokens,
            manual: false,
        };
    }
}
