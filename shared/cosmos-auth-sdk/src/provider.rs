//! Credential Provider
//!
//! Keycloak password grant plus the static API key fallback.

use std::time::Duration;

use async_trait::async_trait;
use cosmos_core::{error_detail_from_text, DataSourceSettings};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::jwt::{needs_refresh, token_expiry};
use crate::store::{CredentialState, CredentialStore};
use crate::{AuthError, Result};

/// Source of bearer tokens for API and cable requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Last known token, without touching the network. Empty before the first login.
    fn current_token(&self) -> String;

    /// Log in again if the current token is missing or about to expire
    async fn ensure_fresh(&self) -> Result<()>;
}

/// Identity provider location
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub issuer_url: String,
    pub realm: String,
    pub client_id: String,
    pub timeout: Duration,
}

impl AuthConfig {
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.issuer_url.trim_end_matches('/'),
            self.realm
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Password { username: String, password: String },
    /// Used verbatim as the `Authorization` value
    ApiKey(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

pub struct CredentialProvider {
    http: Client,
    config: AuthConfig,
    credentials: Credentials,
    store: CredentialStore,
    /// Serializes concurrent logins from sessions opening at the same time
    login_lock: Mutex<()>,
}

impl CredentialProvider {
    pub fn new(config: AuthConfig, credentials: Credentials, store: CredentialStore) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            credentials,
            store,
            login_lock: Mutex::new(()),
        })
    }

    pub fn from_settings(settings: &DataSourceSettings, store: CredentialStore) -> Result<Self> {
        let config = AuthConfig {
            issuer_url: settings.keycloak_url.clone(),
            realm: settings.realm.clone(),
            client_id: settings.client_id.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        };
        let credentials = if settings.uses_password_grant() {
            Credentials::Password {
                username: settings.username.clone(),
                password: settings.password.clone(),
            }
        } else {
            Credentials::ApiKey(settings.password.clone())
        };
        Self::new(config, credentials, store)
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Password grant against the identity provider. No-op for API keys.
    pub async fn login(&self) -> Result<()> {
        let (username, password) = match &self.credentials {
            Credentials::Password { username, password } => (username, password),
            Credentials::ApiKey(_) => return Ok(()),
        };

        let params = [
            ("username", username.as_str()),
            ("password", password.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "password"),
            ("scope", "openid"),
        ];

        debug!(username = %username, realm = %self.config.realm, "Requesting access token");

        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AuthError::Rejected {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Login failed")
                    .to_string(),
                detail: error_detail_from_text(&body),
            };
            warn!(error = %err, "Login failed");
            return Err(err);
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let expiry = token_expiry(&tokens.access_token).unwrap_or_default();
        self.store.replace(CredentialState {
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expiry_epoch_seconds: expiry,
        });

        info!(username = %username, expires_at = expiry, "Logged in");
        Ok(())
    }

    /// [`TokenProvider::ensure_fresh`] against an explicit clock reading
    pub async fn ensure_fresh_at(&self, now_epoch_secs: i64) -> Result<()> {
        if matches!(self.credentials, Credentials::ApiKey(_)) {
            return Ok(());
        }
        if !self.token_is_stale(now_epoch_secs) {
            return Ok(());
        }

        let _guard = self.login_lock.lock().await;
        // Another caller may have logged in while we waited
        if !self.token_is_stale(now_epoch_secs) {
            return Ok(());
        }

        debug!("Access token missing or near expiry, logging in");
        if let Err(err) = self.login().await {
            self.store.clear();
            return Err(err);
        }
        Ok(())
    }

    fn token_is_stale(&self, now_epoch_secs: i64) -> bool {
        match self.store.token() {
            // Undecodable tokens are treated as expired
            Some(token) => match token_expiry(&token) {
                Some(exp) => needs_refresh(exp, now_epoch_secs),
                None => true,
            },
            None => true,
        }
    }
}

#[async_trait]
impl TokenProvider for CredentialProvider {
    fn current_token(&self) -> String {
        match &self.credentials {
            Credentials::ApiKey(key) => key.clone(),
            Credentials::Password { .. } => self.store.token().unwrap_or_default(),
        }
    }

    async fn ensure_fresh(&self) -> Result<()> {
        self.ensure_fresh_at(chrono::Utc::now().timestamp()).await
    }
}
