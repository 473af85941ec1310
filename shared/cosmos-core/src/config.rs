//! Data source settings
//!
//! Mirrors the JSON the dashboard host stores for one data source instance.

use crate::error::{CosmosError, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_COSMOS_URL: &str = "http://localhost:2900";
pub const DEFAULT_KEYCLOAK_URL: &str = "http://localhost:2900/auth";
pub const DEFAULT_SCOPE: &str = "DEFAULT";
pub const DEFAULT_REALM: &str = "openc3";
pub const DEFAULT_CLIENT_ID: &str = "api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSettings {
    /// COSMOS API root
    #[serde(default = "default_cosmos_url")]
    pub cosmos_url: String,
    /// Identity provider root
    #[serde(default = "default_keycloak_url")]
    pub keycloak_url: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Empty username means `password` is a static API key
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cosmos_url() -> String {
    DEFAULT_COSMOS_URL.to_string()
}

fn default_keycloak_url() -> String {
    DEFAULT_KEYCLOAK_URL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_realm() -> String {
    DEFAULT_REALM.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DataSourceSettings {
    pub fn new(cosmos_url: impl Into<String>) -> Self {
        Self {
            cosmos_url: cosmos_url.into(),
            keycloak_url: String::new(),
            client_id: default_client_id(),
            realm: default_realm(),
            scope: default_scope(),
            username: String::new(),
            password: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_env() -> Result<Self> {
        let settings = Self {
            cosmos_url: env::var("COSMOS_URL").unwrap_or_else(|_| default_cosmos_url()),
            keycloak_url: env::var("KEYCLOAK_URL").unwrap_or_else(|_| default_keycloak_url()),
            client_id: env::var("COSMOS_CLIENT_ID").unwrap_or_else(|_| default_client_id()),
            realm: env::var("COSMOS_REALM").unwrap_or_else(|_| default_realm()),
            scope: env::var("COSMOS_SCOPE").unwrap_or_else(|_| default_scope()),
            username: env::var("COSMOS_USERNAME").unwrap_or_default(),
            password: env::var("COSMOS_PASSWORD").unwrap_or_default(),
            timeout_secs: env::var("COSMOS_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|e| CosmosError::Config(format!("Invalid COSMOS_TIMEOUT_SECS: {}", e)))?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let settings: Self = serde_json::from_value(json.clone())
            .map_err(|e| CosmosError::Config(format!("Invalid data source settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_keycloak(mut self, url: impl Into<String>, realm: impl Into<String>, client_id: impl Into<String>) -> Self {
        self.keycloak_url = url.into();
        self.realm = realm.into();
        self.client_id = client_id.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// `cosmos_url` without a trailing slash, assuming `http` when no scheme is given
    pub fn api_base_url(&self) -> String {
        let url = self.cosmos_url.trim().trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        }
    }

    /// True when a username is configured and tokens come from the identity provider
    pub fn uses_password_grant(&self) -> bool {
        !self.username.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.cosmos_url.trim().is_empty() {
            return Err(CosmosError::Config("cosmosUrl must not be empty".to_string()));
        }
        if self.scope.trim().is_empty() {
            return Err(CosmosError::Config("scope must not be empty".to_string()));
        }
        if self.uses_password_grant() && self.keycloak_url.trim().is_empty() {
            return Err(CosmosError::Config(
                "keycloakUrl is required when a username is configured".to_string(),
            ));
        }
        Ok(())
    }
}
