//! Error types surfaced to the dashboard host

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CosmosError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CosmosError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {message}")]
    Auth { status: Option<u16>, message: String },

    #[error("RPC error: {message}")]
    Rpc { status: Option<u16>, message: String },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CosmosError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Auth { .. } => "AUTH_ERROR",
            Self::Rpc { .. } => "RPC_ERROR",
            Self::Remote(_) => "REMOTE_ERROR",
            Self::Channel(_) => "CHANNEL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Upstream HTTP status, when the failure came from an HTTP exchange
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Rpc { status, .. } => *status,
            _ => None,
        }
    }
}

/// Secondary message from an error body.
///
/// The API answers `{"error": {"message": ..}}` while the identity provider
/// answers `{"error": "..", "error_description": ..}`; both are understood.
pub fn error_detail(body: &serde_json::Value) -> Option<String> {
    if let Some(message) = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Some(message.to_string());
    }
    body.get("error_description")
        .and_then(|d| d.as_str())
        .map(str::to_string)
}

/// Same as [`error_detail`] for a raw response body that may not be JSON
pub fn error_detail_from_text(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| error_detail(&value))
}
