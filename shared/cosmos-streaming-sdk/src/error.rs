//! Error types for the streaming SDK

use cosmos_auth_sdk::AuthError;
use cosmos_core::CosmosError;

/// Result type alias
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Push channel failures. Each one is fatal to the subscription it hits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Subscription rejected: {0}")]
    Rejected(String),

    #[error("Channel disconnected: {0}")]
    Disconnected(String),

    #[error("Malformed push message: {0}")]
    Decode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid subscription key: {0}")]
    InvalidKey(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

/// Why a subscription ended early
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::Protocol(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::Connect(err.to_string())
    }
}

impl From<ChannelError> for CosmosError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::InvalidKey(msg) => CosmosError::Validation(msg),
            other => CosmosError::Channel(other.to_string()),
        }
    }
}

impl From<SubscriptionError> for CosmosError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::Auth(auth) => auth.into(),
            SubscriptionError::Channel(channel) => channel.into(),
        }
    }
}
