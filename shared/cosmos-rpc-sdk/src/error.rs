//! Error types for the RPC SDK

use cosmos_auth_sdk::AuthError;
use cosmos_core::CosmosError;

/// Result type alias
pub type Result<T> = std::result::Result<T, RpcError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    /// Transport failure (`status` is `None`) or a non-success HTTP status
    #[error("{message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    /// The response envelope carried an `error` member
    #[error("Remote error: {message}")]
    Remote { message: String },

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Unexpected result shape: {0}")]
    Decode(String),
}

impl RpcError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Auth(err) => err.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Http {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

impl From<RpcError> for CosmosError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Auth(auth) => auth.into(),
            RpcError::Remote { message } => CosmosError::Remote(message),
            other => CosmosError::Rpc {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
