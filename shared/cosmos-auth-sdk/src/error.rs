//! Error types for the auth SDK

use cosmos_core::CosmosError;

/// Result type alias
pub type Result<T> = std::result::Result<T, AuthError>;

/// Identity provider failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Login rejected ({status}): {message}{}", fmt_detail(.detail))]
    Rejected {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default()
}

impl AuthError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Secondary message supplied by the identity provider, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

impl From<AuthError> for CosmosError {
    fn from(err: AuthError) -> Self {
        CosmosError::Auth {
            status: err.status(),
            message: err.to_string(),
        }
    }
}
