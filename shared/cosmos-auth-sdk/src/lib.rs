//! COSMOS Auth SDK
//!
//! Obtains bearer tokens for the COSMOS API, either from a Keycloak password
//! grant or from a static API key, and refreshes them before they expire.

mod error;
mod jwt;
mod provider;
mod store;

pub use error::{AuthError, Result};
pub use jwt::{needs_refresh, token_expiry, REFRESH_MARGIN_SECS};
pub use provider::{AuthConfig, CredentialProvider, Credentials, TokenProvider};
pub use store::{CredentialState, CredentialStore};

/// Re-export for convenience
pub mod prelude {
    pub use super::{AuthError, CredentialProvider, CredentialStore, Result, TokenProvider};
}
