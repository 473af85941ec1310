//! Credential state owned by one data source instance

use std::sync::Arc;

use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialState {
    pub token: String,
    pub refresh_token: String,
    /// `exp` claim of `token`; 0 when the token carries none
    pub expiry_epoch_seconds: i64,
}

/// Shared handle to the current tokens.
///
/// Readers clone the handle freely; only [`crate::CredentialProvider`] writes.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<CredentialState>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<CredentialState> {
        self.inner.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|state| state.token.clone())
    }

    pub(crate) fn replace(&self, state: CredentialState) {
        *self.inner.write() = Some(state);
    }

    pub(crate) fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let store = CredentialStore::new();
        let reader = store.clone();
        assert!(reader.token().is_none());

        store.replace(CredentialState {
            token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expiry_epoch_seconds: 42,
        });
        assert_eq!(reader.token().as_deref(), Some("access"));
        assert_eq!(reader.get().unwrap().expiry_epoch_seconds, 42);

        store.clear();
        assert!(reader.get().is_none());
    }
}
