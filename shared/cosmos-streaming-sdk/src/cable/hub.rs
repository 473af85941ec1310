//! Connection sharing

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use cosmos_core::DataSourceSettings;
use tokio::sync::Mutex;
use tracing::debug;

use super::connection::CableConnection;
use super::protocol::cable_url;
use crate::channel::{ChannelSubscription, PushChannel};
use crate::Result;

/// Hands out subscriptions on shared cable connections.
///
/// Keeps only weak references: a connection lives as long as some
/// subscription holds it. Opens are serialized so concurrent subscribers
/// for the same endpoint end up on one socket.
pub struct CableHub {
    api_base_url: String,
    timeout: Duration,
    connections: Mutex<HashMap<(String, String), Weak<CableConnection>>>,
}

impl CableHub {
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            timeout,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &DataSourceSettings) -> Self {
        Self::new(settings.api_base_url(), Duration::from_secs(settings.timeout_secs))
    }

    /// Connections still held by at least one subscription
    pub async fn active_connections(&self) -> usize {
        self.connections
            .lock()
            .await
            .values()
            .filter_map(Weak::upgrade)
            .filter(|c| !c.is_closed())
            .count()
    }
}

#[async_trait]
impl PushChannel for CableHub {
    async fn subscribe(&self, scope: &str, token: &str) -> Result<ChannelSubscription> {
        let url = cable_url(&self.api_base_url, scope, token)?;
        let mut endpoint = url.clone();
        endpoint.set_query(None);
        let key = (endpoint.to_string(), scope.to_string());

        let mut connections = self.connections.lock().await;
        let live = connections
            .get(&key)
            .and_then(Weak::upgrade)
            .filter(|c| !c.is_closed());
        let connection = match live {
            Some(connection) => {
                debug!(scope = %scope, subscriptions = connection.subscriptions(), "Reusing cable connection");
                connection
            }
            None => {
                let connection = CableConnection::open(&url, self.timeout).await?;
                connections.retain(|_, weak| weak.strong_count() > 0);
                connections.insert(key, Arc::downgrade(&connection));
                connection
            }
        };
        drop(connections);

        connection.subscribe()
    }
}
