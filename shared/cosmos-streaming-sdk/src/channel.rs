//! Push channel abstraction
//!
//! A [`PushChannel`] opens `StreamingChannel` subscriptions. Each
//! [`ChannelSubscription`] owns the receiving end of its event queue and a
//! handle for sending commands back over the shared connection.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::Result;

/// Events routed to one subscription
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Server confirmed the subscription; interest may now be registered
    Confirmed,
    Rejected,
    /// Payload of a server push
    Message(Value),
    Disconnected(String),
}

/// Commands a subscription sends to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Subscribe { identifier: String },
    Perform { identifier: String, action: String, data: Value },
    Unsubscribe { identifier: String },
}

/// Outbound half of a connection
pub trait CommandSink: Send + Sync {
    fn send_command(&self, command: ClientCommand) -> Result<()>;
}

#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Subscribe to `StreamingChannel` on a connection authorized for `scope` and `token`
    async fn subscribe(&self, scope: &str, token: &str) -> Result<ChannelSubscription>;
}

pub struct ChannelSubscription {
    identifier: String,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    outbound: Arc<dyn CommandSink>,
    active: bool,
}

impl ChannelSubscription {
    pub fn new(
        identifier: String,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
        outbound: Arc<dyn CommandSink>,
    ) -> Self {
        Self {
            identifier,
            events,
            outbound,
            active: true,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `None` once the connection has gone away
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }

    /// ActionCable `perform(action, data)`
    pub fn perform(&self, action: &str, data: Value) -> Result<()> {
        self.outbound.send_command(ClientCommand::Perform {
            identifier: self.identifier.clone(),
            action: action.to_string(),
            data,
        })
    }

    /// Stop server-side pushes. Later calls do nothing.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.events.close();
        if let Err(e) = self.outbound.send_command(ClientCommand::Unsubscribe {
            identifier: self.identifier.clone(),
        }) {
            // Connection already gone, nothing left to unregister
            trace!(identifier = %self.identifier, error = %e, "Unsubscribe not delivered");
        }
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Command sink that records everything it is given
    #[derive(Default)]
    pub struct RecordingSink {
        commands: Mutex<Vec<ClientCommand>>,
    }

    impl RecordingSink {
        pub fn commands(&self) -> Vec<ClientCommand> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl CommandSink for RecordingSink {
        fn send_command(&self, command: ClientCommand) -> Result<()> {
            self.commands.lock().unwrap().push(command);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_perform_and_unsubscribe_once() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = ChannelSubscription::new("id-1".to_string(), rx, sink.clone());

        tx.send(ChannelEvent::Confirmed).unwrap();
        assert_eq!(subscription.next_event().await, Some(ChannelEvent::Confirmed));

        subscription.perform("add", json!({ "scope": "DEFAULT" })).unwrap();
        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);

        assert_eq!(
            sink.commands(),
            vec![
                ClientCommand::Perform {
                    identifier: "id-1".to_string(),
                    action: "add".to_string(),
                    data: json!({ "scope": "DEFAULT" }),
                },
                ClientCommand::Unsubscribe {
                    identifier: "id-1".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let sink = Arc::new(RecordingSink::default());
        let (_tx, rx) = mpsc::unbounded_channel();
        drop(ChannelSubscription::new("id-2".to_string(), rx, sink.clone()));

        assert_eq!(
            sink.commands(),
            vec![ClientCommand::Unsubscribe {
                identifier: "id-2".to_string()
            }]
        );
    }
}
