//! A single cable socket and its reader/writer task

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};
use url::Url;

use super::protocol::{decode_frame, encode_command, streaming_identifier, ServerFrame};
use crate::channel::{ChannelEvent, ChannelSubscription, ClientCommand, CommandSink};
use crate::{ChannelError, Result};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Routes = Arc<DashMap<String, mpsc::UnboundedSender<ChannelEvent>>>;

/// Shared cable connection.
///
/// The socket task runs until every handle is dropped or the server goes
/// away; in the latter case each routed subscription gets `Disconnected`.
pub struct CableConnection {
    commands: mpsc::UnboundedSender<ClientCommand>,
    routes: Routes,
}

impl CableConnection {
    /// Connect and wait for the server's welcome
    pub async fn open(url: &Url, timeout: Duration) -> Result<Arc<Self>> {
        let host = url.host_str().unwrap_or_default().to_string();
        debug!(host = %host, "Opening cable connection");

        let (socket, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ChannelError::Connect(format!("timed out connecting to {}", host)))??;
        let (write, mut read) = socket.split();

        tokio::time::timeout(timeout, await_welcome(&mut read))
            .await
            .map_err(|_| ChannelError::Connect(format!("no welcome from {}", host)))??;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let routes: Routes = Arc::new(DashMap::new());
        tokio::spawn(run_socket(write, read, command_rx, routes.clone(), host));

        Ok(Arc::new(Self { commands, routes }))
    }

    /// Register a new `StreamingChannel` subscription on this socket
    pub fn subscribe(self: &Arc<Self>) -> Result<ChannelSubscription> {
        let identifier = streaming_identifier();
        let (events, events_rx) = mpsc::unbounded_channel();
        self.routes.insert(identifier.clone(), events);

        if let Err(e) = self.send_command(ClientCommand::Subscribe {
            identifier: identifier.clone(),
        }) {
            self.routes.remove(&identifier);
            return Err(e);
        }
        Ok(ChannelSubscription::new(identifier, events_rx, self.clone()))
    }

    /// The socket task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn subscriptions(&self) -> usize {
        self.routes.len()
    }
}

impl CommandSink for CableConnection {
    fn send_command(&self, command: ClientCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ChannelError::Disconnected("cable connection closed".to_string()))
    }
}

async fn await_welcome(read: &mut SplitStream<Socket>) -> Result<()> {
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => match decode_frame(&text)? {
                ServerFrame::Welcome => return Ok(()),
                ServerFrame::Disconnect { reason } => {
                    return Err(ChannelError::Rejected(
                        reason.unwrap_or_else(|| "connection refused".to_string()),
                    ))
                }
                frame => trace!(?frame, "Frame before welcome"),
            },
            Message::Close(frame) => {
                return Err(ChannelError::Rejected(
                    frame.map(|f| f.reason.to_string()).unwrap_or_else(|| "connection closed".to_string()),
                ))
            }
            _ => {}
        }
    }
    Err(ChannelError::Disconnected("connection closed before welcome".to_string()))
}

async fn run_socket(
    mut write: SplitSink<Socket, Message>,
    mut read: SplitStream<Socket>,
    mut commands: mpsc::UnboundedReceiver<ClientCommand>,
    routes: Routes,
    host: String,
) {
    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if let ClientCommand::Unsubscribe { identifier } = &command {
                        routes.remove(identifier);
                    }
                    let text = match encode_command(&command) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Dropping unencodable cable command");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        break format!("send failed: {}", e);
                    }
                }
                None => {
                    debug!(host = %host, "Last subscription released, closing cable");
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reason) = dispatch(&text, &routes) {
                        break reason;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "connection lost".to_string(),
            },
        }
    };

    warn!(host = %host, reason = %reason, subscriptions = routes.len(), "Cable connection ended");
    for entry in routes.iter() {
        let _ = entry.value().send(ChannelEvent::Disconnected(reason.clone()));
    }
    routes.clear();
}

/// Route one server frame. Returns a reason when the connection must end.
fn dispatch(text: &str, routes: &Routes) -> Option<String> {
    let frame = match decode_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Ignoring undecodable cable frame");
            return None;
        }
    };

    match frame {
        ServerFrame::Welcome | ServerFrame::Ping => {}
        ServerFrame::Confirm { identifier } => route(routes, &identifier, ChannelEvent::Confirmed),
        ServerFrame::Reject { identifier } => {
            route(routes, &identifier, ChannelEvent::Rejected);
            routes.remove(&identifier);
        }
        ServerFrame::Message { identifier, payload } => {
            route(routes, &identifier, ChannelEvent::Message(payload))
        }
        ServerFrame::Disconnect { reason } => {
            return Some(reason.unwrap_or_else(|| "disconnected by server".to_string()))
        }
        ServerFrame::Unknown(kind) => trace!(kind = %kind, "Ignoring cable frame"),
    }
    None
}

fn route(routes: &Routes, identifier: &str, event: ChannelEvent) {
    match routes.get(identifier) {
        Some(events) => {
            let _ = events.send(event);
        }
        // Late frames for a subscription that already left
        None => trace!(identifier = %identifier, "No route for cable frame"),
    }
}
