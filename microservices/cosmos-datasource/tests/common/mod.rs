//! Shared fixtures: a scripted ActionCable server and test tokens

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// What the server does once it has answered an `add`
#[derive(Clone, Default)]
pub enum AfterAdd {
    #[default]
    Stay,
    /// Send an ActionCable `disconnect` with this reason
    Disconnect(String),
    /// Drop the TCP stream without a close frame
    DropSocket,
}

/// How the fake server answers
#[derive(Clone, Default)]
pub struct CableScript {
    pub reject: bool,
    /// Sent, in order, after each `add`
    pub pushes: Vec<Value>,
    pub after_add: AfterAdd,
}

#[derive(Default)]
pub struct CableLog {
    /// Request URI of every accepted socket
    pub connections: Mutex<Vec<String>>,
    /// Every client command, decoded
    pub commands: Mutex<Vec<Value>>,
}

impl CableLog {
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<Value> {
        self.commands.lock().unwrap().clone()
    }

    pub fn commands_named(&self, name: &str) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter(|c| c["command"] == name)
            .collect()
    }

    /// `data` of every `add` action
    pub fn adds(&self) -> Vec<Value> {
        self.commands_named("message")
            .into_iter()
            .map(|c| serde_json::from_str::<Value>(c["data"].as_str().unwrap()).unwrap())
            .filter(|data| data["action"] == "add")
            .collect()
    }
}

pub struct CableServer {
    pub url: String,
    pub log: Arc<CableLog>,
}

pub async fn start_cable_server(script: CableScript) -> CableServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(CableLog::default());
    let script = Arc::new(script);

    let server_log = log.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_socket(stream, script.clone(), server_log.clone()));
        }
    });

    CableServer { url, log }
}

async fn serve_socket(stream: tokio::net::TcpStream, script: Arc<CableScript>, log: Arc<CableLog>) {
    let uri = Arc::new(Mutex::new(String::new()));
    let captured = uri.clone();
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        *captured.lock().unwrap() = request.uri().to_string();
        Ok(response)
    };
    let Ok(mut socket) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let request_uri = uri.lock().unwrap().clone();
    log.connections.lock().unwrap().push(request_uri);

    let _ = socket.send(text(json!({ "type": "welcome" }))).await;

    while let Some(Ok(message)) = socket.next().await {
        let Message::Text(body) = message else {
            continue;
        };
        let command: Value = serde_json::from_str(&body).unwrap();
        log.commands.lock().unwrap().push(command.clone());
        let identifier = command["identifier"].as_str().unwrap_or_default().to_string();

        match command["command"].as_str() {
            Some("subscribe") => {
                let kind = if script.reject {
                    "reject_subscription"
                } else {
                    "confirm_subscription"
                };
                let _ = socket
                    .send(text(json!({ "identifier": identifier, "type": kind })))
                    .await;
            }
            Some("message") => {
                for push in &script.pushes {
                    let _ = socket
                        .send(text(json!({ "identifier": identifier, "message": push })))
                        .await;
                }
                match &script.after_add {
                    AfterAdd::Stay => {}
                    AfterAdd::Disconnect(reason) => {
                        let _ = socket
                            .send(text(json!({ "type": "disconnect", "reason": reason, "reconnect": false })))
                            .await;
                    }
                    AfterAdd::DropSocket => return,
                }
            }
            _ => {}
        }
    }
}

fn text(value: Value) -> Message {
    Message::Text(value.to_string())
}

/// Poll `condition` for up to two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    exp: i64,
}

pub fn token_expiring_at(exp: i64) -> String {
    encode(
        &Header::default(),
        &Claims { sub: "operator", exp },
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .unwrap()
}
