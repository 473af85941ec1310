//! ActionCable JSON framing

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use crate::channel::ClientCommand;
use crate::{ChannelError, Result};

pub const STREAMING_CHANNEL: &str = "StreamingChannel";
pub const CABLE_PATH: &str = "/openc3-api/cable";

/// Frames the server sends
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Welcome,
    Ping,
    Confirm { identifier: String },
    Reject { identifier: String },
    Disconnect { reason: Option<String> },
    Message { identifier: String, payload: Value },
    /// Anything else, by its `type`
    Unknown(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    identifier: Option<String>,
    message: Option<Value>,
    reason: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    command: &'a str,
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// Fresh identifier, unique per subscription so several can share a socket
pub fn streaming_identifier() -> String {
    let mut identifier = Map::new();
    identifier.insert("channel".to_string(), Value::from(STREAMING_CHANNEL));
    identifier.insert("subscription_id".to_string(), Value::from(Uuid::new_v4().to_string()));
    Value::Object(identifier).to_string()
}

pub fn encode_command(command: &ClientCommand) -> Result<String> {
    let envelope = match command {
        ClientCommand::Subscribe { identifier } => Envelope {
            command: "subscribe",
            identifier,
            data: None,
        },
        ClientCommand::Unsubscribe { identifier } => Envelope {
            command: "unsubscribe",
            identifier,
            data: None,
        },
        ClientCommand::Perform {
            identifier,
            action,
            data,
        } => {
            let mut body = match data {
                Value::Object(fields) => fields.clone(),
                Value::Null => Map::new(),
                other => {
                    return Err(ChannelError::Protocol(format!(
                        "action data must be an object, got {}",
                        other
                    )))
                }
            };
            body.insert("action".to_string(), Value::from(action.as_str()));
            Envelope {
                command: "message",
                identifier,
                data: Some(Value::Object(body).to_string()),
            }
        }
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode_frame(text: &str) -> Result<ServerFrame> {
    let raw: RawFrame = serde_json::from_str(text)?;
    let frame = match raw.kind.as_deref() {
        Some("welcome") => ServerFrame::Welcome,
        Some("ping") => ServerFrame::Ping,
        Some("confirm_subscription") => ServerFrame::Confirm {
            identifier: raw.identifier.unwrap_or_default(),
        },
        Some("reject_subscription") => ServerFrame::Reject {
            identifier: raw.identifier.unwrap_or_default(),
        },
        Some("disconnect") => ServerFrame::Disconnect { reason: raw.reason },
        Some(other) => ServerFrame::Unknown(other.to_string()),
        None => match (raw.identifier, raw.message) {
            (Some(identifier), Some(payload)) => ServerFrame::Message { identifier, payload },
            _ => ServerFrame::Unknown(String::new()),
        },
    };
    Ok(frame)
}

/// Cable endpoint for an API base URL.
///
/// `http` maps to `ws` and `https` to `wss`; a bare `host:port` is treated as
/// plain HTTP. Scope and token travel as query parameters.
pub fn cable_url(api_base_url: &str, scope: &str, token: &str) -> Result<Url> {
    let base = if api_base_url.contains("://") {
        api_base_url.to_string()
    } else {
        format!("http://{}", api_base_url)
    };
    let mut url = Url::parse(&base)
        .map_err(|e| ChannelError::Connect(format!("invalid API URL {}: {}", api_base_url, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ChannelError::Connect(format!("unsupported URL scheme {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| ChannelError::Connect(format!("cannot use {} for {}", scheme, api_base_url)))?;

    let path = format!("{}{}", url.path().trim_end_matches('/'), CABLE_PATH);
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("scope", scope)
        .append_pair("authorization", token);
    Ok(url)
}
