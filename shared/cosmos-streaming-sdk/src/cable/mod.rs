//! ActionCable transport
//!
//! One WebSocket per API host and scope, shared by every subscription that
//! targets them. Connections are reference counted and close once the last
//! subscription lets go.

mod connection;
mod hub;
pub mod protocol;

pub use connection::CableConnection;
pub use hub::CableHub;
pub use protocol::{cable_url, ServerFrame, CABLE_PATH, STREAMING_CHANNEL};
