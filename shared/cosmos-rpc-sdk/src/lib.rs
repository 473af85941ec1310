//! COSMOS RPC SDK
//!
//! JSON-RPC 2.0 calls against `/openc3-api/api` and the telemetry
//! discovery methods built on them.

pub mod client;
pub mod discovery;
pub mod error;
pub mod protocol;

pub use client::RpcClient;
pub use discovery::{Discovery, ItemDefinition, PacketDefinition};
pub use error::{Result, RpcError};
pub use protocol::{RpcRequest, RpcResponse};
