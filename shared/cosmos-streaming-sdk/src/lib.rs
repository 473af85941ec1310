//! COSMOS Streaming SDK
//!
//! Turns telemetry queries into `StreamingChannel` subscriptions and folds
//! the pushed samples into bounded frames for rendering.
//!
//! - [`query`]: query descriptors and wire keys
//! - [`buffer`] / [`frame`]: the ring buffer and its column schema
//! - [`session`]: the per-subscription state machine
//! - [`driver`]: runs a session against a [`channel::PushChannel`]
//! - [`cable`]: ActionCable over WebSocket, with shared connections

pub mod buffer;
pub mod cable;
pub mod channel;
pub mod driver;
pub mod error;
pub mod frame;
pub mod query;
pub mod session;
pub mod sink;

pub use buffer::{capacity_for_range, StreamingBuffer, DEFAULT_CAPACITY, MAX_CAPACITY};
pub use cable::{CableConnection, CableHub};
pub use channel::{ChannelEvent, ChannelSubscription, ClientCommand, CommandSink, PushChannel};
pub use driver::run_subscription;
pub use error::{ChannelError, Result, SubscriptionError};
pub use frame::{DataFrame, FrameSnapshot, LoadingState, Sample};
pub use query::{Aggregate, Decimation, TelemetryQuery, ValueType, WireKey};
pub use session::{AddCommand, SessionState, SubscriptionSession};
pub use sink::{ColumnData, FrameData, FrameUpdate, QueryEvent, RenderSink};
