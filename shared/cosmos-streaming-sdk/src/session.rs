//! Subscription session state machine
//!
//! `Idle -> Connecting -> Subscribed -> Closed`. The session does no IO: the
//! driver feeds it events and sends whatever commands it hands back.

use cosmos_core::{TimeRange, TimeWindow};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::buffer::capacity_for_range;
use crate::frame::{DataFrame, LoadingState, Sample};
use crate::query::{TelemetryQuery, WireKey};
use crate::sink::FrameUpdate;
use crate::{ChannelError, Result};

/// Record field carrying the sample timestamp in nanoseconds
pub const TIME_KEY: &str = "__time";

/// Action registering interest with `StreamingChannel`
pub const ADD_ACTION: &str = "add";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Subscribed,
    Closed,
}

/// Payload of the `add` action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddCommand {
    pub scope: String,
    pub token: String,
    /// `[wire key, positional index]` pairs
    pub items: Vec<(String, String)>,
    pub start_time: i64,
    /// Absent (null) for a live window
    pub end_time: Option<i64>,
}

#[derive(Debug)]
pub struct SubscriptionSession {
    ref_id: String,
    scope: String,
    keys: Vec<WireKey>,
    window: TimeWindow,
    frame: Option<DataFrame>,
    state: SessionState,
    received: u64,
}

impl SubscriptionSession {
    pub fn new(query: &TelemetryQuery, range: &TimeRange, live_streaming: bool, scope: &str) -> Self {
        let frame = DataFrame::new(query.columns(), capacity_for_range(range.length_millis()));
        Self {
            ref_id: query.ref_id.clone(),
            scope: scope.to_string(),
            keys: query.items.clone(),
            window: TimeWindow::from_range(range, live_streaming),
            frame: Some(frame),
            state: SessionState::Idle,
            received: 0,
        }
    }

    pub fn ref_id(&self) -> &str {
        &self.ref_id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Messages decoded so far
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn frame(&self) -> Option<&DataFrame> {
        self.frame.as_ref()
    }

    pub fn loading_state(&self) -> LoadingState {
        if self.window.is_live() {
            LoadingState::Streaming
        } else {
            LoadingState::Done
        }
    }

    pub fn begin_connect(&mut self) -> Result<()> {
        self.transition(SessionState::Idle, SessionState::Connecting)
    }

    /// The channel confirmed the subscription. Returns the `add` payload.
    pub fn on_connected(&mut self, token: &str) -> Result<AddCommand> {
        self.transition(SessionState::Connecting, SessionState::Subscribed)?;
        Ok(AddCommand {
            scope: self.scope.clone(),
            token: token.to_string(),
            items: self
                .keys
                .iter()
                .enumerate()
                .map(|(index, key)| (key.as_str().to_string(), index.to_string()))
                .collect(),
            start_time: self.window.start_nanos,
            end_time: self.window.end_nanos,
        })
    }

    /// Fold one push payload into the frame.
    ///
    /// Returns `None` when the session is not subscribed. A malformed payload
    /// is an error and leaves the frame untouched.
    pub fn on_push(&mut self, payload: &Value) -> Result<Option<FrameUpdate<'_>>> {
        if self.state != SessionState::Subscribed {
            trace!(ref_id = %self.ref_id, state = ?self.state, "Dropping push outside subscription");
            return Ok(None);
        }
        let loading_state = self.loading_state();
        let frame = match self.frame.as_mut() {
            Some(frame) => frame,
            None => return Ok(None),
        };

        let samples = decode_records(payload, frame.columns().len())?;
        self.received += 1;
        debug!(ref_id = %self.ref_id, records = samples.len(), "Push decoded");
        for sample in samples {
            frame.append(sample);
        }

        Ok(Some(FrameUpdate {
            ref_id: &self.ref_id,
            state: loading_state,
            frame: frame.snapshot(),
        }))
    }

    /// Terminal. The buffer is discarded.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!(ref_id = %self.ref_id, from = ?self.state, "Session closed");
        }
        self.state = SessionState::Closed;
        self.frame = None;
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<()> {
        if self.state != from {
            return Err(ChannelError::InvalidState(format!(
                "cannot move from {:?} to {:?}",
                self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}

fn decode_records(payload: &Value, width: usize) -> Result<Vec<Sample>> {
    let records = payload
        .as_array()
        .ok_or_else(|| ChannelError::Decode(format!("expected an array of records, got {}", payload)))?;
    records
        .iter()
        .map(|record| {
            let fields = record
                .as_object()
                .ok_or_else(|| ChannelError::Decode(format!("record is not an object: {}", record)))?;
            decode_record(fields, width)
        })
        .collect()
}

fn decode_record(fields: &Map<String, Value>, width: usize) -> Result<Sample> {
    let time_nanos = fields
        .get(TIME_KEY)
        .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
        .ok_or_else(|| ChannelError::Decode(format!("record without numeric {}", TIME_KEY)))?;

    let values = (0..width)
        .map(|index| match fields.get(&index.to_string()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(ChannelError::Decode(format!(
                "item {} is not numeric: {}",
                index, other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Sample { time_nanos, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    const T0_MS: i64 = 1_700_000_000_000;

    fn range() -> TimeRange {
        let to = Utc.timestamp_millis_opt(T0_MS).unwrap();
        TimeRange::new(to - Duration::seconds(60), to)
    }

    fn temp_query() -> TelemetryQuery {
        let mut query = TelemetryQuery::new("A").select("INST", "HEALTH_STATUS", "TEMP1");
        query.add_item().unwrap();
        query
    }

    fn subscribed(live: bool) -> SubscriptionSession {
        let mut session = SubscriptionSession::new(&temp_query(), &range(), live, "DEFAULT");
        session.begin_connect().unwrap();
        session.on_connected("token").unwrap();
        session
    }

    #[test]
    fn test_add_command_for_live_window() {
        let mut session = SubscriptionSession::new(&temp_query(), &range(), true, "DEFAULT");
        assert_eq!(session.state(), SessionState::Idle);
        session.begin_connect().unwrap();
        let add = session.on_connected("tok").unwrap();

        assert_eq!(session.state(), SessionState::Subscribed);
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            json!({
                "scope": "DEFAULT",
                "token": "tok",
                "items": [["DECOM__TLM__INST__HEALTH_STATUS__TEMP1__CONVERTED", "0"]],
                "start_time": (T0_MS - 60_000) * 1_000_000,
                "end_time": null,
            })
        );
    }

    #[test]
    fn test_bounded_window_closes_end_time() {
        let mut session = SubscriptionSession::new(&temp_query(), &range(), false, "DEFAULT");
        session.begin_connect().unwrap();
        let add = session.on_connected("tok").unwrap();
        assert_eq!(add.end_time, Some(T0_MS * 1_000_000));
        assert_eq!(session.frame().unwrap().capacity(), 60);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let mut session = SubscriptionSession::new(&temp_query(), &range(), true, "DEFAULT");
        assert!(matches!(session.on_connected("tok"), Err(ChannelError::InvalidState(_))));
        session.begin_connect().unwrap();
        assert!(session.begin_connect().is_err());
    }

    #[test]
    fn test_live_push_yields_streaming_row() {
        let mut session = subscribed(true);
        let update = session
            .on_push(&json!([{ "__time": T0_MS * 1_000_000, "0": 42.5 }]))
            .unwrap()
            .unwrap();

        assert_eq!(update.ref_id, "A");
        assert_eq!(update.state, LoadingState::Streaming);
        assert_eq!(update.frame.columns, &["TEMP1".to_string()]);
        assert_eq!(update.frame.times().collect::<Vec<_>>(), vec![T0_MS as f64]);
        assert_eq!(update.frame.column("TEMP1").unwrap().collect::<Vec<_>>(), vec![Some(42.5)]);
    }

    #[test]
    fn test_sub_millisecond_samples_keep_distinct_times() {
        let mut session = subscribed(true);
        let base = T0_MS * 1_000_000;
        let update = session
            .on_push(&json!([
                { "__time": base, "0": 1.0 },
                { "__time": base + 250_000, "0": 2.0 },
            ]))
            .unwrap()
            .unwrap();

        let times: Vec<f64> = update.frame.times().collect();
        assert_eq!(times[0], T0_MS as f64);
        assert!((times[1] - times[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_bounded_push_is_done_every_time() {
        let mut session = subscribed(false);
        for i in 0..3 {
            let update = session
                .on_push(&json!([{ "__time": (T0_MS + i) * 1_000_000, "0": i }]))
                .unwrap()
                .unwrap();
            assert_eq!(update.state, LoadingState::Done);
        }
        assert_eq!(session.received(), 3);
    }

    #[test]
    fn test_missing_and_null_values() {
        let mut query = temp_query().select("INST", "HEALTH_STATUS", "TEMP2");
        query.add_item().unwrap();
        let mut session = SubscriptionSession::new(&query, &range(), true, "DEFAULT");
        session.begin_connect().unwrap();
        session.on_connected("tok").unwrap();

        let update = session
            .on_push(&json!([
                { "__time": 1_000_000, "0": null, "1": 2 },
                { "__time": 2_000_000, "0": 1.5 },
            ]))
            .unwrap()
            .unwrap();
        let sample = update.frame.last().unwrap();
        assert_eq!(sample.values, vec![Some(1.5), None]);
        assert_eq!(update.frame.len(), 2);
    }

    #[test]
    fn test_malformed_push_is_decode_error() {
        let mut session = subscribed(true);
        assert!(matches!(
            session.on_push(&json!({ "__time": 1 })),
            Err(ChannelError::Decode(_))
        ));
        assert!(matches!(
            session.on_push(&json!([{ "0": 1.0 }])),
            Err(ChannelError::Decode(_))
        ));
        assert!(matches!(
            session.on_push(&json!([{ "__time": 1, "0": "hot" }])),
            Err(ChannelError::Decode(_))
        ));
        assert!(session.frame().unwrap().is_empty());
    }

    #[test]
    fn test_push_after_close_is_dropped() {
        let mut session = subscribed(true);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.frame().is_none());
        assert!(session
            .on_push(&json!([{ "__time": 1, "0": 1.0 }]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_push_before_subscribed_is_dropped() {
        let mut session = SubscriptionSession::new(&temp_query(), &range(), true, "DEFAULT");
        session.begin_connect().unwrap();
        assert!(session
            .on_push(&json!([{ "__time": 1, "0": 1.0 }]))
            .unwrap()
            .is_none());
    }
}
