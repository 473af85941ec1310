//! Rendering sink
//!
//! Sessions hand each snapshot to a [`RenderSink`] while still holding the
//! buffer borrow. Sinks that need to keep the data convert it with
//! [`FrameUpdate::to_data`].

use serde::Serialize;
use tokio::sync::mpsc;

use crate::frame::{FrameSnapshot, LoadingState, TIME_FIELD};
use crate::SubscriptionError;

/// Snapshot of one subscription's frame, tagged with the loading state
#[derive(Debug, Clone, Copy)]
pub struct FrameUpdate<'a> {
    pub ref_id: &'a str,
    pub state: LoadingState,
    pub frame: FrameSnapshot<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnData {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Owned copy of a frame update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameData {
    pub ref_id: String,
    pub state: LoadingState,
    pub time_field: &'static str,
    /// Milliseconds since epoch
    pub time: Vec<f64>,
    pub columns: Vec<ColumnData>,
}

impl FrameUpdate<'_> {
    pub fn to_data(&self) -> FrameData {
        let columns = self
            .frame
            .columns
            .iter()
            .enumerate()
            .map(|(index, name)| ColumnData {
                name: name.clone(),
                values: self
                    .frame
                    .samples
                    .iter()
                    .map(|s| s.values.get(index).copied().flatten())
                    .collect(),
            })
            .collect();

        FrameData {
            ref_id: self.ref_id.to_string(),
            state: self.state,
            time_field: TIME_FIELD,
            time: self.frame.times().collect(),
            columns,
        }
    }
}

/// What a query's consumer receives, interleaved across its subscriptions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryEvent {
    Frame(FrameData),
    Error {
        ref_id: String,
        message: String,
    },
}

impl QueryEvent {
    pub fn ref_id(&self) -> &str {
        match self {
            Self::Frame(frame) => &frame.ref_id,
            Self::Error { ref_id, .. } => ref_id,
        }
    }
}

/// Receives frame updates from running subscriptions
pub trait RenderSink: Send + Sync {
    fn render(&self, update: FrameUpdate<'_>);

    /// The subscription for `ref_id` ended with `error`
    fn fail(&self, ref_id: &str, error: &SubscriptionError);
}

impl RenderSink for mpsc::UnboundedSender<QueryEvent> {
    fn render(&self, update: FrameUpdate<'_>) {
        // A closed receiver means nobody is watching anymore
        let _ = self.send(QueryEvent::Frame(update.to_data()));
    }

    fn fail(&self, ref_id: &str, error: &SubscriptionError) {
        let _ = self.send(QueryEvent::Error {
            ref_id: ref_id.to_string(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Sample;

    #[test]
    fn test_to_data_splits_columns() {
        let columns = vec!["TEMP1".to_string(), "TEMP2".to_string()];
        let samples = vec![
            Sample {
                time_nanos: 1_000_000_000,
                values: vec![Some(1.0), None],
            },
            Sample {
                time_nanos: 2_000_000_000,
                values: vec![Some(2.0), Some(20.0)],
            },
        ];
        let update = FrameUpdate {
            ref_id: "A",
            state: LoadingState::Done,
            frame: FrameSnapshot {
                columns: &columns,
                samples: &samples,
            },
        };

        let data = update.to_data();
        assert_eq!(data.time, vec![1_000.0, 2_000.0]);
        assert_eq!(data.columns[0].values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(data.columns[1].values, vec![None, Some(20.0)]);
        assert_eq!(data.state, LoadingState::Done);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_owned_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let columns = vec!["TEMP1".to_string()];
        let samples = vec![Sample {
            time_nanos: 5_000_000,
            values: vec![Some(42.5)],
        }];
        tx.render(FrameUpdate {
            ref_id: "A",
            state: LoadingState::Streaming,
            frame: FrameSnapshot {
                columns: &columns,
                samples: &samples,
            },
        });
        tx.fail(
            "B",
            &SubscriptionError::Channel(crate::ChannelError::Rejected("unauthorized".to_string())),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(first.ref_id(), "A");
        assert!(matches!(first, QueryEvent::Frame(ref f) if f.time == vec![5.0]));

        let second = rx.recv().await.unwrap();
        assert_eq!(
            second,
            QueryEvent::Error {
                ref_id: "B".to_string(),
                message: "Subscription rejected: unauthorized".to_string(),
            }
        );
    }
}
