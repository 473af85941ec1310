//! Buffered samples with their column schema

use cosmos_core::nanos_to_millis;
use serde::{Deserialize, Serialize};

use crate::buffer::StreamingBuffer;

pub const TIME_FIELD: &str = "time";

/// Tag attached to every emitted snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LoadingState {
    /// Live window: more data keeps arriving
    Streaming,
    /// Bounded window: the host may treat each emission as final
    Done,
}

/// One decoded push record
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time_nanos: i64,
    /// Aligned with the frame's columns; `None` where the server sent null or nothing
    pub values: Vec<Option<f64>>,
}

impl Sample {
    pub fn time_millis(&self) -> f64 {
        nanos_to_millis(self.time_nanos)
    }
}

#[derive(Debug)]
pub struct DataFrame {
    columns: Vec<String>,
    buffer: StreamingBuffer<Sample>,
}

impl DataFrame {
    pub fn new(columns: Vec<String>, capacity: usize) -> Self {
        Self {
            columns,
            buffer: StreamingBuffer::with_capacity(capacity),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn append(&mut self, sample: Sample) {
        self.buffer.append(sample);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn snapshot(&mut self) -> FrameSnapshot<'_> {
        FrameSnapshot {
            columns: &self.columns,
            samples: self.buffer.snapshot(),
        }
    }
}

/// Read-only view of a frame, valid until the next append
#[derive(Debug, Clone, Copy)]
pub struct FrameSnapshot<'a> {
    pub columns: &'a [String],
    pub samples: &'a [Sample],
}

impl<'a> FrameSnapshot<'a> {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamps in milliseconds since epoch
    pub fn times(&self) -> impl Iterator<Item = f64> + 'a {
        let samples: &'a [Sample] = self.samples;
        samples.iter().map(Sample::time_millis)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<f64>> + 'a> {
        let index = self.columns.iter().position(|c| c == name)?;
        let samples: &'a [Sample] = self.samples;
        Some(samples.iter().map(move |s| s.values.get(index).copied().flatten()))
    }

    pub fn last(&self) -> Option<&'a Sample> {
        let samples: &'a [Sample] = self.samples;
        samples.last()
    }
}
