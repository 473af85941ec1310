//! Fixed-capacity streaming buffer
//!
//! Samples are appended at the tail; once full, the oldest sample is evicted
//! to admit the newest. Samples are kept in arrival order and never sorted.

use std::collections::VecDeque;

/// Capacity used when the requested window is empty or inverted
pub const DEFAULT_CAPACITY: usize = 1000;

/// Upper bound so a year-long window cannot reserve unbounded memory
pub const MAX_CAPACITY: usize = 1_000_000;

/// Buffer capacity for a dashboard range: one slot per second of window
pub fn capacity_for_range(length_millis: i64) -> usize {
    let seconds = length_millis / 1000;
    if seconds <= 0 {
        return DEFAULT_CAPACITY;
    }
    usize::try_from(seconds).unwrap_or(MAX_CAPACITY).clamp(1, MAX_CAPACITY)
}

#[derive(Debug, Clone)]
pub struct StreamingBuffer<T> {
    samples: VecDeque<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> StreamingBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            // Grows on demand; large windows rarely fill up
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            evicted: 0,
        }
    }

    /// Append at the tail, returning the evicted head if the buffer was full
    pub fn append(&mut self, sample: T) -> Option<T> {
        let evicted = if self.samples.len() == self.capacity {
            self.evicted += 1;
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Current contents, oldest first.
    ///
    /// Rotates the ring in place instead of copying, so the slice is only
    /// valid until the next append.
    pub fn snapshot(&mut self) -> &[T] {
        self.samples.make_contiguous()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples dropped from the head so far
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
