//! Time ranges and subscription windows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Dashboard time range selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Range ending now and reaching `seconds` into the past
    pub fn last_seconds(seconds: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - chrono::Duration::seconds(seconds),
            to,
        }
    }

    pub fn length_millis(&self) -> i64 {
        self.to.timestamp_millis() - self.from.timestamp_millis()
    }
}

/// Window registered with the streaming channel, in nanoseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_nanos: i64,
    /// `None` is an open (live) window
    pub end_nanos: Option<i64>,
}

impl TimeWindow {
    pub fn live(start_nanos: i64) -> Self {
        Self {
            start_nanos,
            end_nanos: None,
        }
    }

    pub fn bounded(start_nanos: i64, end_nanos: i64) -> Self {
        Self {
            start_nanos,
            end_nanos: Some(end_nanos),
        }
    }

    /// Live streaming leaves the end open; otherwise the range's upper bound closes it
    pub fn from_range(range: &TimeRange, live_streaming: bool) -> Self {
        let start_nanos = millis_to_nanos(range.from.timestamp_millis());
        if live_streaming {
            Self::live(start_nanos)
        } else {
            Self::bounded(start_nanos, millis_to_nanos(range.to.timestamp_millis()))
        }
    }

    pub fn is_live(&self) -> bool {
        self.end_nanos.is_none()
    }
}

pub fn millis_to_nanos(millis: i64) -> i64 {
    millis.saturating_mul(NANOS_PER_MILLI)
}

/// Fractional milliseconds; sub-millisecond spacing survives
pub fn nanos_to_millis(nanos: i64) -> f64 {
    nanos as f64 / NANOS_PER_MILLI as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            Utc.timestamp_millis_opt(1_700_000_060_000).unwrap(),
        )
    }

    #[test]
    fn test_live_window_is_open() {
        let window = TimeWindow::from_range(&range(), true);
        assert!(window.is_live());
        assert_eq!(window.start_nanos, 1_700_000_000_000_000_000);
        assert_eq!(window.end_nanos, None);
    }

    #[test]
    fn test_bounded_window_uses_upper_bound() {
        let window = TimeWindow::from_range(&range(), false);
        assert!(!window.is_live());
        assert_eq!(window.end_nanos, Some(1_700_000_060_000_000_000));
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(range().length_millis(), 60_000);
        assert_eq!(nanos_to_millis(millis_to_nanos(1_234)), 1_234.0);
        assert_eq!(nanos_to_millis(1_500_000), 1.5);
        assert_ne!(nanos_to_millis(1_000_000_000_000_000_000), nanos_to_millis(1_000_000_000_000_500_000));
    }
}
