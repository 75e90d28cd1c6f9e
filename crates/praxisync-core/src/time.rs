//! Time range type for querying and syncing events.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A half-open UTC interval `[start, end)`.
///
/// Ranges scope everything in praxisync: adapter fetches, store reads, and
/// the tombstone deletions of a sync commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeRange start must be <= end");
        Self { start, end }
    }

    /// Creates a rolling range around `now`: `back_days` into the past,
    /// `forward_days` into the future.
    pub fn rolling(now: DateTime<Utc>, back_days: i64, forward_days: i64) -> Self {
        Self::new(
            now - Duration::days(back_days),
            now + Duration::days(forward_days),
        )
    }

    /// Returns `true` if the instant falls within `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Returns `true` if the two ranges share any instant.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns `true` if `other` lies entirely within this range.
    pub fn covers(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns the length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn contains_is_half_open() {
        let range = TimeRange::new(utc(2025, 1, 1, 0), utc(2025, 1, 2, 0));
        assert!(range.contains(utc(2025, 1, 1, 0)));
        assert!(range.contains(utc(2025, 1, 1, 12)));
        assert!(!range.contains(utc(2025, 1, 2, 0)));
        assert!(!range.contains(utc(2024, 12, 31, 23)));
    }

    #[test]
    fn overlap_detection() {
        let a = TimeRange::new(utc(2025, 1, 1, 0), utc(2025, 1, 3, 0));
        let b = TimeRange::new(utc(2025, 1, 2, 0), utc(2025, 1, 4, 0));
        let c = TimeRange::new(utc(2025, 1, 3, 0), utc(2025, 1, 5, 0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Half-open: touching endpoints do not overlap.
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn covers_narrower_range() {
        let outer = TimeRange::new(utc(2025, 1, 1, 0), utc(2025, 2, 1, 0));
        let inner = TimeRange::new(utc(2025, 1, 10, 0), utc(2025, 1, 20, 0));

        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
        assert!(outer.covers(&outer));
    }

    #[test]
    fn rolling_window() {
        let now = utc(2025, 6, 15, 12);
        let range = TimeRange::rolling(now, 7, 30);
        assert_eq!(range.start, utc(2025, 6, 8, 12));
        assert_eq!(range.end, utc(2025, 7, 15, 12));
        assert!(range.contains(now));
    }

    #[test]
    #[should_panic(expected = "start must be <= end")]
    fn rejects_inverted_range() {
        TimeRange::new(utc(2025, 1, 2, 0), utc(2025, 1, 1, 0));
    }

    #[test]
    fn serde_roundtrip() {
        let range = TimeRange::new(utc(2025, 1, 1, 0), utc(2025, 1, 2, 0));
        let json = serde_json::to_string(&range).unwrap();
        let parsed: TimeRange = serde_json::from_str(&json).unwrap();
        assert_eq!(range, parsed);
    }
}
