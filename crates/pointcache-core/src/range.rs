//! Closed timestamp intervals and their intersection classification.
//!
//! [`TimeRange::classify`] compares a query range against a reference range
//! (usually the span already held in memory) and reports which parts of the
//! query lie outside the reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a query range relates to a reference range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intersection {
    /// No usable overlap; the whole query must be fetched.
    Disjoint,
    /// The query lies entirely inside the reference.
    Internal,
    /// The query surrounds the reference on both sides.
    External,
    /// The query starts before the reference and ends inside it.
    LeftOverlap,
    /// The query starts inside the reference and ends after it.
    RightOverlap,
}

/// A closed interval of Unix timestamps, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    /// Creates a range; the bounds are ordered so that `start <= end`.
    #[must_use]
    pub const fn new(a: i64, b: i64) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Creates a range from UTC datetimes.
    #[must_use]
    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start.timestamp(), end.timestamp())
    }

    /// Creates a range centred on `t` extending `margin` seconds each way.
    #[must_use]
    pub const fn around(t: i64, margin: i64) -> Self {
        Self::new(t.saturating_sub(margin), t.saturating_add(margin))
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Inclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> i64 {
        self.end
    }

    /// Length in seconds.
    #[must_use]
    pub const fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if `t` lies within the range.
    #[must_use]
    pub const fn contains(&self, t: i64) -> bool {
        self.start <= t && t <= self.end
    }

    /// Returns true if `other` lies entirely within the range.
    #[must_use]
    pub const fn contains_range(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if the two ranges share at least one instant.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Classifies `query` relative to `self`.
    ///
    /// Cases are tested in the order internal, external, left, right; anything
    /// left over is [`Intersection::Disjoint`].
    #[must_use]
    pub const fn classify(&self, query: &Self) -> Intersection {
        if self.contains_range(query) {
            Intersection::Internal
        } else if query.contains_range(self) {
            Intersection::External
        } else if query.start < self.start && self.contains(query.end) {
            Intersection::LeftOverlap
        } else if self.contains(query.start) && query.end > self.end {
            Intersection::RightOverlap
        } else {
            Intersection::Disjoint
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (
            DateTime::from_timestamp(self.start, 0),
            DateTime::from_timestamp(self.end, 0),
        ) {
            (Some(s), Some(e)) => write!(f, "[{}, {}]", s.to_rfc3339(), e.to_rfc3339()),
            _ => write!(f, "[{}, {}]", self.start, self.end),
        }
    }
}
