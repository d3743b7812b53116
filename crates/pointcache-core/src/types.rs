//! Core data types for point streams.
//!
//! - [`Point`] - a timestamped scalar measurement
//! - [`IdentifierUnitsList`] - registry snapshot mapping identifiers to units
//! - [`RegistryMatch`] - result of looking a name up in that snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::units::Units;

/// A timestamped scalar measurement.
///
/// Absence of data is expressed as `Option<Point>::None` throughout the
/// workspace rather than a sentinel value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Seconds since the Unix epoch.
    pub time: i64,
    /// Measured value.
    pub value: f64,
    /// Quality code reported by the data source.
    pub quality: u32,
    /// Confidence in the measurement.
    pub confidence: f64,
}

impl Point {
    /// Quality code assigned to points whose validity was set by the quality filter.
    ///
    /// Source quality codes are 8-bit, so this value never collides with one.
    pub const QUALITY_OVERRIDE: u32 = 256;

    /// OPC "good" quality.
    pub const QUALITY_GOOD: u32 = 192;

    /// Creates a point with good quality and zero confidence.
    #[must_use]
    pub const fn new(time: i64, value: f64) -> Self {
        Self {
            time,
            value,
            quality: Self::QUALITY_GOOD,
            confidence: 0.0,
        }
    }

    /// Sets the quality code.
    #[must_use]
    pub const fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Sets the confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Returns true if the filter pipeline overrode this point's quality.
    #[must_use]
    pub const fn is_overridden(&self) -> bool {
        self.quality == Self::QUALITY_OVERRIDE
    }

    /// The timestamp as a UTC datetime, if it is representable.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (q={})", self.time, self.value, self.quality)
    }
}

/// Outcome of looking an identifier up in an [`IdentifierUnitsList`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistryMatch {
    /// The identifier is registered.
    pub exists: bool,
    /// The registered units equal the requested units.
    pub units_match: bool,
    /// Units currently recorded for the identifier; `None` if unset or absent.
    pub existing: Option<Units>,
}

/// Snapshot of a registry: identifier to recorded units.
///
/// An identifier mapped to `None` exists but has no units assigned, which is
/// distinct from having different units.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierUnitsList(BTreeMap<String, Option<Units>>);

impl IdentifierUnitsList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an identifier with its units.
    pub fn insert(&mut self, id: impl Into<String>, units: Option<Units>) {
        self.0.insert(id.into(), units);
    }

    /// Units recorded for `id`; the outer `None` means the identifier is unknown.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Option<Units>> {
        self.0.get(id).copied()
    }

    /// Returns true if the identifier is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Looks up `name` and compares its recorded units with `units`.
    #[must_use]
    pub fn lookup(&self, name: &str, units: Units) -> RegistryMatch {
        match self.0.get(name) {
            Some(existing) => RegistryMatch {
                exists: true,
                units_match: *existing == Some(units),
                existing: *existing,
            },
            None => RegistryMatch::default(),
        }
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no identifiers are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates identifiers and their units in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<Units>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, Option<Units>)> for IdentifierUnitsList {
    fn from_iter<I: IntoIterator<Item = (String, Option<Units>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
