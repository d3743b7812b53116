//! In-memory buffer tier.

use pointcache_core::{IdentifierUnitsList, Point, PointBuffer, TimeRange, Units};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Buffered points and units for one identifier.
#[derive(Debug, Clone, Default)]
struct Series {
    points: BTreeMap<i64, Point>,
    units: Option<Units>,
}

/// In-memory buffer tier keyed by identifier.
///
/// Points are held in a time-ordered map per identifier. With a capacity the
/// buffer keeps only the most recent points of each identifier, evicting the
/// oldest first; without one it grows without bound.
#[derive(Debug, Default)]
pub struct InMemoryBuffer {
    series: HashMap<String, Series>,
    capacity: Option<usize>,
}

impl InMemoryBuffer {
    /// Create a new unbounded buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer retaining at most `capacity` points per identifier.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            series: HashMap::new(),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Per-identifier capacity, if bounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of points buffered for `id`.
    #[must_use]
    pub fn len(&self, id: &str) -> usize {
        self.series.get(id).map_or(0, |s| s.points.len())
    }

    /// Returns true if nothing is buffered for `id`.
    #[must_use]
    pub fn is_empty(&self, id: &str) -> bool {
        self.len(id) == 0
    }
}

impl PointBuffer for InMemoryBuffer {
    fn point(&self, id: &str, time: i64) -> Option<Point> {
        self.series.get(id)?.points.get(&time).copied()
    }

    fn point_before(&self, id: &str, time: i64) -> Option<Point> {
        let series = self.series.get(id)?;
        series.points.range(..time).next_back().map(|(_, p)| *p)
    }

    fn point_after(&self, id: &str, time: i64) -> Option<Point> {
        let series = self.series.get(id)?;
        let start = time.checked_add(1)?;
        series.points.range(start..).next().map(|(_, p)| *p)
    }

    fn points_in_range(&self, id: &str, range: TimeRange) -> Vec<Point> {
        self.series.get(id).map_or_else(Vec::new, |s| {
            s.points
                .range(range.start()..=range.end())
                .map(|(_, p)| *p)
                .collect()
        })
    }

    fn add_points(&mut self, id: &str, points: &[Point]) -> usize {
        let series = self.series.entry(id.to_string()).or_default();
        for p in points {
            series.points.insert(p.time, *p);
        }

        let mut evicted = 0;
        if let Some(capacity) = self.capacity {
            while series.points.len() > capacity {
                series.points.pop_first();
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(id, evicted, "Evicted oldest buffered points");
        }
        trace!(id, added = points.len(), "Buffered points");
        evicted
    }

    fn range(&self, id: &str) -> Option<TimeRange> {
        let points = &self.series.get(id)?.points;
        let (first, _) = points.first_key_value()?;
        let (last, _) = points.last_key_value()?;
        Some(TimeRange::new(*first, *last))
    }

    fn reset(&mut self) {
        for series in self.series.values_mut() {
            series.points.clear();
        }
        debug!("Cleared all buffered points");
    }

    fn reset_identifier(&mut self, id: &str) {
        if let Some(series) = self.series.get_mut(id) {
            series.points.clear();
            debug!(id, "Cleared buffered points");
        }
    }

    fn register_identifier(&mut self, name: &str, units: Units) -> bool {
        if name.is_empty() {
            return false;
        }
        self.series.entry(name.to_string()).or_default().units = Some(units);
        true
    }

    fn identifiers_and_units(&self) -> IdentifierUnitsList {
        self.series
            .iter()
            .map(|(id, s)| (id.clone(), s.units))
            .collect()
    }
}
