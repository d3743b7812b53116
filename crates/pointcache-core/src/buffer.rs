//! Buffer tier trait for in-memory point storage.
//!
//! A [`PointBuffer`] answers every read from memory and never reaches a
//! backing store, which lets the orchestrator treat it as the fast path.

use std::fmt::Debug;

use crate::{
    range::TimeRange,
    types::{IdentifierUnitsList, Point},
    units::Units,
};

/// In-memory per-identifier point cache.
///
/// Writes are idempotent upserts keyed by `(id, time)`. Implementations may
/// evict old points; the write methods report how many were dropped so the
/// caller can discard anything it inferred from them.
pub trait PointBuffer: Send + Debug {
    /// The point for `id` at exactly `time`.
    fn point(&self, id: &str, time: i64) -> Option<Point>;

    /// The latest buffered point strictly before `time`.
    fn point_before(&self, id: &str, time: i64) -> Option<Point>;

    /// The earliest buffered point strictly after `time`.
    fn point_after(&self, id: &str, time: i64) -> Option<Point>;

    /// Buffered points within `range`, ordered by time.
    fn points_in_range(&self, id: &str, range: TimeRange) -> Vec<Point>;

    /// Upserts one point; returns the number of points evicted.
    fn add_point(&mut self, id: &str, point: Point) -> usize {
        self.add_points(id, &[point])
    }

    /// Upserts a batch of points; returns the number of points evicted.
    fn add_points(&mut self, id: &str, points: &[Point]) -> usize;

    /// Span of buffered data for `id`, or `None` if nothing is buffered.
    fn range(&self, id: &str) -> Option<TimeRange>;

    /// Drops every buffered point for every identifier.
    fn reset(&mut self);

    /// Drops every buffered point for `id`.
    fn reset_identifier(&mut self, id: &str);

    /// Registers `name` locally. Fails only for an empty name.
    fn register_identifier(&mut self, name: &str, units: Units) -> bool;

    /// Locally registered identifiers and their units.
    fn identifiers_and_units(&self) -> IdentifierUnitsList;
}
