//! Backing store that is never reachable.

use async_trait::async_trait;
use pointcache_core::{
    AdapterOptions, CacheError, IdentifierUnitsList, Point, PointAdapter, Result, TimeRange,
    Units,
};
use tracing::trace;

/// A backing store that never connects.
///
/// `connect` always fails and every query returns an empty result, so an
/// orchestrator in front of it runs entirely on its buffer tier. Useful for
/// purely in-memory operation and for exercising degraded code paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAdapter;

impl NoopAdapter {
    /// Create a new no-op adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PointAdapter for NoopAdapter {
    fn name(&self) -> &str {
        "noop"
    }

    fn options(&self) -> AdapterOptions {
        AdapterOptions::default()
    }

    async fn connect(&self) -> Result<()> {
        trace!("NoopAdapter: connect called, refusing");
        Err(CacheError::Connection("noop adapter has no backing store".to_string()))
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn select_range(&self, _id: &str, _range: TimeRange) -> Result<Vec<Point>> {
        trace!("NoopAdapter: select_range called, returning nothing");
        Ok(Vec::new())
    }

    async fn insert_single(&self, _id: &str, _point: Point) -> Result<()> {
        trace!("NoopAdapter: insert_single called, doing nothing");
        Ok(())
    }

    async fn insert_range(&self, _id: &str, _points: &[Point]) -> Result<()> {
        trace!("NoopAdapter: insert_range called, doing nothing");
        Ok(())
    }

    async fn id_units_list(&self) -> Result<IdentifierUnitsList> {
        trace!("NoopAdapter: id_units_list called, returning empty list");
        Ok(IdentifierUnitsList::new())
    }

    async fn insert_identifier_and_units(&self, _id: &str, _units: Units) -> Result<bool> {
        trace!("NoopAdapter: insert_identifier_and_units called, refusing");
        Ok(false)
    }

    async fn remove_record(&self, _id: &str) -> Result<()> {
        trace!("NoopAdapter: remove_record called, doing nothing");
        Ok(())
    }
}
