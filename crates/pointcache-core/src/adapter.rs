//! Backing-store adapter traits.
//!
//! This module defines the boundary to a persistent store:
//!
//! - [`AdapterOptions`] - Static capability flags declared by an adapter
//! - [`PointAdapter`] - Connection, range selects, writes, transactions and registry
//! - [`BoundedQuery`] - Optional single-bound selects ("point before/after T")
//!
//! Adapters never filter or deduplicate; the orchestrator does both.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{
    error::{CacheError, Result},
    range::TimeRange,
    types::{IdentifierUnitsList, Point},
    units::Units,
};

/// Capabilities of a backing store, fixed for the lifetime of an adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// The store cannot be written to.
    pub read_only: bool,
    /// The registry records units per identifier.
    pub supports_units_column: bool,
    /// Units may be assigned to an identifier that has none recorded.
    pub can_assign_units: bool,
    /// [`PointAdapter::bounded`] returns a [`BoundedQuery`].
    pub supports_singly_bounded_query: bool,
    /// Bound lookups should probe with widening range windows instead.
    pub search_iteratively: bool,
}

/// Single-bound selects for adapters that declare
/// [`AdapterOptions::supports_singly_bounded_query`].
#[async_trait]
pub trait BoundedQuery: Send + Sync {
    /// The latest point strictly before `time`.
    async fn select_previous(&self, id: &str, time: i64) -> Result<Option<Point>>;

    /// The earliest point strictly after `time`.
    async fn select_next(&self, id: &str, time: i64) -> Result<Option<Point>>;
}

/// A persistent store of point streams.
///
/// Write methods default to refusing, so read-only adapters only implement
/// the query and registry methods.
#[async_trait]
pub trait PointAdapter: Send + Sync + Debug {
    /// Returns the name of this adapter (e.g. "sqlite").
    fn name(&self) -> &str;

    /// Returns the capabilities of this adapter.
    fn options(&self) -> AdapterOptions;

    /// Attempts to establish the connection.
    async fn connect(&self) -> Result<()>;

    /// Returns true if the adapter is currently connected.
    fn is_connected(&self) -> bool;

    /// Returns the single-bound query capability, if the adapter has one.
    fn bounded(&self) -> Option<&dyn BoundedQuery> {
        None
    }

    /// Selects all points for `id` within `range`, ordered by time.
    async fn select_range(&self, id: &str, range: TimeRange) -> Result<Vec<Point>>;

    /// Stores one point.
    async fn insert_single(&self, id: &str, _point: Point) -> Result<()> {
        Err(CacheError::ReadOnly(format!("{}: cannot insert into {id}", self.name())))
    }

    /// Stores a batch of points.
    async fn insert_range(&self, id: &str, _points: &[Point]) -> Result<()> {
        Err(CacheError::ReadOnly(format!("{}: cannot insert into {id}", self.name())))
    }

    /// Opens a bulk-operation scope.
    async fn begin_transaction(&self) -> Result<()> {
        Ok(())
    }

    /// Closes the bulk-operation scope opened by [`Self::begin_transaction`].
    async fn end_transaction(&self) -> Result<()> {
        Ok(())
    }

    /// Returns every registered identifier with its recorded units.
    async fn id_units_list(&self) -> Result<IdentifierUnitsList>;

    /// Registers an identifier; returns false if the store refused it.
    async fn insert_identifier_and_units(&self, id: &str, units: Units) -> Result<bool>;

    /// Records units for an identifier that has none.
    async fn assign_units_to_record(&self, id: &str, _units: Units) -> Result<bool> {
        Err(CacheError::CapabilityMismatch {
            adapter: self.name().to_string(),
            capability: format!("assign units to {id}"),
        })
    }

    /// Removes an identifier and all of its points.
    async fn remove_record(&self, id: &str) -> Result<()>;
}
