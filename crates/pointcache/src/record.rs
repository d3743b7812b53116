//! Point record combining the buffer tier with a backing-store adapter.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use pointcache_core::{
    AdapterOptions, CacheError, FilterType, IdentifierUnitsList, Intersection, Point,
    PointAdapter, PointBuffer, QualityFilterState, Result, TimeRange, Units,
};
use pointcache_store::InMemoryBuffer;

use crate::config::RecordConfig;

/// The most recent range queried from the backing store for one identifier.
///
/// Everything the store held in `range` is known to be in the buffer, so a
/// buffer miss inside it is a definitive miss.
#[derive(Debug, Clone, PartialEq)]
struct LastRequest {
    id: String,
    range: Option<TimeRange>,
}

impl LastRequest {
    fn new(id: &str, range: Option<TimeRange>) -> Self {
        Self {
            id: id.to_string(),
            range,
        }
    }

    fn contains(&self, id: &str, time: i64) -> bool {
        self.id == id && self.range.is_some_and(|r| r.contains(time))
    }

    fn covers(&self, id: &str, range: &TimeRange) -> bool {
        self.id == id && self.range.is_some_and(|r| r.contains_range(range))
    }
}

#[derive(Debug, Clone)]
struct CachedIdentifiers {
    list: IdentifierUnitsList,
    fetched_at: DateTime<Utc>,
}

/// Direction of a bound lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Before,
    After,
}

/// Everything guarded by the record's lock.
#[derive(Debug)]
struct RecordState<B> {
    buffer: B,
    last_request: Option<LastRequest>,
    filter: QualityFilterState,
    identifiers: Option<CachedIdentifiers>,
}

impl<B: PointBuffer> RecordState<B> {
    fn memo_contains(&self, id: &str, time: i64) -> bool {
        self.last_request
            .as_ref()
            .is_some_and(|r| r.contains(id, time))
    }

    fn memo_covers(&self, id: &str, range: &TimeRange) -> bool {
        self.last_request
            .as_ref()
            .is_some_and(|r| r.covers(id, range))
    }

    fn forget_request(&mut self, id: &str) {
        if self.last_request.as_ref().is_some_and(|r| r.id == id) {
            self.last_request = None;
        }
    }

    fn reset_identifier(&mut self, id: &str) {
        self.buffer.reset_identifier(id);
        self.forget_request(id);
    }

    fn flush(&mut self) {
        self.buffer.reset();
        self.last_request = None;
    }

    /// Buffer `points`, all of the store's data within `known`.
    ///
    /// The buffer must stay complete over its own span, so a `known` range that
    /// does not touch the buffered span replaces it. Returns false if the
    /// buffer had to evict.
    fn absorb(&mut self, id: &str, known: TimeRange, points: &[Point]) -> bool {
        if self.buffer.range(id).is_some_and(|c| !c.overlaps(&known)) {
            self.reset_identifier(id);
        }
        let evicted = self.buffer.add_points(id, points);
        if evicted > 0 {
            self.forget_request(id);
        }
        evicted == 0
    }

    /// Buffer freshly written points when the span they extend the buffer to
    /// stays fully known.
    ///
    /// That holds inside the buffered span, between it and a write covered by
    /// the last request, and for a single point into an empty buffer. Any
    /// other write would leave unknown gaps inside the span, so the identifier
    /// is dropped from the buffer instead and the next read goes to the store.
    fn absorb_written(&mut self, id: &str, points: &[Point]) {
        let Some(span) = span_of(points) else {
            return;
        };
        let known = match self.buffer.range(id) {
            Some(cached) => {
                let left = span.start() >= cached.start()
                    || self.memo_covers(id, &TimeRange::new(span.start(), cached.start()));
                let right = span.end() <= cached.end()
                    || self.memo_covers(id, &TimeRange::new(cached.end(), span.end()));
                left && right
            }
            None => points.len() == 1,
        };
        if !known {
            self.reset_identifier(id);
            return;
        }
        if self.buffer.add_points(id, points) > 0 {
            self.forget_request(id);
        }
    }
}

fn span_of(points: &[Point]) -> Option<TimeRange> {
    let first = points.iter().map(|p| p.time).min()?;
    let last = points.iter().map(|p| p.time).max()?;
    Some(TimeRange::new(first, last))
}

/// Merge buffered and fetched points into a time-ordered, deduplicated
/// sequence restricted to `range`. Buffered points win on equal timestamps;
/// among fetched points the first seen wins.
fn merge(buffered: Vec<Point>, fetched: Vec<Point>, range: TimeRange) -> Vec<Point> {
    let mut merged = BTreeMap::new();
    for p in fetched {
        merged.entry(p.time).or_insert(p);
    }
    for p in buffered {
        merged.insert(p.time, p);
    }
    merged
        .into_values()
        .filter(|p| range.contains(p.time))
        .collect()
}

/// A two-tier point cache in front of one backing store.
///
/// Reads are answered from the buffer tier when possible; misses are fetched
/// from the adapter, passed through the quality filter, merged with what the
/// buffer already holds and written back. The most recent backing-store query
/// is remembered so that repeated misses inside it never reach the store.
///
/// All state lives behind one lock that every lookup, write, reset and filter
/// change holds for its whole duration, adapter calls included.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use pointcache::{DbPointRecord, SqliteAdapter, TimeRange, Units};
///
/// let record = DbPointRecord::new(Arc::new(SqliteAdapter::new("points.db")));
/// record.connect().await?;
/// record.register_identifier("tank_level", Units::METER).await;
/// let points = record.points_in_range("tank_level", TimeRange::new(0, 86_400)).await;
/// ```
#[derive(Debug)]
pub struct DbPointRecord<B = InMemoryBuffer> {
    adapter: Arc<dyn PointAdapter>,
    options: AdapterOptions,
    config: RecordConfig,
    read_only: AtomicBool,
    state: Mutex<RecordState<B>>,
}

impl DbPointRecord<InMemoryBuffer> {
    /// Create a record with an unbounded in-memory buffer and default settings.
    #[must_use]
    pub fn new(adapter: Arc<dyn PointAdapter>) -> Self {
        Self::with_config(adapter, RecordConfig::default())
    }

    /// Create a record with an unbounded in-memory buffer.
    #[must_use]
    pub fn with_config(adapter: Arc<dyn PointAdapter>, config: RecordConfig) -> Self {
        Self::with_buffer(adapter, InMemoryBuffer::new(), config)
    }
}

impl<B: PointBuffer> DbPointRecord<B> {
    /// Create a record over a caller-supplied buffer tier.
    #[must_use]
    pub fn with_buffer(adapter: Arc<dyn PointAdapter>, buffer: B, config: RecordConfig) -> Self {
        let options = adapter.options();
        let state = RecordState {
            buffer,
            last_request: None,
            filter: config.quality_filter(),
            identifiers: None,
        };
        let record = Self {
            adapter,
            options,
            read_only: AtomicBool::new(false),
            state: Mutex::new(state),
            config,
        };
        record.set_read_only(record.config.read_only);
        record
    }

    /// The adapter's declared capabilities.
    #[must_use]
    pub const fn adapter_options(&self) -> AdapterOptions {
        self.options
    }

    /// The record's configuration.
    #[must_use]
    pub const fn config(&self) -> &RecordConfig {
        &self.config
    }

    // Connection

    async fn try_connect(&self) -> Result<()> {
        if self.adapter.is_connected() {
            return Ok(());
        }
        let mut last_error = None;
        for attempt in 1..=self.config.connect_attempts.max(1) {
            match self.adapter.connect().await {
                Ok(()) if self.adapter.is_connected() => return Ok(()),
                Ok(()) => {}
                Err(e) => {
                    debug!(adapter = self.adapter.name(), attempt, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            CacheError::Connection(format!("{} did not connect", self.adapter.name()))
        }))
    }

    async fn check_connected(&self) -> bool {
        self.try_connect().await.is_ok()
    }

    /// Connect to the backing store, retrying up to the configured ceiling.
    ///
    /// # Errors
    /// Returns the last connection error once every attempt has failed.
    #[instrument(skip(self), fields(adapter = self.adapter.name()))]
    pub async fn connect(&self) -> Result<()> {
        self.try_connect().await.map_err(|e| match e {
            CacheError::Connection(_) => e,
            other => CacheError::Connection(other.to_string()),
        })
    }

    /// Returns true if the adapter is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.adapter.is_connected()
    }

    // Read-only policy

    /// Effective read-only mode: the adapter's or the caller's.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.options.read_only || self.read_only.load(Ordering::Acquire)
    }

    /// Request read-only mode. A read-only adapter cannot be made writable, so
    /// the request is ignored for one.
    pub fn set_read_only(&self, read_only: bool) {
        let requested = !self.options.read_only && read_only;
        self.read_only.store(requested, Ordering::Release);
    }

    // Registry

    /// Registered identifiers and their units.
    ///
    /// The backing store's list is reused for `identifier_cache_ttl` seconds;
    /// without a connection the last fetched list, or the buffer's own, is
    /// returned.
    #[instrument(skip(self))]
    pub async fn identifiers_and_units(&self) -> IdentifierUnitsList {
        let mut state = self.state.lock().await;
        self.identifiers_locked(&mut state).await
    }

    async fn identifiers_locked(&self, state: &mut RecordState<B>) -> IdentifierUnitsList {
        let ttl =
            TimeDelta::try_seconds(self.config.identifier_cache_ttl).unwrap_or(TimeDelta::MAX);
        if let Some(cached) = &state.identifiers {
            if Utc::now() - cached.fetched_at < ttl && !cached.list.is_empty() {
                return cached.list.clone();
            }
        }

        if self.check_connected().await {
            match self.adapter.id_units_list().await {
                Ok(list) => {
                    state.identifiers = Some(CachedIdentifiers {
                        list: list.clone(),
                        fetched_at: Utc::now(),
                    });
                    return list;
                }
                Err(e) => warn!(error = %e, "Failed to fetch identifier list"),
            }
        }

        state
            .identifiers
            .as_ref()
            .map_or_else(|| state.buffer.identifiers_and_units(), |c| c.list.clone())
    }

    /// Register `name` with `units`, reconciling with the backing store's registry.
    ///
    /// Returns false if the name is empty or the registry holds the name with
    /// units that cannot be reconciled under the current permissions. Without a
    /// connection the identifier is registered in the buffer only.
    #[instrument(skip(self), fields(adapter = self.adapter.name()))]
    pub async fn register_identifier(&self, name: &str, units: Units) -> bool {
        if name.is_empty() {
            return false;
        }
        let mut state = self.state.lock().await;

        if !self.check_connected().await {
            debug!("Backing store unreachable, registering locally");
            return state.buffer.register_identifier(name, units);
        }

        let found = self.identifiers_locked(&mut state).await.lookup(name, units);
        let units_match = found.units_match || !self.options.supports_units_column;
        let units_unset = found.exists && found.existing.is_none();

        if self.is_read_only() {
            if found.exists && units_match {
                return state.buffer.register_identifier(name, units);
            }
            if units_unset && self.options.can_assign_units {
                return self.assign_units(&mut state, name, units).await;
            }
            let conflict = CacheError::RegistrationConflict {
                identifier: name.to_string(),
                reason: "read-only store cannot reconcile units".to_string(),
            };
            warn!(error = %conflict, "Registration refused");
            return false;
        }

        let mut exists = found.exists;
        if exists && !units_match {
            if units_unset && self.options.can_assign_units {
                return self.assign_units(&mut state, name, units).await;
            }
            if !units_unset {
                debug!(existing = ?found.existing, "Units differ, replacing record");
                if let Err(e) = self.adapter.remove_record(name).await {
                    warn!(error = %e, "Failed to remove record with stale units");
                    return false;
                }
                state.reset_identifier(name);
                state.identifiers = None;
                exists = false;
            }
        }

        if !exists || !units_match {
            return match self.adapter.insert_identifier_and_units(name, units).await {
                Ok(true) => {
                    state.identifiers = None;
                    state.buffer.register_identifier(name, units)
                }
                Ok(false) => {
                    warn!("Backing store refused identifier");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "Failed to insert identifier");
                    false
                }
            };
        }

        state.buffer.register_identifier(name, units)
    }

    async fn assign_units(&self, state: &mut RecordState<B>, name: &str, units: Units) -> bool {
        match self.adapter.assign_units_to_record(name, units).await {
            Ok(true) => {
                state.identifiers = None;
                state.buffer.register_identifier(name, units)
            }
            Ok(false) => {
                warn!("Backing store did not assign units");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to assign units");
                false
            }
        }
    }

    // Lookups

    async fn select_filtered(
        &self,
        filter: &QualityFilterState,
        id: &str,
        range: TimeRange,
    ) -> Result<Vec<Point>> {
        let raw = self.adapter.select_range(id, range).await?;
        Ok(filter.apply_all(raw))
    }

    /// The point for `id` at exactly `time`.
    ///
    /// On a buffer miss the store is queried for a window of
    /// `point_lookup_window` seconds either side of `time`, and everything
    /// found is buffered.
    #[instrument(skip(self))]
    pub async fn point(&self, id: &str, time: i64) -> Option<Point> {
        let mut state = self.state.lock().await;

        if let Some(p) = state.buffer.point(id, time) {
            debug!("Buffer hit");
            return Some(p);
        }
        if state.memo_contains(id, time) {
            debug!("Covered by last request, no point here");
            return None;
        }
        if !self.check_connected().await {
            return None;
        }

        let window = TimeRange::around(time, self.config.point_lookup_window);
        let points = match self.select_filtered(&state.filter, id, window).await {
            Ok(points) => points,
            Err(e) => {
                warn!(error = %e, "Point query failed");
                return None;
            }
        };
        debug!(count = points.len(), "Fetched point window");

        let found = points.iter().find(|p| p.time == time).copied();
        let retained = state.absorb(id, window, &points);
        state.last_request = Some(LastRequest::new(id, retained.then_some(window)));
        found
    }

    /// The latest point strictly before `time`.
    #[instrument(skip(self))]
    pub async fn point_before(&self, id: &str, time: i64) -> Option<Point> {
        let mut state = self.state.lock().await;
        self.bound_locked(&mut state, id, time, Bound::Before).await
    }

    /// The earliest point strictly after `time`.
    #[instrument(skip(self))]
    pub async fn point_after(&self, id: &str, time: i64) -> Option<Point> {
        let mut state = self.state.lock().await;
        self.bound_locked(&mut state, id, time, Bound::After).await
    }

    async fn bound_locked(
        &self,
        state: &mut RecordState<B>,
        id: &str,
        time: i64,
        bound: Bound,
    ) -> Option<Point> {
        // The buffer is complete over its span and over the last request, so
        // its answer stands when either reaches the instant next to `time`.
        let adjacent = match bound {
            Bound::Before => time.saturating_sub(1),
            Bound::After => time.saturating_add(1),
        };
        let buffered = match bound {
            Bound::Before => state.buffer.point_before(id, time),
            Bound::After => state.buffer.point_after(id, time),
        };
        let reaches = state.buffer.range(id).is_some_and(|c| match bound {
            Bound::Before => c.end() >= adjacent,
            Bound::After => c.start() <= adjacent,
        });
        let covered = state.memo_contains(id, adjacent);
        if let Some(p) = buffered.filter(|_| reaches || covered) {
            debug!("Buffer hit");
            return Some(p);
        }
        if covered {
            debug!("Covered by last request, no point here");
            return None;
        }
        if !self.check_connected().await {
            return buffered;
        }

        if self.options.search_iteratively {
            if let Some(p) = self.search_iteratively(state, id, time, bound).await {
                return Some(p);
            }
        }
        self.select_bounded(&state.filter, id, time, bound).await
    }

    /// Probe consecutive windows of `iterative_search_stride` seconds walking
    /// away from `time`, stopping at the first window holding data.
    async fn search_iteratively(
        &self,
        state: &mut RecordState<B>,
        id: &str,
        time: i64,
        bound: Bound,
    ) -> Option<Point> {
        let stride = self.config.iterative_search_stride.max(1);
        let mut window = match bound {
            Bound::Before => TimeRange::new(time.saturating_sub(stride), time.saturating_sub(1)),
            Bound::After => TimeRange::new(time.saturating_add(1), time.saturating_add(stride)),
        };

        for iteration in 0..self.config.iterative_search_max_iterations {
            let points = self.points_in_range_locked(state, id, window).await;
            let found = match bound {
                Bound::Before => points.last(),
                Bound::After => points.first(),
            };
            if let Some(p) = found {
                debug!(iteration, "Iterative search found a point");
                return Some(*p);
            }
            window = match bound {
                Bound::Before => TimeRange::new(
                    window.start().saturating_sub(stride),
                    window.end().saturating_sub(stride),
                ),
                Bound::After => TimeRange::new(
                    window.start().saturating_add(stride),
                    window.end().saturating_add(stride),
                ),
            };
        }
        None
    }

    async fn select_bounded(
        &self,
        filter: &QualityFilterState,
        id: &str,
        time: i64,
        bound: Bound,
    ) -> Option<Point> {
        if !self.options.supports_singly_bounded_query {
            return None;
        }
        let Some(query) = self.adapter.bounded() else {
            let mismatch = CacheError::CapabilityMismatch {
                adapter: self.adapter.name().to_string(),
                capability: "singly bounded query".to_string(),
            };
            warn!(error = %mismatch, "Adapter declared a capability it does not expose");
            return None;
        };

        let result = match bound {
            Bound::Before => query.select_previous(id, time).await,
            Bound::After => query.select_next(id, time).await,
        };
        match result {
            Ok(point) => point.and_then(|p| filter.apply(p)),
            Err(e) => {
                warn!(error = %e, "Bound query failed");
                None
            }
        }
    }

    /// All points for `id` within `range`, ordered by time with distinct
    /// timestamps.
    ///
    /// Only the parts of `range` the buffer does not already hold are fetched
    /// from the backing store.
    #[instrument(skip(self), fields(range = %range))]
    pub async fn points_in_range(&self, id: &str, range: TimeRange) -> Vec<Point> {
        let mut state = self.state.lock().await;
        self.points_in_range_locked(&mut state, id, range).await
    }

    async fn points_in_range_locked(
        &self,
        state: &mut RecordState<B>,
        id: &str,
        range: TimeRange,
    ) -> Vec<Point> {
        if state.memo_covers(id, &range) {
            debug!("Covered by last request, serving from buffer");
            return state.buffer.points_in_range(id, range);
        }
        if !self.check_connected().await {
            return state.buffer.points_in_range(id, range);
        }

        let cached = state.buffer.range(id);
        let intersection = cached.map_or(Intersection::Disjoint, |c| c.classify(&range));
        debug!(?intersection, ?cached, "Reconciling with buffer");

        let filter = &state.filter;
        let fetched = match (intersection, cached) {
            (Intersection::Internal, _) => return state.buffer.points_in_range(id, range),
            (Intersection::LeftOverlap, Some(c)) => {
                let left = TimeRange::new(range.start(), c.start());
                self.select_filtered(filter, id, left).await.map(|fetched| {
                    let middle = TimeRange::new(c.start(), range.end());
                    (state.buffer.points_in_range(id, middle), fetched)
                })
            }
            (Intersection::RightOverlap, Some(c)) => {
                let right = TimeRange::new(c.end(), range.end());
                self.select_filtered(filter, id, right).await.map(|fetched| {
                    let middle = TimeRange::new(range.start(), c.end());
                    (state.buffer.points_in_range(id, middle), fetched)
                })
            }
            (Intersection::External, Some(c)) => {
                let left = TimeRange::new(range.start(), c.start());
                let right = TimeRange::new(c.end(), range.end());
                match self.select_filtered(filter, id, left).await {
                    Ok(mut fetched) => self.select_filtered(filter, id, right).await.map(|r| {
                        fetched.extend(r);
                        (state.buffer.points_in_range(id, c), fetched)
                    }),
                    Err(e) => Err(e),
                }
            }
            _ => self
                .select_filtered(filter, id, range)
                .await
                .map(|fetched| (Vec::new(), fetched)),
        };

        let (buffered, fetched) = match fetched {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Range query failed, serving from buffer");
                return state.buffer.points_in_range(id, range);
            }
        };

        let merged = merge(buffered, fetched, range);
        let retained = state.absorb(id, range, &merged);
        let memo = (retained && !merged.is_empty()).then_some(range);
        state.last_request = Some(LastRequest::new(id, memo));
        debug!(count = merged.len(), "Range reconciled");
        merged
    }

    // Writes

    /// Write one point through to the backing store and the buffer.
    ///
    /// A point that cannot join the buffered span without leaving unknown gaps
    /// resets the identifier instead, so the next read of it goes to the store.
    ///
    /// Returns false without writing anything if the record is read-only, the
    /// store is unreachable or the store rejects the point.
    #[instrument(skip(self, point))]
    pub async fn add_point(&self, id: &str, point: Point) -> bool {
        let mut state = self.state.lock().await;
        if !self.writable().await {
            return false;
        }
        match self.adapter.insert_single(id, point).await {
            Ok(()) => {
                state.absorb_written(id, &[point]);
                true
            }
            Err(e) => {
                warn!(error = %e, "Insert failed");
                false
            }
        }
    }

    /// Write a batch of points through to the backing store and the buffer.
    ///
    /// Batches are buffered only inside the buffered span or the last request;
    /// any other batch resets the identifier, and the next read of it goes to
    /// the store.
    ///
    /// Returns false without writing anything if the record is read-only, the
    /// store is unreachable or the store rejects the batch.
    #[instrument(skip(self, points), fields(count = points.len()))]
    pub async fn add_points(&self, id: &str, points: &[Point]) -> bool {
        let mut state = self.state.lock().await;
        if !self.writable().await {
            return false;
        }
        if points.is_empty() {
            return true;
        }
        match self.adapter.insert_range(id, points).await {
            Ok(()) => {
                state.absorb_written(id, points);
                true
            }
            Err(e) => {
                warn!(error = %e, "Batch insert failed");
                false
            }
        }
    }

    async fn writable(&self) -> bool {
        if self.is_read_only() {
            debug!("Read-only, dropping write");
            return false;
        }
        if !self.check_connected().await {
            debug!("Backing store unreachable, dropping write");
            return false;
        }
        true
    }

    /// Open a bulk-operation scope on the backing store.
    ///
    /// A no-op while the store is unreachable.
    ///
    /// # Errors
    /// Propagates the adapter's transaction error.
    #[instrument(skip(self))]
    pub async fn begin_bulk_operation(&self) -> Result<()> {
        if self.check_connected().await {
            self.adapter.begin_transaction().await?;
        }
        Ok(())
    }

    /// Close the scope opened by [`Self::begin_bulk_operation`].
    ///
    /// # Errors
    /// Propagates the adapter's transaction error.
    #[instrument(skip(self))]
    pub async fn end_bulk_operation(&self) -> Result<()> {
        if self.check_connected().await {
            self.adapter.end_transaction().await?;
        }
        Ok(())
    }

    // Reset

    /// Drop every buffered point and the remembered request.
    #[instrument(skip(self))]
    pub async fn reset(&self) {
        self.state.lock().await.flush();
    }

    /// Drop the buffered points and remembered request for `id`.
    #[instrument(skip(self))]
    pub async fn reset_identifier(&self, id: &str) {
        self.state.lock().await.reset_identifier(id);
    }

    /// Remove `id` from the backing store, then reset it.
    ///
    /// Returns false if the record is read-only, the store is unreachable or
    /// the removal fails.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        if !self.writable().await {
            return false;
        }
        if let Err(e) = self.adapter.remove_record(id).await {
            warn!(error = %e, "Failed to remove record");
            return false;
        }
        state.reset_identifier(id);
        state.identifiers = None;
        true
    }

    // Quality filter

    /// The active quality filter.
    pub async fn quality_filter(&self) -> QualityFilterState {
        self.state.lock().await.filter.clone()
    }

    /// The active filter mode.
    pub async fn filter_type(&self) -> FilterType {
        self.state.lock().await.filter.filter_type
    }

    /// The quality codes consulted by the white and black lists.
    pub async fn filter_codes(&self) -> BTreeSet<u32> {
        self.state.lock().await.filter.codes.clone()
    }

    /// Switch the filter mode; a change flushes the buffer.
    #[instrument(skip(self))]
    pub async fn set_filter_type(&self, filter_type: FilterType) {
        let mut state = self.state.lock().await;
        if state.filter.filter_type != filter_type {
            state.filter.filter_type = filter_type;
            state.flush();
        }
    }

    /// Replace the filter mode and code set; a change flushes the buffer.
    #[instrument(skip(self))]
    pub async fn set_quality_filter(&self, filter: QualityFilterState) {
        let mut state = self.state.lock().await;
        if state.filter != filter {
            state.filter = filter;
            state.flush();
        }
    }

    /// Add a quality code to the set and flush the buffer.
    #[instrument(skip(self))]
    pub async fn add_filter_code(&self, code: u32) {
        let mut state = self.state.lock().await;
        state.filter.codes.insert(code);
        state.flush();
    }

    /// Remove a quality code from the set, flushing the buffer if it was present.
    #[instrument(skip(self))]
    pub async fn remove_filter_code(&self, code: u32) {
        let mut state = self.state.lock().await;
        if state.filter.codes.remove(&code) {
            state.flush();
        }
    }

    /// Empty the code set and flush the buffer.
    #[instrument(skip(self))]
    pub async fn clear_filter_codes(&self) {
        let mut state = self.state.lock().await;
        state.filter.codes.clear();
        state.flush();
    }
}

#[cfg(test)]
mod tests;
