use super::*;

use async_trait::async_trait;
use pointcache_core::BoundedQuery;
use pointcache_store::NoopAdapter;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::AtomicUsize;

#[derive(Debug, Default)]
struct Calls {
    selects: Vec<(String, TimeRange)>,
    previous: usize,
    next: usize,
    inserted: Vec<Point>,
    removals: Vec<String>,
    registered: Vec<String>,
    assigned: Vec<String>,
    transactions: (usize, usize),
}

/// Backing store double that records every call it receives.
#[derive(Debug)]
struct MockAdapter {
    options: AdapterOptions,
    reachable: bool,
    expose_bounded: bool,
    connected: AtomicBool,
    connects: AtomicUsize,
    id_lists: AtomicUsize,
    data: StdMutex<HashMap<String, BTreeMap<i64, Point>>>,
    registry: StdMutex<IdentifierUnitsList>,
    calls: StdMutex<Calls>,
}

impl MockAdapter {
    fn new(options: AdapterOptions) -> Self {
        Self {
            options,
            reachable: true,
            expose_bounded: true,
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            id_lists: AtomicUsize::new(0),
            data: StdMutex::new(HashMap::new()),
            registry: StdMutex::new(IdentifierUnitsList::new()),
            calls: StdMutex::new(Calls::default()),
        }
    }

    fn writable() -> Self {
        Self::new(AdapterOptions {
            supports_units_column: true,
            ..AdapterOptions::default()
        })
    }

    fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    fn without_bounded(mut self) -> Self {
        self.expose_bounded = false;
        self
    }

    fn with_points(self, id: &str, points: &[Point]) -> Self {
        {
            let mut data = self.data.lock().unwrap();
            let series = data.entry(id.to_string()).or_default();
            for p in points {
                series.insert(p.time, *p);
            }
        }
        self
    }

    fn with_identifier(self, id: &str, units: Option<Units>) -> Self {
        self.registry.lock().unwrap().insert(id, units);
        self
    }

    fn selects(&self) -> Vec<TimeRange> {
        self.calls
            .lock()
            .unwrap()
            .selects
            .iter()
            .map(|(_, r)| *r)
            .collect()
    }

    fn select_count(&self) -> usize {
        self.calls.lock().unwrap().selects.len()
    }
}

#[async_trait]
impl BoundedQuery for MockAdapter {
    async fn select_previous(&self, id: &str, time: i64) -> Result<Option<Point>> {
        self.calls.lock().unwrap().previous += 1;
        let data = self.data.lock().unwrap();
        Ok(data
            .get(id)
            .and_then(|s| s.range(..time).next_back().map(|(_, p)| *p)))
    }

    async fn select_next(&self, id: &str, time: i64) -> Result<Option<Point>> {
        self.calls.lock().unwrap().next += 1;
        let data = self.data.lock().unwrap();
        Ok(data
            .get(id)
            .and_then(|s| s.range(time + 1..).next().map(|(_, p)| *p)))
    }
}

#[async_trait]
impl PointAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    fn options(&self) -> AdapterOptions {
        self.options
    }

    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.reachable {
            return Err(CacheError::Connection("mock unreachable".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.reachable && self.connected.load(Ordering::SeqCst)
    }

    fn bounded(&self) -> Option<&dyn BoundedQuery> {
        if self.expose_bounded { Some(self) } else { None }
    }

    async fn select_range(&self, id: &str, range: TimeRange) -> Result<Vec<Point>> {
        self.calls
            .lock()
            .unwrap()
            .selects
            .push((id.to_string(), range));
        let data = self.data.lock().unwrap();
        Ok(data.get(id).map_or_else(Vec::new, |s| {
            s.range(range.start()..=range.end())
                .map(|(_, p)| *p)
                .collect()
        }))
    }

    async fn insert_single(&self, id: &str, point: Point) -> Result<()> {
        self.insert_range(id, &[point]).await
    }

    async fn insert_range(&self, id: &str, points: &[Point]) -> Result<()> {
        if self.options.read_only {
            return Err(CacheError::ReadOnly("mock".to_string()));
        }
        self.calls.lock().unwrap().inserted.extend_from_slice(points);
        let mut data = self.data.lock().unwrap();
        let series = data.entry(id.to_string()).or_default();
        for p in points {
            series.insert(p.time, *p);
        }
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.calls.lock().unwrap().transactions.0 += 1;
        Ok(())
    }

    async fn end_transaction(&self) -> Result<()> {
        self.calls.lock().unwrap().transactions.1 += 1;
        Ok(())
    }

    async fn id_units_list(&self) -> Result<IdentifierUnitsList> {
        self.id_lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.registry.lock().unwrap().clone())
    }

    async fn insert_identifier_and_units(&self, id: &str, units: Units) -> Result<bool> {
        self.calls.lock().unwrap().registered.push(id.to_string());
        let mut registry = self.registry.lock().unwrap();
        match registry.get(id) {
            Some(existing) => Ok(existing == Some(units)),
            None => {
                registry.insert(id, Some(units));
                Ok(true)
            }
        }
    }

    async fn assign_units_to_record(&self, id: &str, units: Units) -> Result<bool> {
        self.calls.lock().unwrap().assigned.push(id.to_string());
        let mut registry = self.registry.lock().unwrap();
        if registry.get(id) == Some(None) {
            registry.insert(id, Some(units));
            return Ok(true);
        }
        Ok(false)
    }

    async fn remove_record(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().removals.push(id.to_string());
        self.data.lock().unwrap().remove(id);
        let remaining: IdentifierUnitsList = self
            .registry
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name != id)
            .map(|(name, units)| (name.to_string(), units))
            .collect();
        *self.registry.lock().unwrap() = remaining;
        Ok(())
    }
}

fn points(pairs: &[(i64, f64)]) -> Vec<Point> {
    pairs.iter().map(|&(t, v)| Point::new(t, v)).collect()
}

fn times(points: &[Point]) -> Vec<i64> {
    points.iter().map(|p| p.time).collect()
}

fn record(adapter: &Arc<MockAdapter>) -> DbPointRecord {
    DbPointRecord::new(adapter.clone())
}

fn record_with(adapter: &Arc<MockAdapter>, config: RecordConfig) -> DbPointRecord {
    DbPointRecord::with_config(adapter.clone(), config)
}

/// Record whose buffer already holds `buffered` for "A".
fn primed(adapter: &Arc<MockAdapter>, buffered: &[(i64, f64)]) -> DbPointRecord {
    let mut buffer = InMemoryBuffer::new();
    buffer.add_points("A", &points(buffered));
    DbPointRecord::with_buffer(adapter.clone(), buffer, RecordConfig::default())
}

#[tokio::test]
async fn test_range_fetched_once_then_buffered() {
    let adapter =
        Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (200, 2.0)])));
    let record = record(&adapter);

    let first = record.points_in_range("A", TimeRange::new(50, 250)).await;
    assert_eq!(adapter.selects(), vec![TimeRange::new(50, 250)]);
    assert_eq!(times(&first), vec![100, 200]);
    assert_eq!(first[0].value, 1.0);
    assert_eq!(first[1].value, 2.0);

    let second = record.points_in_range("A", TimeRange::new(50, 250)).await;
    assert_eq!(second, first);
    assert_eq!(adapter.select_count(), 1);

    // Internal to the buffer and covered by the last request.
    let inner = record.points_in_range("A", TimeRange::new(100, 200)).await;
    assert_eq!(times(&inner), vec![100, 200]);
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_range_results_distinct_and_idempotent() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(10, 0.1), (100, 1.0), (150, 1.5), (200, 2.0), (300, 3.0)]),
    ));
    let record = primed(&adapter, &[(100, 1.0), (200, 2.0)]);
    let query = TimeRange::new(50, 250);

    let mut previous = None;
    for _ in 0..3 {
        let result = record.points_in_range("A", query).await;
        assert!(result.windows(2).all(|w| w[0].time < w[1].time));
        assert!(result.iter().all(|p| query.contains(p.time)));
        if let Some(prev) = &previous {
            assert_eq!(&result, prev);
        }
        previous = Some(result);
    }
}

#[tokio::test]
async fn test_internal_range_served_from_buffer() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = primed(&adapter, &[(100, 1.0), (150, 1.5), (200, 2.0)]);

    let result = record.points_in_range("A", TimeRange::new(120, 180)).await;
    assert_eq!(times(&result), vec![150]);
    assert_eq!(adapter.select_count(), 0);
}

#[tokio::test]
async fn test_left_overlap_fetches_left_gap_only() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(75, 0.75), (100, 1.0), (150, 1.5), (200, 2.0)]),
    ));
    let record = primed(&adapter, &[(100, 1.0), (150, 1.5), (200, 2.0)]);

    let result = record.points_in_range("A", TimeRange::new(50, 150)).await;
    assert_eq!(adapter.selects(), vec![TimeRange::new(50, 100)]);
    assert_eq!(times(&result), vec![75, 100, 150]);
}

#[tokio::test]
async fn test_right_overlap_fetches_right_gap_only() {
    let adapter = Arc::new(
        MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (200, 2.0), (250, 2.5)])),
    );
    let record = primed(&adapter, &[(100, 1.0), (200, 2.0)]);

    let result = record.points_in_range("A", TimeRange::new(150, 300)).await;
    assert_eq!(adapter.selects(), vec![TimeRange::new(200, 300)]);
    assert_eq!(times(&result), vec![200, 250]);
}

#[tokio::test]
async fn test_external_fetches_both_gaps() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(60, 0.6), (100, 1.0), (200, 2.0), (280, 2.8)]),
    ));
    let record = primed(&adapter, &[(100, 1.0), (200, 2.0)]);

    let result = record.points_in_range("A", TimeRange::new(50, 300)).await;
    assert_eq!(
        adapter.selects(),
        vec![TimeRange::new(50, 100), TimeRange::new(200, 300)]
    );
    assert_eq!(times(&result), vec![60, 100, 200, 280]);
}

#[tokio::test]
async fn test_buffer_wins_at_shared_boundary() {
    let adapter = Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 9.0)])));
    let record = primed(&adapter, &[(100, 1.0), (200, 2.0)]);

    let result = record.points_in_range("A", TimeRange::new(50, 150)).await;
    assert_eq!(times(&result), vec![100]);
    assert_eq!(result[0].value, 1.0);
}

#[tokio::test]
async fn test_disjoint_query_replaces_buffer_span() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(100, 1.0), (200, 2.0), (1000, 10.0)]),
    ));
    let record = primed(&adapter, &[(100, 1.0), (200, 2.0)]);

    let far = record.points_in_range("A", TimeRange::new(900, 1100)).await;
    assert_eq!(times(&far), vec![1000]);
    assert_eq!(adapter.selects(), vec![TimeRange::new(900, 1100)]);

    // The old span was dropped, so the gap between spans is fetched again.
    let near = record.points_in_range("A", TimeRange::new(50, 250)).await;
    assert_eq!(times(&near), vec![100, 200]);
    assert_eq!(adapter.select_count(), 2);
}

#[tokio::test]
async fn test_point_memoized_miss() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = record(&adapter);

    assert!(record.point("A", 500).await.is_none());
    assert_eq!(adapter.select_count(), 1);
    assert!(record.point("A", 500).await.is_none());
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_point_fetches_window() {
    let adapter =
        Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (200, 2.0)])));
    let record = record_with(&adapter, RecordConfig::new().with_point_lookup_window(1_000));

    let p = record.point("A", 100).await;
    assert_eq!(p.map(|p| p.value), Some(1.0));
    assert_eq!(adapter.selects(), vec![TimeRange::new(-900, 1_100)]);

    // Neighbours came back with the window.
    assert_eq!(record.point("A", 200).await.map(|p| p.value), Some(2.0));
    assert!(record.point("A", 150).await.is_none());
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_bound_lookup_from_buffer() {
    let adapter = Arc::new(
        MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (300, 3.0), (500, 5.0)])),
    );
    let record = record(&adapter);
    record.points_in_range("A", TimeRange::new(0, 1000)).await;

    assert_eq!(record.point_before("A", 300).await.map(|p| p.time), Some(100));
    assert_eq!(record.point_after("A", 300).await.map(|p| p.time), Some(500));
    assert_eq!(adapter.select_count(), 1);
    let calls = adapter.calls.lock().unwrap();
    assert_eq!((calls.previous, calls.next), (0, 0));
}

#[tokio::test]
async fn test_bound_lookup_within_last_request() {
    let options = AdapterOptions {
        supports_singly_bounded_query: true,
        ..AdapterOptions::default()
    };
    let adapter =
        Arc::new(MockAdapter::new(options).with_points("A", &points(&[(100, 1.0), (200, 2.0)])));
    let record = record(&adapter);
    record.points_in_range("A", TimeRange::new(50, 250)).await;

    assert_eq!(record.point_before("A", 240).await.map(|p| p.time), Some(200));
    assert_eq!(record.point_after("A", 60).await.map(|p| p.time), Some(100));

    // Nothing on the far side of the buffer within the last request.
    assert!(record.point_before("A", 60).await.is_none());
    assert!(record.point_after("A", 240).await.is_none());

    assert_eq!(adapter.select_count(), 1);
    let calls = adapter.calls.lock().unwrap();
    assert_eq!((calls.previous, calls.next), (0, 0));
}

#[tokio::test]
async fn test_bound_lookup_after_point_miss() {
    let adapter = Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0)])));
    let record = record(&adapter);

    assert!(record.point("A", 500).await.is_none());
    assert_eq!(record.point_before("A", 500).await.map(|p| p.time), Some(100));
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_bound_lookup_uses_bounded_query() {
    let options = AdapterOptions {
        supports_singly_bounded_query: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(MockAdapter::new(options).with_points("A", &points(&[(10, 0.1)])));
    let record = record(&adapter);

    assert_eq!(record.point_before("A", 1000).await.map(|p| p.time), Some(10));
    assert!(record.point_after("A", 1000).await.is_none());
    let calls = adapter.calls.lock().unwrap();
    assert_eq!((calls.previous, calls.next), (1, 1));
    assert!(calls.selects.is_empty());
}

#[tokio::test]
async fn test_bounded_query_is_filtered() {
    let options = AdapterOptions {
        supports_singly_bounded_query: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(MockAdapter::new(options).with_points(
        "A",
        &[Point::new(10, 0.1).with_quality(1)],
    ));
    let config = RecordConfig::new().with_filter(FilterType::WhiteList, [0]);
    let record = record_with(&adapter, config);

    assert!(record.point_before("A", 1000).await.is_none());
}

#[tokio::test]
async fn test_capability_mismatch_is_guarded() {
    let declared = AdapterOptions {
        supports_singly_bounded_query: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(
        MockAdapter::new(declared)
            .without_bounded()
            .with_points("A", &points(&[(10, 0.1)])),
    );
    let record = record(&adapter);
    assert!(record.point_before("A", 1000).await.is_none());

    let undeclared = Arc::new(MockAdapter::writable().with_points("A", &points(&[(10, 0.1)])));
    let record = DbPointRecord::new(undeclared.clone());
    assert!(record.point_before("A", 1000).await.is_none());
    assert_eq!(undeclared.calls.lock().unwrap().previous, 0);
}

#[tokio::test]
async fn test_iterative_search() {
    let options = AdapterOptions {
        search_iteratively: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(
        MockAdapter::new(options).with_points("A", &points(&[(620, 6.2), (650, 6.5), (1450, 14.5)])),
    );
    let config = RecordConfig::new().with_iterative_search(8, 100);
    let record = record_with(&adapter, config);

    let before = record.point_before("A", 1000).await;
    assert_eq!(before.map(|p| p.time), Some(650));
    assert_eq!(
        adapter.selects(),
        vec![
            TimeRange::new(900, 999),
            TimeRange::new(800, 899),
            TimeRange::new(700, 799),
            TimeRange::new(600, 699),
        ]
    );

    let after = record.point_after("A", 1000).await;
    assert_eq!(after.map(|p| p.time), Some(1450));
}

#[tokio::test]
async fn test_iterative_search_gives_up() {
    let options = AdapterOptions {
        search_iteratively: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(MockAdapter::new(options).with_points("A", &points(&[(0, 0.0)])));
    let config = RecordConfig::new().with_iterative_search(3, 10);
    let record = record_with(&adapter, config);

    assert!(record.point_before("A", 1000).await.is_none());
    assert_eq!(adapter.select_count(), 3);
}

#[tokio::test]
async fn test_white_list_overrides_quality() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &[
            Point::new(100, 1.0).with_quality(0),
            Point::new(200, 2.0).with_quality(1),
        ],
    ));
    let config = RecordConfig::new().with_filter(FilterType::WhiteList, [0]);
    let record = record_with(&adapter, config);

    let result = record.points_in_range("A", TimeRange::new(0, 300)).await;
    assert_eq!(times(&result), vec![100]);
    assert_eq!(result[0].quality, Point::QUALITY_OVERRIDE);
    assert!(result[0].is_overridden());
}

#[tokio::test]
async fn test_filter_change_flushes_buffer() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &[
            Point::new(100, 1.0).with_quality(0),
            Point::new(200, 2.0).with_quality(1),
        ],
    ));
    let record = record(&adapter);
    let range = TimeRange::new(0, 300);

    assert_eq!(record.points_in_range("A", range).await.len(), 2);
    record.set_filter_type(FilterType::PassThrough).await;
    record.points_in_range("A", range).await;
    assert_eq!(adapter.select_count(), 1);

    record.set_filter_type(FilterType::BlackList).await;
    record.add_filter_code(1).await;
    let result = record.points_in_range("A", range).await;
    assert_eq!(times(&result), vec![100]);
    assert_eq!(adapter.select_count(), 2);

    record.remove_filter_code(7).await;
    record.points_in_range("A", range).await;
    assert_eq!(adapter.select_count(), 2);

    record.clear_filter_codes().await;
    assert_eq!(record.points_in_range("A", range).await.len(), 2);
    assert_eq!(adapter.select_count(), 3);
    assert_eq!(record.filter_type().await, FilterType::BlackList);
    assert!(record.filter_codes().await.is_empty());
}

#[tokio::test]
async fn test_set_quality_filter() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = record(&adapter);
    let filter = QualityFilterState::new(FilterType::CodesToValues, [3]);

    record.set_quality_filter(filter.clone()).await;
    assert_eq!(record.quality_filter().await, filter);
}

#[tokio::test]
async fn test_read_only_registration_and_writes() {
    let options = AdapterOptions {
        read_only: true,
        supports_units_column: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(MockAdapter::new(options).with_identifier("x", Some(Units::METER)));
    let record = record(&adapter);

    assert!(record.is_read_only());
    assert!(record.register_identifier("x", Units::METER).await);
    assert!(!record.add_point("x", Point::new(1, 1.0)).await);
    assert!(!record.add_points("x", &points(&[(2, 2.0), (3, 3.0)])).await);
    assert!(!record.invalidate("x").await);

    let calls = adapter.calls.lock().unwrap();
    assert!(calls.inserted.is_empty());
    assert!(calls.registered.is_empty());
    assert!(calls.removals.is_empty());
}

#[tokio::test]
async fn test_read_only_registration_conflicts() {
    let options = AdapterOptions {
        read_only: true,
        supports_units_column: true,
        can_assign_units: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(
        MockAdapter::new(options)
            .with_identifier("x", Some(Units::FOOT))
            .with_identifier("unset", None),
    );
    let record = record(&adapter);

    assert!(!record.register_identifier("x", Units::METER).await);
    assert!(!record.register_identifier("missing", Units::METER).await);
    assert!(record.register_identifier("unset", Units::METER).await);
    assert_eq!(adapter.calls.lock().unwrap().assigned, vec!["unset"]);
    assert!(!record.register_identifier("", Units::METER).await);
}

#[tokio::test]
async fn test_registration_without_units_column() {
    let options = AdapterOptions {
        read_only: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(MockAdapter::new(options).with_identifier("x", None));
    let record = record(&adapter);

    assert!(record.register_identifier("x", Units::PSI).await);
}

#[tokio::test]
async fn test_writable_registration() {
    let options = AdapterOptions {
        supports_units_column: true,
        can_assign_units: true,
        ..AdapterOptions::default()
    };
    let adapter = Arc::new(
        MockAdapter::new(options)
            .with_identifier("same", Some(Units::METER))
            .with_identifier("stale", Some(Units::FOOT))
            .with_identifier("unset", None)
            .with_points("stale", &points(&[(1, 1.0)])),
    );
    let record = record(&adapter);

    assert!(record.register_identifier("fresh", Units::SECOND).await);
    assert!(record.register_identifier("same", Units::METER).await);
    assert!(record.register_identifier("unset", Units::METER).await);
    assert!(record.register_identifier("stale", Units::METER).await);

    {
        let calls = adapter.calls.lock().unwrap();
        assert_eq!(calls.registered, vec!["fresh", "stale"]);
        assert_eq!(calls.assigned, vec!["unset"]);
        assert_eq!(calls.removals, vec!["stale"]);
    }

    let ids = record.identifiers_and_units().await;
    assert_eq!(ids.get("stale"), Some(Some(Units::METER)));
    assert_eq!(ids.get("unset"), Some(Some(Units::METER)));
    assert_eq!(ids.get("fresh"), Some(Some(Units::SECOND)));
}

#[tokio::test]
async fn test_identifier_list_is_cached() {
    let adapter = Arc::new(MockAdapter::writable().with_identifier("x", Some(Units::METER)));
    let record = record(&adapter);

    assert_eq!(record.identifiers_and_units().await.len(), 1);
    assert_eq!(record.identifiers_and_units().await.len(), 1);
    assert_eq!(adapter.id_lists.load(Ordering::SeqCst), 1);

    // A registry mutation forces a refetch.
    assert!(record.register_identifier("y", Units::METER).await);
    assert_eq!(record.identifiers_and_units().await.len(), 2);
    assert_eq!(adapter.id_lists.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_writes_reach_adapter_and_buffer() {
    let adapter =
        Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (200, 2.0)])));
    let record = record(&adapter);
    let range = TimeRange::new(0, 1000);
    record.points_in_range("A", range).await;

    assert!(record.add_point("A", Point::new(150, 1.5)).await);
    let result = record.points_in_range("A", range).await;
    assert_eq!(times(&result), vec![100, 150, 200]);
    assert_eq!(adapter.select_count(), 1);

    // Past the buffered span but inside the last request, so still buffered.
    assert!(record.add_points("A", &points(&[(900, 9.0), (950, 9.5)])).await);
    let result = record.points_in_range("A", range).await;
    assert_eq!(times(&result), vec![100, 150, 200, 900, 950]);
    assert_eq!(adapter.select_count(), 1);

    // Beyond anything known, so the identifier is fetched afresh.
    assert!(record.add_points("A", &points(&[(2000, 20.0), (2100, 21.0)])).await);
    let wide = TimeRange::new(0, 3000);
    let result = record.points_in_range("A", wide).await;
    assert_eq!(times(&result), vec![100, 150, 200, 900, 950, 2000, 2100]);
    assert_eq!(adapter.selects(), vec![range, wide]);
    assert_eq!(adapter.calls.lock().unwrap().inserted.len(), 5);
}

#[tokio::test]
async fn test_single_write_into_empty_buffer() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = record(&adapter);

    assert!(record.add_point("A", Point::new(100, 1.0)).await);
    assert_eq!(record.point("A", 100).await.map(|p| p.value), Some(1.0));
    assert_eq!(adapter.select_count(), 0);

    // A batch into an empty buffer may hide stored points between its ends.
    assert!(record.add_points("B", &points(&[(100, 1.0), (300, 3.0)])).await);
    assert_eq!(record.point("B", 300).await.map(|p| p.value), Some(3.0));
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_caller_read_only() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = record_with(&adapter, RecordConfig::new().with_read_only(true));

    assert!(record.is_read_only());
    assert!(!record.add_point("A", Point::new(1, 1.0)).await);
    record.set_read_only(false);
    assert!(!record.is_read_only());
    assert!(record.add_point("A", Point::new(1, 1.0)).await);

    let options = AdapterOptions {
        read_only: true,
        ..AdapterOptions::default()
    };
    let forced = DbPointRecord::new(Arc::new(MockAdapter::new(options)));
    forced.set_read_only(false);
    assert!(forced.is_read_only());
    assert!(forced.adapter_options().read_only);
    assert!(!record.adapter_options().read_only);
}

#[tokio::test]
async fn test_bulk_operation_delegates() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = record(&adapter);

    record.begin_bulk_operation().await.unwrap();
    assert!(record.add_points("A", &points(&[(1, 1.0), (2, 2.0)])).await);
    record.end_bulk_operation().await.unwrap();
    assert_eq!(adapter.calls.lock().unwrap().transactions, (1, 1));
}

#[tokio::test]
async fn test_invalidate_removes_once() {
    let adapter =
        Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0), (200, 2.0)])));
    let record = record(&adapter);
    let range = TimeRange::new(0, 300);
    assert_eq!(record.points_in_range("A", range).await.len(), 2);

    assert!(record.invalidate("A").await);
    assert_eq!(adapter.calls.lock().unwrap().removals, vec!["A"]);

    assert!(record.points_in_range("A", range).await.is_empty());
    assert!(record.point("A", 100).await.is_none());
    assert!(record.point_before("A", 300).await.is_none());
    assert_eq!(adapter.calls.lock().unwrap().removals.len(), 1);
}

#[tokio::test]
async fn test_reset_forgets_buffer() {
    let adapter = Arc::new(MockAdapter::writable().with_points("A", &points(&[(100, 1.0)])));
    let record = record(&adapter);
    let range = TimeRange::new(0, 300);

    record.points_in_range("A", range).await;
    record.reset_identifier("A").await;
    record.points_in_range("A", range).await;
    assert_eq!(adapter.select_count(), 2);

    record.reset().await;
    record.points_in_range("A", range).await;
    assert_eq!(adapter.select_count(), 3);
}

#[tokio::test]
async fn test_eviction_forgets_last_request() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(100, 1.0), (200, 2.0), (300, 3.0)]),
    ));
    let record = DbPointRecord::with_buffer(
        adapter.clone(),
        InMemoryBuffer::with_capacity(2),
        RecordConfig::default(),
    );
    let range = TimeRange::new(50, 350);

    assert_eq!(times(&record.points_in_range("A", range).await), vec![100, 200, 300]);
    assert_eq!(times(&record.points_in_range("A", range).await), vec![100, 200, 300]);
    assert_eq!(
        adapter.selects(),
        vec![
            TimeRange::new(50, 350),
            TimeRange::new(50, 200),
            TimeRange::new(300, 350),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_store_degrades_to_buffer() {
    let adapter = Arc::new(
        MockAdapter::writable()
            .unreachable()
            .with_points("A", &points(&[(100, 1.0)])),
    );
    let config = RecordConfig::new().with_connect_attempts(3);
    let record = record_with(&adapter, config);

    assert!(matches!(
        record.connect().await,
        Err(CacheError::Connection(_))
    ));
    assert_eq!(adapter.connects.load(Ordering::SeqCst), 3);
    assert!(!record.is_connected());

    assert!(record.point("A", 100).await.is_none());
    assert!(record.points_in_range("A", TimeRange::new(0, 200)).await.is_empty());
    assert!(!record.add_point("A", Point::new(150, 1.5)).await);
    assert!(record.register_identifier("A", Units::METER).await);
    assert!(record.begin_bulk_operation().await.is_ok());
    assert_eq!(adapter.select_count(), 0);
    assert_eq!(
        record.identifiers_and_units().await.get("A"),
        Some(Some(Units::METER))
    );
}

#[tokio::test]
async fn test_noop_adapter_runs_on_buffer() {
    let record = DbPointRecord::new(Arc::new(NoopAdapter::new()));

    assert!(record.connect().await.is_err());
    assert!(record.register_identifier("level", Units::FOOT).await);
    assert!(!record.add_point("level", Point::new(1, 1.0)).await);
    assert!(record.point("level", 1).await.is_none());
    assert!(record.end_bulk_operation().await.is_ok());
}

#[tokio::test]
async fn test_concurrent_reads_share_one_fetch() {
    let adapter = Arc::new(MockAdapter::writable().with_points(
        "A",
        &points(&[(100, 1.0), (200, 2.0), (300, 3.0)]),
    ));
    let record = Arc::new(record(&adapter));
    let range = TimeRange::new(0, 400);

    let tasks = (0..16).map(|_| {
        let record = record.clone();
        async move { record.points_in_range("A", range).await }
    });
    let results = futures::future::join_all(tasks).await;

    assert!(results.iter().all(|r| times(r) == vec![100, 200, 300]));
    assert_eq!(adapter.select_count(), 1);
}

#[tokio::test]
async fn test_concurrent_tasks_on_runtime() {
    let adapter = Arc::new(MockAdapter::writable());
    let record = Arc::new(record(&adapter));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let record = record.clone();
            tokio::spawn(async move {
                let id = format!("series-{i}");
                record.add_point(&id, Point::new(i, i as f64)).await;
                record.point(&id, i).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let point = handle.await.unwrap();
        assert_eq!(point.map(|p| p.time), Some(i as i64));
    }
}
