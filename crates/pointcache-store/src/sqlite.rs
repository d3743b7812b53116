//! SQLite backing store.

use async_trait::async_trait;
use pointcache_core::{
    AdapterOptions, BoundedQuery, CacheError, IdentifierUnitsList, Point, PointAdapter, Result,
    TimeRange, Units,
};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

/// SQLite-backed point store.
///
/// Holds a registry table (`identifiers`) with an optional JSON units column and
/// a `points` table keyed by `(identifier, time)`. The connection is opened
/// lazily by [`PointAdapter::connect`] and serialized behind a mutex; queries run
/// on the calling task.
#[derive(Debug)]
pub struct SqliteAdapter {
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
    options: AdapterOptions,
}

impl SqliteAdapter {
    /// Create an adapter for the database file at `path`.
    ///
    /// The file is not opened until [`PointAdapter::connect`] is called.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_path(Some(path.as_ref().to_path_buf()))
    }

    /// Create an adapter over a private in-memory database.
    ///
    /// Useful for testing; data lives as long as the adapter.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_path(None)
    }

    fn with_path(path: Option<PathBuf>) -> Self {
        Self {
            path,
            conn: Mutex::new(None),
            options: AdapterOptions {
                read_only: false,
                supports_units_column: true,
                can_assign_units: true,
                supports_singly_bounded_query: true,
                search_iteratively: false,
            },
        }
    }

    /// Open the database read-only; writes and units assignment are refused.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.options.read_only = true;
        self.options.can_assign_units = false;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|e| CacheError::Storage(e.to_string()))
    }

    /// Run `f` against the open connection.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let guard = self.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| CacheError::Connection("sqlite adapter not connected".to_string()))?;
        f(conn).map_err(|e| CacheError::Storage(e.to_string()))
    }

    fn ensure_writable(&self, what: &str) -> Result<()> {
        if self.options.read_only {
            return Err(CacheError::ReadOnly(format!("sqlite: {what}")));
        }
        Ok(())
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        match (&self.path, self.options.read_only) {
            (Some(path), true) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
            (Some(path), false) => Connection::open(path),
            (None, _) => Connection::open_in_memory(),
        }
    }

    /// Initialize the database schema.
    fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identifiers (
                name TEXT PRIMARY KEY NOT NULL,
                units TEXT
            );
            CREATE TABLE IF NOT EXISTS points (
                identifier TEXT NOT NULL,
                time INTEGER NOT NULL,
                value REAL NOT NULL,
                quality INTEGER NOT NULL,
                confidence REAL NOT NULL,
                PRIMARY KEY (identifier, time)
            );",
        )?;
        debug!("SQLite schema initialized");
        Ok(())
    }

    fn row_to_point(row: &Row<'_>) -> rusqlite::Result<Point> {
        Ok(Point {
            time: row.get(0)?,
            value: row.get(1)?,
            quality: row.get(2)?,
            confidence: row.get(3)?,
        })
    }

    fn encode_units(units: Units) -> Result<String> {
        serde_json::to_string(&units).map_err(|e| CacheError::Parse(e.to_string()))
    }

    fn decode_units(json: Option<String>) -> Result<Option<Units>> {
        json.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Parse(e.to_string())))
            .transpose()
    }

    fn select_one(&self, sql: &str, id: &str, time: i64) -> Result<Option<Point>> {
        self.with_conn(|conn| {
            conn.query_row(sql, params![id, time], Self::row_to_point)
                .optional()
        })
    }

    /// Insert `points` inside the open bulk scope, or inside a fresh transaction.
    fn write_points(&self, id: &str, points: &[Point]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn
                .is_autocommit()
                .then(|| conn.unchecked_transaction())
                .transpose()?;
            {
                let mut stmt = conn.prepare_cached(
                    "INSERT OR REPLACE INTO points (identifier, time, value, quality, confidence)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for p in points {
                    stmt.execute(params![id, p.time, p.value, p.quality, p.confidence])?;
                }
            }
            if let Some(tx) = tx {
                tx.commit()?;
            }
            Ok(())
        })
    }
}

#[async_trait]
impl BoundedQuery for SqliteAdapter {
    #[instrument(skip(self))]
    async fn select_previous(&self, id: &str, time: i64) -> Result<Option<Point>> {
        self.select_one(
            "SELECT time, value, quality, confidence FROM points
             WHERE identifier = ?1 AND time < ?2
             ORDER BY time DESC LIMIT 1",
            id,
            time,
        )
    }

    #[instrument(skip(self))]
    async fn select_next(&self, id: &str, time: i64) -> Result<Option<Point>> {
        self.select_one(
            "SELECT time, value, quality, confidence FROM points
             WHERE identifier = ?1 AND time > ?2
             ORDER BY time ASC LIMIT 1",
            id,
            time,
        )
    }
}

#[async_trait]
impl PointAdapter for SqliteAdapter {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn options(&self) -> AdapterOptions {
        self.options
    }

    #[instrument(skip(self))]
    async fn connect(&self) -> Result<()> {
        let mut guard = self.lock()?;
        if guard.is_some() {
            return Ok(());
        }
        let conn = self
            .open()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        if !self.options.read_only || self.path.is_none() {
            Self::initialize_schema(&conn).map_err(|e| CacheError::Connection(e.to_string()))?;
        }
        *guard = Some(conn);
        debug!(path = ?self.path, "SQLite adapter connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.lock().is_ok_and(|c| c.is_some())
    }

    fn bounded(&self) -> Option<&dyn BoundedQuery> {
        Some(self)
    }

    #[instrument(skip(self), fields(range = %range))]
    async fn select_range(&self, id: &str, range: TimeRange) -> Result<Vec<Point>> {
        let points = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT time, value, quality, confidence FROM points
                 WHERE identifier = ?1 AND time >= ?2 AND time <= ?3
                 ORDER BY time ASC",
            )?;
            let rows = stmt.query_map(params![id, range.start(), range.end()], Self::row_to_point)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        debug!("Selected {} points", points.len());
        Ok(points)
    }

    #[instrument(skip(self, point))]
    async fn insert_single(&self, id: &str, point: Point) -> Result<()> {
        self.ensure_writable("insert")?;
        self.write_points(id, &[point])
    }

    #[instrument(skip(self, points), fields(count = points.len()))]
    async fn insert_range(&self, id: &str, points: &[Point]) -> Result<()> {
        self.ensure_writable("insert")?;
        self.write_points(id, points)?;
        debug!("Inserted {} points", points.len());
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        if self.options.read_only {
            return Ok(());
        }
        self.with_conn(|conn| {
            if conn.is_autocommit() {
                conn.execute_batch("BEGIN TRANSACTION")?;
            }
            Ok(())
        })
    }

    async fn end_transaction(&self) -> Result<()> {
        if self.options.read_only {
            return Ok(());
        }
        self.with_conn(|conn| {
            if !conn.is_autocommit() {
                conn.execute_batch("COMMIT")?;
            }
            Ok(())
        })
    }

    #[instrument(skip(self))]
    async fn id_units_list(&self) -> Result<IdentifierUnitsList> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT name, units FROM identifiers")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut list = IdentifierUnitsList::new();
        for (name, units) in rows {
            list.insert(name, Self::decode_units(units)?);
        }
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn insert_identifier_and_units(&self, id: &str, units: Units) -> Result<bool> {
        self.ensure_writable("register identifier")?;
        let json = Self::encode_units(units)?;
        let (inserted, existing) = self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO identifiers (name, units) VALUES (?1, ?2)",
                params![id, json],
            )?;
            let existing = conn
                .query_row(
                    "SELECT units FROM identifiers WHERE name = ?1",
                    params![id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            Ok((inserted, existing))
        })?;

        // An existing row only counts if it already carries these units.
        Ok(inserted == 1 || Self::decode_units(existing)? == Some(units))
    }

    #[instrument(skip(self))]
    async fn assign_units_to_record(&self, id: &str, units: Units) -> Result<bool> {
        self.ensure_writable("assign units")?;
        let json = Self::encode_units(units)?;
        let updated = self.with_conn(|conn| {
            conn.execute(
                "UPDATE identifiers SET units = ?2 WHERE name = ?1 AND units IS NULL",
                params![id, json],
            )
        })?;
        Ok(updated == 1)
    }

    #[instrument(skip(self))]
    async fn remove_record(&self, id: &str) -> Result<()> {
        self.ensure_writable("remove record")?;
        self.with_conn(|conn| {
            let tx = conn
                .is_autocommit()
                .then(|| conn.unchecked_transaction())
                .transpose()?;
            conn.execute("DELETE FROM points WHERE identifier = ?1", params![id])?;
            conn.execute("DELETE FROM identifiers WHERE name = ?1", params![id])?;
            if let Some(tx) = tx {
                tx.commit()?;
            }
            Ok(())
        })?;
        debug!("Removed record");
        Ok(())
    }
}
