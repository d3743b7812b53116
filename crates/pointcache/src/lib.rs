#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pointcache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Two-tier point cache over pluggable backing stores.
//!
//! This crate re-exports core types and store implementations, and provides
//! [`DbPointRecord`] for reading and writing points through an in-memory
//! buffer tier with the backing store behind it.
//!
//! # Features
//!
//! - `sqlite` - SQLite backing store (enabled by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pointcache::{DbPointRecord, Point, RecordConfig, SqliteAdapter, TimeRange, Units};
//!
//! #[tokio::main]
//! async fn main() -> pointcache::Result<()> {
//!     let config = RecordConfig::from_json(r#"{"connect_attempts": 3}"#)?;
//!     let record = DbPointRecord::with_config(Arc::new(SqliteAdapter::new("plant.db")), config);
//!     record.connect().await?;
//!
//!     record.register_identifier("pump_flow", Units::GALLONS_PER_MINUTE).await;
//!     record.add_point("pump_flow", Point::new(1_700_000_000, 412.5)).await;
//!
//!     let points = record
//!         .points_in_range("pump_flow", TimeRange::new(1_699_990_000, 1_700_010_000))
//!         .await;
//!     println!("{points:?}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use pointcache_core::*;

// Store implementations
#[cfg(feature = "sqlite")]
pub use pointcache_store::SqliteAdapter;
pub use pointcache_store::{InMemoryBuffer, NoopAdapter};

mod config;
pub use config::RecordConfig;

mod record;
pub use record::DbPointRecord;
