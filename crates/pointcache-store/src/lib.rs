#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pointcache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Buffer tier and backing-store adapters for pointcache.
//!
//! This crate provides implementations of the traits in `pointcache-core`:
//!
//! - [`InMemoryBuffer`] - The in-memory buffer tier ([`PointBuffer`])
//! - [`SqliteAdapter`] - Persistent SQLite backing store (default, requires `sqlite` feature)
//! - [`NoopAdapter`] - A backing store that is never reachable

/// In-memory buffer tier.
pub mod memory;
/// Unreachable backing store.
pub mod noop;

/// SQLite backing store.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use pointcache_core::{PointAdapter, PointBuffer};

// Re-export implementations
pub use memory::InMemoryBuffer;
pub use noop::NoopAdapter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAdapter;
