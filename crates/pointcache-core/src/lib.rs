#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pointcache/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the pointcache time-series cache.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`PointAdapter`](adapter::PointAdapter) - Boundary to a persistent backing store
//! - [`BoundedQuery`](adapter::BoundedQuery) - Optional single-bound selects
//! - [`PointBuffer`](buffer::PointBuffer) - In-memory buffer tier
//! - [`QualityFilterState`](filter::QualityFilterState) - Quality-code filtering
//! - [`TimeRange`](range::TimeRange) - Closed intervals and intersection classification

/// Backing-store adapter traits and capability flags.
pub mod adapter;
/// Buffer tier trait.
pub mod buffer;
/// Error types for cache operations.
pub mod error;
/// Quality-code filter pipeline.
pub mod filter;
/// Time ranges and intersection classification.
pub mod range;
/// Core data types (Point, registry snapshots).
pub mod types;
/// Physical units.
pub mod units;

// Re-export commonly used items at crate root
pub use adapter::{AdapterOptions, BoundedQuery, PointAdapter};
pub use buffer::PointBuffer;
pub use error::{CacheError, Result};
pub use filter::{FilterType, QualityFilterState};
pub use range::{Intersection, TimeRange};
pub use types::{IdentifierUnitsList, Point, RegistryMatch};
pub use units::{Dimensions, Units};
