//! Configuration for [`DbPointRecord`](crate::DbPointRecord).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use pointcache_core::{CacheError, FilterType, QualityFilterState, Result};

/// Recognized options of a point record.
///
/// Durations are whole seconds. Missing fields take their defaults when
/// deserializing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Caller-requested read-only mode. Has no effect on an adapter that is
    /// already read-only.
    pub read_only: bool,
    /// Initial quality filter mode.
    pub filter_type: FilterType,
    /// Initial quality filter code set.
    pub filter_codes: BTreeSet<u32>,
    /// Maximum number of windows probed by an iterative bound search.
    pub iterative_search_max_iterations: u32,
    /// Width of each iterative search window, in seconds.
    pub iterative_search_stride: i64,
    /// Half-width of the window fetched around a single-point lookup, in seconds.
    pub point_lookup_window: i64,
    /// Connection attempts per call before treating the store as unreachable.
    pub connect_attempts: u32,
    /// How long a fetched identifier list is reused, in seconds.
    pub identifier_cache_ttl: i64,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            filter_type: FilterType::PassThrough,
            filter_codes: BTreeSet::new(),
            iterative_search_max_iterations: 8,
            iterative_search_stride: 3 * 60 * 60,
            point_lookup_window: 12 * 60 * 60,
            connect_attempts: 5,
            identifier_cache_ttl: 5,
        }
    }
}

impl RecordConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Returns [`CacheError::Parse`] for malformed JSON and
    /// [`CacheError::InvalidParameter`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CacheError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidParameter`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.iterative_search_stride <= 0 {
            return Err(CacheError::InvalidParameter(
                "iterative_search_stride must be positive".to_string(),
            ));
        }
        if self.point_lookup_window < 0 {
            return Err(CacheError::InvalidParameter(
                "point_lookup_window must not be negative".to_string(),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(CacheError::InvalidParameter(
                "connect_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set caller-requested read-only mode.
    #[must_use]
    pub const fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the initial quality filter.
    #[must_use]
    pub fn with_filter(
        mut self,
        filter_type: FilterType,
        codes: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.filter_type = filter_type;
        self.filter_codes = codes.into_iter().collect();
        self
    }

    /// Set the iterative search limits.
    #[must_use]
    pub const fn with_iterative_search(mut self, max_iterations: u32, stride: i64) -> Self {
        self.iterative_search_max_iterations = max_iterations;
        self.iterative_search_stride = stride;
        self
    }

    /// Set the single-point lookup half-window.
    #[must_use]
    pub const fn with_point_lookup_window(mut self, seconds: i64) -> Self {
        self.point_lookup_window = seconds;
        self
    }

    /// Set the number of connection attempts per call.
    #[must_use]
    pub const fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    /// Set how long the identifier list is reused.
    #[must_use]
    pub const fn with_identifier_cache_ttl(mut self, seconds: i64) -> Self {
        self.identifier_cache_ttl = seconds;
        self
    }

    pub(crate) fn quality_filter(&self) -> QualityFilterState {
        QualityFilterState::new(self.filter_type, self.filter_codes.iter().copied())
    }
}
