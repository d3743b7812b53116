//! Error types for cache and backing-store operations.
//!
//! This module defines [`CacheError`] which covers every failure an adapter can
//! report and the few the orchestrator surfaces to its callers.

use thiserror::Error;

/// Errors that can occur while talking to a backing store or the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be reached after the retry ceiling.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A write was attempted against a read-only store or record.
    #[error("Read-only: {0}")]
    ReadOnly(String),

    /// The identifier exists with incompatible units that cannot be reconciled.
    #[error("Registration conflict for {identifier}: {reason}")]
    RegistrationConflict {
        /// The identifier being registered.
        identifier: String,
        /// Why the registration was refused.
        reason: String,
    },

    /// A capability-specific call was made against an adapter that lacks it.
    #[error("Capability not supported by {adapter}: {capability}")]
    CapabilityMismatch {
        /// Name of the adapter.
        adapter: String,
        /// The missing capability.
        capability: String,
    },

    /// Error reported by the underlying storage engine.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error decoding data held by a backing store.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;
