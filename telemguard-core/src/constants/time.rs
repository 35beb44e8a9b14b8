//! Time-Related Constants
//!
//! Intervals and conversion factors used by the collector and the query
//! defaults. All timestamps in TelemGuard are milliseconds since the epoch.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== POLLING =====

/// Default interval between two reads of the bus node (milliseconds).
///
/// Twice per second keeps latency low while the device publishes every
/// few seconds; unchanged frames are skipped by the collector.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// First retry delay after a transport failure (milliseconds).
pub const BASE_BACKOFF_MS: u64 = 500;

/// Upper bound for the exponential retry delay (milliseconds).
pub const MAX_BACKOFF_MS: u64 = 30_000;
