//! Constants for TelemGuard Core
//!
//! Centralized numeric values used across the codec, the validators and the
//! collector. Values that come from the device firmware (frame layout) must
//! never change without a matching firmware release.
//!
//! ## Organization
//!
//! - **Wire**: Frame layout offsets and sizes
//! - **Sensors**: Accepted physical ranges at the ingestion boundary
//! - **Time**: Poll cadence, backoff and conversion factors

/// Frame layout of the binary reading and the signed envelope.
pub mod wire;

/// Physical ranges accepted at the ingestion boundary.
pub mod sensors;

/// Poll cadence, retry backoff and unit conversions.
pub mod time;

// Re-export commonly used constants for convenience
pub use wire::{ENVELOPE_HEADER_LEN, READING_LEN, SIGNATURE_LEN_FIELD_LEN, TAG_LEN};

pub use sensors::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT, PRESSURE_MAX_HPA, PRESSURE_MIN_HPA};

pub use time::{DEFAULT_POLL_INTERVAL_MS, MAX_BACKOFF_MS, MS_PER_SECOND};
