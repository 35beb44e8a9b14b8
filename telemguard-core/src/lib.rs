//! Core telemetry types for TelemGuard
//!
//! Handles the fixed-layout wire format a sensor publishes onto the bus and
//! the physical-range checks a reading must pass before it is persisted.
//! Designed so the device side can share the exact same codec.
//!
//! Key constraints:
//! - Decoding never allocates (frames are borrowed, readings are `Copy`)
//! - All multi-byte fields are little-endian
//! - Length checks happen before any field is read
//!
//! ```no_run
//! use telemguard_core::{frame, ReadingValidator, Validator};
//!
//! # let bytes = [0u8; 64];
//! let envelope = frame::decode_envelope(&bytes)?;
//! let reading = frame::decode_reading(envelope.payload)?;
//!
//! // Physical plausibility is a separate step from decoding
//! ReadingValidator::default().validate(reading)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod constants;
pub mod errors;
pub mod frame;
#[cfg(feature = "json")]
pub mod json;
pub mod reading;
pub mod time;
pub mod validators;

// Public API
pub use errors::{FrameError, FrameResult, ValidationError, ValidationResult};
pub use frame::{decode_envelope, decode_reading, encode_reading, SignedEnvelope};
#[cfg(feature = "alloc")]
pub use frame::encode_envelope;
#[cfg(feature = "json")]
pub use json::{decode_plaintext, PlaintextError};
pub use reading::{MeasurementId, PersistedMeasurement, SensorReading};
pub use validators::{
    HumidityValidator, PressureValidator, ReadingValidator, TemperatureValidator, Validator,
};

/// Crate version, reported by the gateway at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
