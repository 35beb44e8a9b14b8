//! Binary Wire Codec
//!
//! ## Overview
//!
//! The sensor firmware publishes a packed little-endian struct, optionally
//! followed by an authentication trailer. This module converts between those
//! bytes and [`SensorReading`] values. It is pure: no I/O, no logging, no
//! allocation on the decode side.
//!
//! ## Layouts
//!
//! ```text
//! Plain reading (24 bytes)
//! ┌───────────┬─────────────┬──────────┬──────────┬───────────┐
//! │ sensor_id │ temperature │ pressure │ humidity │ timestamp │
//! │   i32     │    f32      │   f32    │   f32    │    u64    │
//! └───────────┴─────────────┴──────────┴──────────┴───────────┘
//!
//! Signed envelope (32 + N bytes)
//! ┌──────────────────┬──────────────────────┬────────────────┐
//! │ payload [24]     │ signature_length u64 │ signature [N]  │
//! └──────────────────┴──────────────────────┴────────────────┘
//! ```
//!
//! ## Untrusted Input
//!
//! Every length is checked before a field is read. A declared signature
//! length is compared against the bytes actually present, so a hostile
//! prefix can never cause an out-of-bounds slice or a huge allocation.
//! Bytes after the declared signature are ignored.

use crate::{
    constants::wire::{
        ENVELOPE_HEADER_LEN, HUMIDITY_OFFSET, PRESSURE_OFFSET, READING_LEN, SENSOR_ID_OFFSET,
        SIGNATURE_LEN_FIELD_LEN, TEMPERATURE_OFFSET, TIMESTAMP_OFFSET,
    },
    errors::{FrameError, FrameResult},
    reading::SensorReading,
};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Borrowed view of a signed envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedEnvelope<'a> {
    /// The 24 encoded reading bytes the signature covers
    pub payload: &'a [u8; READING_LEN],
    /// Signature over `payload`
    pub signature: &'a [u8],
}

/// Decode exactly 24 bytes into a reading
///
/// Any other length is a [`FrameError::WrongLength`]. Values are not range
/// checked here; see [`crate::validators`].
pub fn decode_reading(bytes: &[u8]) -> FrameResult<SensorReading> {
    let bytes: &[u8; READING_LEN] = bytes.try_into().map_err(|_| FrameError::WrongLength {
        expected: READING_LEN,
        actual: bytes.len(),
    })?;

    Ok(SensorReading {
        sensor_id: i32::from_le_bytes(field(bytes, SENSOR_ID_OFFSET)),
        temperature: f32::from_le_bytes(field(bytes, TEMPERATURE_OFFSET)),
        pressure: f32::from_le_bytes(field(bytes, PRESSURE_OFFSET)),
        humidity: f32::from_le_bytes(field(bytes, HUMIDITY_OFFSET)),
        timestamp: u64::from_le_bytes(field(bytes, TIMESTAMP_OFFSET)),
    })
}

/// Encode a reading into its 24-byte wire form
pub fn encode_reading(reading: &SensorReading) -> [u8; READING_LEN] {
    let mut out = [0u8; READING_LEN];
    out[SENSOR_ID_OFFSET..TEMPERATURE_OFFSET].copy_from_slice(&reading.sensor_id.to_le_bytes());
    out[TEMPERATURE_OFFSET..PRESSURE_OFFSET].copy_from_slice(&reading.temperature.to_le_bytes());
    out[PRESSURE_OFFSET..HUMIDITY_OFFSET].copy_from_slice(&reading.pressure.to_le_bytes());
    out[HUMIDITY_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&reading.humidity.to_le_bytes());
    out[TIMESTAMP_OFFSET..READING_LEN].copy_from_slice(&reading.timestamp.to_le_bytes());
    out
}

/// Split a signed envelope into payload and signature
///
/// Requires at least 32 bytes and a declared signature length that fits in
/// the remaining buffer.
pub fn decode_envelope(bytes: &[u8]) -> FrameResult<SignedEnvelope<'_>> {
    if bytes.len() < ENVELOPE_HEADER_LEN {
        return Err(FrameError::TooShort {
            minimum: ENVELOPE_HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let (payload, rest) = bytes.split_at(READING_LEN);
    let (length_prefix, trailer) = rest.split_at(SIGNATURE_LEN_FIELD_LEN);

    let mut prefix = [0u8; SIGNATURE_LEN_FIELD_LEN];
    prefix.copy_from_slice(length_prefix);
    let declared = u64::from_le_bytes(prefix);

    // Compare in u64 space so a huge prefix cannot wrap on 32-bit targets
    if declared > trailer.len() as u64 {
        return Err(FrameError::SignatureOverrun {
            declared,
            available: trailer.len(),
        });
    }

    let payload: &[u8; READING_LEN] = payload.try_into().map_err(|_| FrameError::WrongLength {
        expected: READING_LEN,
        actual: payload.len(),
    })?;

    Ok(SignedEnvelope {
        payload,
        signature: &trailer[..declared as usize],
    })
}

/// Build a signed envelope (device side)
#[cfg(feature = "alloc")]
pub fn encode_envelope(payload: &[u8; READING_LEN], signature: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_HEADER_LEN + signature.len());
    out.extend_from_slice(payload);
    out.extend_from_slice(&(signature.len() as u64).to_le_bytes());
    out.extend_from_slice(signature);
    out
}

fn field<const N: usize>(bytes: &[u8; READING_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}
