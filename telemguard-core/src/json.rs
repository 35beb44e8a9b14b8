//! Structured (JSON) readings
//!
//! The ingestion boundary and the symmetric-encryption path both carry a
//! reading as a JSON object rather than the packed binary layout. Parsing is
//! schema-checked one field at a time so a client learns exactly which field
//! was missing or mistyped. Numbers must be JSON numbers; numeric strings are
//! rejected.

use alloc::string::String;
use serde_json::{Map, Value};
use thiserror_no_std::Error;

use crate::{
    errors::{FrameError, ValidationError, ValidationResult},
    frame::decode_reading,
    reading::SensorReading,
};

/// Field names in the order they are checked
pub const REQUIRED_FIELDS: [&str; 5] =
    ["sensor_id", "temperature", "pressure", "humidity", "timestamp"];

/// Failure to turn decrypted plaintext into a reading
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PlaintextError {
    /// Neither a JSON object nor a 24-byte binary reading
    #[error(transparent)]
    Malformed(#[from] FrameError),

    /// A JSON object missing a field or carrying a mistyped one
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Build a reading from an already-parsed JSON value
pub fn reading_from_value(value: &Value) -> ValidationResult<SensorReading> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    if let Some(field) = REQUIRED_FIELDS
        .iter()
        .copied()
        .find(|field| !object.contains_key(*field))
    {
        return Err(ValidationError::MissingField { field });
    }

    let sensor_id = object
        .get("sensor_id")
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or(ValidationError::WrongType { field: "sensor_id" })?;

    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_u64)
        .ok_or(ValidationError::WrongType { field: "timestamp" })?;

    Ok(SensorReading {
        sensor_id,
        temperature: float(object, "temperature")?,
        pressure: float(object, "pressure")?,
        humidity: float(object, "humidity")?,
        timestamp,
    })
}

/// Parse JSON text into a reading
///
/// Text that is not valid JSON is reported as [`ValidationError::NotAnObject`].
pub fn reading_from_slice(bytes: &[u8]) -> ValidationResult<SensorReading> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| ValidationError::NotAnObject)?;
    reading_from_value(&value)
}

/// Decode plaintext recovered from an encrypted envelope
///
/// Plaintext that parses as JSON is read as a JSON reading. Otherwise it must
/// be a 24-byte binary reading, which may itself start with `{` (sensor ids
/// whose low byte is `0x7B`).
pub fn decode_plaintext(bytes: &[u8]) -> Result<SensorReading, PlaintextError> {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Ok(reading_from_value(&value)?);
    }
    if bytes.len() == crate::constants::READING_LEN {
        return Ok(decode_reading(bytes)?);
    }

    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Err(ValidationError::NotAnObject.into()),
        _ => Err(FrameError::Unrecognized {
            reason: "plaintext is neither a JSON object nor a 24-byte reading",
        }
        .into()),
    }
}

fn float(object: &Map<String, Value>, field: &'static str) -> ValidationResult<f32> {
    object
        .get(field)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or(ValidationError::WrongType { field })
}
