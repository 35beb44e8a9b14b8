//! Accepted Physical Ranges
//!
//! Limits enforced at the ingestion boundary. Decoding does not apply them:
//! a frame with an implausible value is still a well-formed frame, and the
//! rejection is reported as a validation failure rather than a codec failure.

// ===== HUMIDITY =====

/// Minimum relative humidity (%).
///
/// Source: Physics (0% RH = no water vapor)
pub const HUMIDITY_MIN_PCT: f32 = 0.0;

/// Maximum relative humidity (%).
///
/// Supersaturation readings above 100% are treated as sensor faults here.
pub const HUMIDITY_MAX_PCT: f32 = 100.0;

// ===== PRESSURE =====

/// Minimum barometric pressure accepted (hPa).
///
/// Below the lowest sea-level pressure ever recorded (870 hPa, Typhoon Tip)
/// with margin for elevated sites.
pub const PRESSURE_MIN_HPA: f32 = 800.0;

/// Maximum barometric pressure accepted (hPa).
///
/// Well above the highest recorded value (1084 hPa, Siberian High).
pub const PRESSURE_MAX_HPA: f32 = 1200.0;

// ===== TEMPERATURE =====

/// Absolute zero (°C). Nothing colder is physically meaningful.
pub const ABSOLUTE_ZERO_C: f32 = -273.15;
