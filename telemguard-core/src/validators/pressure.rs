//! Barometric pressure validation
//!
//! Sea-level records span roughly 870 hPa (Typhoon Tip, 1979) to 1084 hPa
//! (Siberian High, 1968). The accepted band of 800 to 1200 hPa covers both
//! with margin for moderately elevated installations. A reading outside it
//! is far more likely a decoding or sensor fault than weather.

use crate::{
    constants::sensors::{PRESSURE_MAX_HPA, PRESSURE_MIN_HPA},
    errors::ValidationResult,
};

use super::{utils, Validator};

/// Pressure validator (hPa)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureValidator {
    min_hpa: f32,
    max_hpa: f32,
}

impl Default for PressureValidator {
    fn default() -> Self {
        Self {
            min_hpa: PRESSURE_MIN_HPA,
            max_hpa: PRESSURE_MAX_HPA,
        }
    }
}

impl PressureValidator {
    /// Create validator with custom limits
    pub fn new_with_limits(min: f32, max: f32) -> Self {
        Self {
            min_hpa: min,
            max_hpa: max,
        }
    }

    /// Accepted range as `(min, max)`
    pub fn limits(&self) -> (f32, f32) {
        (self.min_hpa, self.max_hpa)
    }
}

impl Validator for PressureValidator {
    type Value = f32;

    fn validate(&self, value: f32) -> ValidationResult<()> {
        utils::check_range("pressure", value, self.min_hpa, self.max_hpa)
    }
}
