//! Relative humidity validation
//!
//! Relative humidity is a ratio of actual to saturation vapor pressure, so
//! the accepted range is the definition itself: 0 to 100 %. Supersaturated
//! readings (fog, condensing sensor) are reported as faults.

use crate::{
    constants::sensors::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT},
    errors::ValidationResult,
};

use super::{utils, Validator};

/// Humidity validator for relative humidity percentage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityValidator {
    min_percent: f32,
    max_percent: f32,
}

impl Default for HumidityValidator {
    fn default() -> Self {
        Self {
            min_percent: HUMIDITY_MIN_PCT,
            max_percent: HUMIDITY_MAX_PCT,
        }
    }
}

impl HumidityValidator {
    /// Create validator with custom limits
    pub fn new_with_limits(min: f32, max: f32) -> Self {
        Self {
            min_percent: min,
            max_percent: max,
        }
    }

    /// Accepted range as `(min, max)`
    pub fn limits(&self) -> (f32, f32) {
        (self.min_percent, self.max_percent)
    }
}

impl Validator for HumidityValidator {
    type Value = f32;

    fn validate(&self, value: f32) -> ValidationResult<()> {
        utils::check_range("humidity", value, self.min_percent, self.max_percent)
    }
}
