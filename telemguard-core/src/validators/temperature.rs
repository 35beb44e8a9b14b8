//! Temperature validation
//!
//! No deployment range is imposed on temperature; a reading only has to be a
//! real number at or above absolute zero.

use crate::{constants::sensors::ABSOLUTE_ZERO_C, errors::ValidationResult};

use super::{utils, Validator};

/// Temperature validator (°C)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureValidator {
    min_celsius: f32,
    max_celsius: f32,
}

impl Default for TemperatureValidator {
    fn default() -> Self {
        Self {
            min_celsius: ABSOLUTE_ZERO_C,
            max_celsius: f32::MAX,
        }
    }
}

impl TemperatureValidator {
    /// Create validator with custom limits
    pub fn new_with_limits(min: f32, max: f32) -> Self {
        Self {
            min_celsius: min.max(ABSOLUTE_ZERO_C),
            max_celsius: max,
        }
    }
}

impl Validator for TemperatureValidator {
    type Value = f32;

    fn validate(&self, value: f32) -> ValidationResult<()> {
        utils::check_range("temperature", value, self.min_celsius, self.max_celsius)
    }
}
