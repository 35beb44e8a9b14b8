//! Physical-Range Validators
//!
//! ## Overview
//!
//! Decoding only proves that bytes have the right shape. Authentication only
//! proves who produced them. Neither says the values make physical sense, so
//! every reading passes through a [`ReadingValidator`] before it is stored.
//! A cryptographically valid but implausible reading is still rejected.
//!
//! ## Validation Layers
//!
//! 1. **Finiteness**: NaN and infinities are never accepted
//!    ([`ValidationError::InvalidValue`](crate::ValidationError::InvalidValue)).
//! 2. **Range**: each quantity must lie in its accepted band
//!    ([`ValidationError::OutOfRange`](crate::ValidationError::OutOfRange)).
//!
//! | Quantity    | Accepted        |
//! |-------------|-----------------|
//! | humidity    | 0 to 100 %      |
//! | pressure    | 800 to 1200 hPa |
//! | temperature | ≥ -273.15 °C    |
//!
//! ## Usage Example
//!
//! ```rust
//! use telemguard_core::{ReadingValidator, SensorReading, Validator};
//!
//! let validator = ReadingValidator::default();
//!
//! let ok = SensorReading::new(1, 25.5, 1013.25, 65.2, 1_720_328_207_000);
//! assert!(validator.validate(ok).is_ok());
//!
//! let soaked = SensorReading::new(1, 25.5, 1013.25, 150.0, 1_720_328_207_000);
//! assert_eq!(validator.validate(soaked).unwrap_err().field(), Some("humidity"));
//! ```
//!
//! ## Customization
//!
//! ```rust
//! use telemguard_core::validators::{HumidityValidator, ReadingValidator};
//!
//! // Archive room: mold below 60 %, static above 40 %
//! let archive = ReadingValidator::default()
//!     .with_humidity(HumidityValidator::new_with_limits(40.0, 60.0));
//! # let _ = archive;
//! ```

mod humidity;
mod pressure;
mod temperature;
mod utils;

pub use humidity::HumidityValidator;
pub use pressure::PressureValidator;
pub use temperature::TemperatureValidator;
pub use utils::{check_finite, check_range};

use crate::{errors::ValidationResult, reading::SensorReading};

/// Common interface for all validators
pub trait Validator {
    /// The type of value this validator handles
    type Value;

    /// Validate a single value
    fn validate(&self, value: Self::Value) -> ValidationResult<()>;
}

/// Validates every quantity of a [`SensorReading`]
///
/// Fields are checked in wire order (temperature, pressure, humidity) and the
/// first failure is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReadingValidator {
    temperature: TemperatureValidator,
    pressure: PressureValidator,
    humidity: HumidityValidator,
}

impl ReadingValidator {
    /// Replace the temperature validator
    pub fn with_temperature(mut self, validator: TemperatureValidator) -> Self {
        self.temperature = validator;
        self
    }

    /// Replace the pressure validator
    pub fn with_pressure(mut self, validator: PressureValidator) -> Self {
        self.pressure = validator;
        self
    }

    /// Replace the humidity validator
    pub fn with_humidity(mut self, validator: HumidityValidator) -> Self {
        self.humidity = validator;
        self
    }
}

impl Validator for ReadingValidator {
    type Value = SensorReading;

    fn validate(&self, reading: SensorReading) -> ValidationResult<()> {
        self.temperature.validate(reading.temperature)?;
        self.pressure.validate(reading.pressure)?;
        self.humidity.validate(reading.humidity)
    }
}
