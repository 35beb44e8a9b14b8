//! Shared checks used by every validator

use crate::errors::{ValidationError, ValidationResult};

/// Reject NaN and infinities
pub fn check_finite(field: &'static str, value: f32) -> ValidationResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue { field })
    }
}

/// Check that a finite value lies within `[min, max]` (inclusive)
pub fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> ValidationResult<()> {
    check_finite(field, value)?;

    if value < min || value > max {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        assert!(check_range("x", 5.0, 0.0, 10.0).is_ok());
        assert!(check_range("x", 0.0, 0.0, 10.0).is_ok());
        assert!(check_range("x", 10.0, 0.0, 10.0).is_ok());
        assert!(check_range("x", -1.0, 0.0, 10.0).is_err());
        assert!(check_range("x", 11.0, 0.0, 10.0).is_err());
    }

    #[test]
    fn nan_is_invalid_not_out_of_range() {
        assert_eq!(
            check_range("humidity", f32::NAN, 0.0, 100.0),
            Err(ValidationError::InvalidValue { field: "humidity" })
        );
        assert!(check_finite("t", f32::INFINITY).is_err());
    }
}
