//! Error Types for Frame Decoding and Reading Validation
//!
//! ## Design Philosophy
//!
//! Two independent failure families are kept apart on purpose:
//!
//! 1. **`FrameError`** (reported as *MalformedFrame*): the bytes themselves are
//!    structurally wrong. Nothing about the reading can be trusted.
//!
//! 2. **`ValidationError`**: the reading decoded (and authenticated) fine, but
//!    a value is physically implausible or a required field is missing.
//!
//! Both are `Copy` with only `&'static str` payloads, so they can be returned
//! from the decode hot path and logged without allocation.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use telemguard_core::{frame, FrameError};
//!
//! fn handle_frame(bytes: &[u8]) {
//!     match frame::decode_envelope(bytes) {
//!         Ok(envelope) => {
//!             // verify envelope.signature over envelope.payload
//!         }
//!         Err(FrameError::TooShort { .. }) => {
//!             // truncated publish - wait for the next cycle
//!         }
//!         Err(e) => {
//!             // log and keep polling
//!             let _ = e;
//!         }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for codec operations
pub type FrameResult<T> = Result<T, FrameError>;

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Structurally invalid bytes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A fixed-size structure was given the wrong number of bytes
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Exact size the layout requires
        expected: usize,
        /// Size that was supplied
        actual: usize,
    },

    /// Buffer shorter than the fixed envelope header
    #[error("Malformed frame: {actual} bytes is shorter than the {minimum}-byte header")]
    TooShort {
        /// Minimum size of the header
        minimum: usize,
        /// Size that was supplied
        actual: usize,
    },

    /// Declared signature length runs past the end of the buffer
    #[error("Malformed frame: declared signature of {declared} bytes but only {available} remain")]
    SignatureOverrun {
        /// Signature length read from the length prefix
        declared: u64,
        /// Bytes actually present after the prefix
        available: usize,
    },

    /// Payload is neither a JSON object nor a binary reading
    #[error("Malformed frame: {reason}")]
    Unrecognized {
        /// What was wrong with the payload
        reason: &'static str,
    },
}

/// Physically implausible or incomplete readings
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Value outside the accepted range
    #[error("{field} value {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The value that failed validation
        value: f32,
        /// Minimum accepted value
        min: f32,
        /// Maximum accepted value
        max: f32,
    },

    /// Value makes no physical sense (NaN, infinity)
    #[error("{field} is not a finite number")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
    },

    /// Required field absent from a structured payload
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// Field present but of the wrong type or out of its integer range
    #[error("Field {field} has the wrong type")]
    WrongType {
        /// Name of the offending field
        field: &'static str,
    },

    /// Structured payload is not a JSON object at all
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

impl ValidationError {
    /// Name of the field the error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::OutOfRange { field, .. }
            | Self::InvalidValue { field }
            | Self::MissingField { field }
            | Self::WrongType { field } => Some(*field),
            Self::NotAnObject => None,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::string::ToString;

    #[test]
    fn frame_error_messages() {
        let err = FrameError::TooShort { minimum: 32, actual: 20 };
        assert_eq!(
            err.to_string(),
            "Malformed frame: 20 bytes is shorter than the 32-byte header"
        );
    }

    #[test]
    fn validation_error_field() {
        let err = ValidationError::OutOfRange {
            field: "humidity",
            value: 150.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(err.field(), Some("humidity"));
        assert_eq!(ValidationError::NotAnObject.field(), None);
    }
}
