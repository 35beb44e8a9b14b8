//! Authentication and key-loading errors

use std::path::PathBuf;

use telemguard_core::{FrameError, PlaintextError, ValidationError};
use thiserror::Error;

/// Outcome of turning an untrusted frame into a trusted reading
///
/// Every variant except [`AuthError::Sealing`] is an expected per-sample
/// failure: the collector reports it and keeps polling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Bytes are structurally invalid
    #[error(transparent)]
    Malformed(#[from] FrameError),

    /// Signature does not match the payload
    #[error("Authentication failed: signature does not match payload")]
    AuthenticationFailed,

    /// Tag mismatch, wrong key, bad IV or undecodable ciphertext
    #[error("Decryption failed: {reason}")]
    DecryptionFailed {
        /// What went wrong, without exposing key material
        reason: &'static str,
    },

    /// Decrypted plaintext is a JSON object missing or mistyping a field
    #[error("Invalid decrypted reading: {0}")]
    InvalidPayload(#[from] ValidationError),

    /// Device side could not sign or encrypt
    #[error("Could not produce authenticated frame: {0}")]
    Sealing(String),
}

impl AuthError {
    pub(crate) fn decryption(reason: &'static str) -> Self {
        Self::DecryptionFailed { reason }
    }
}

impl From<PlaintextError> for AuthError {
    fn from(err: PlaintextError) -> Self {
        match err {
            PlaintextError::Malformed(e) => Self::Malformed(e),
            PlaintextError::Invalid(e) => Self::InvalidPayload(e),
        }
    }
}

/// Key material could not be loaded; always fatal at startup
#[derive(Debug, Error)]
pub enum KeyError {
    /// File missing or unreadable
    #[error("Cannot read key file {path:?}: {source}")]
    Unreadable {
        /// Configured location
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// File contents are not a usable key
    #[error("Key file {path:?} is corrupt: {reason}")]
    Corrupt {
        /// Configured location
        path: PathBuf,
        /// Parser diagnostic
        reason: String,
    },

    /// Symmetric key of an unsupported size
    #[error("Symmetric key must be 16 or 32 bytes, got {actual}")]
    InvalidKeyLength {
        /// Size that was supplied
        actual: usize,
    },

    /// PEM text that is not a supported RSA key
    #[error("Unsupported key encoding: {0}")]
    Encoding(String),
}
