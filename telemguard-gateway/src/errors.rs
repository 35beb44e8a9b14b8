//! Gateway error taxonomy
//!
//! Internal errors keep their full detail for logs. Anything leaving the
//! crate towards an API consumer is first converted into an [`ApiError`],
//! which carries one [`ErrorKind`] and a message safe to show.

use std::fmt;

use serde::{Deserialize, Serialize};
use telemguard_auth::AuthError;
use telemguard_connectors::BusError;
use telemguard_core::{MeasurementId, ValidationError};
use thiserror::Error;

use crate::storage::StorageError;

/// Failure kinds visible to API consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Structurally invalid bytes
    MalformedFrame,
    /// Signature mismatch, or a payload type the deployment does not accept
    AuthenticationFailed,
    /// Tag mismatch or cipher error
    DecryptionFailed,
    /// Implausible value, missing field or wrong type
    ValidationError,
    /// Bus unreachable or connection lost
    TransportError,
    /// Persistence failure
    StorageError,
    /// No measurement with the requested identifier
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<&AuthError> for ErrorKind {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Malformed(_) => Self::MalformedFrame,
            AuthError::AuthenticationFailed | AuthError::Sealing(_) => Self::AuthenticationFailed,
            AuthError::DecryptionFailed { .. } => Self::DecryptionFailed,
            AuthError::InvalidPayload(_) => Self::ValidationError,
        }
    }
}

/// Structured error returned across the ingestion and query boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Failure kind
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl ApiError {
    /// Error of `kind` with `message`
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Lookup by identifier found nothing
    pub fn not_found(id: MeasurementId) -> Self {
        Self::new(ErrorKind::NotFound, format!("No measurement with id {}", id))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(ErrorKind::ValidationError, err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(ErrorKind::from(&err), err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        log::error!("Storage failure surfaced to API caller: {}", err);
        Self::new(ErrorKind::StorageError, "Measurement storage is unavailable")
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(e) => e.into(),
            IngestError::Storage(e) => e.into(),
        }
    }
}

/// Why the distributor refused a reading
#[derive(Debug, Error)]
pub enum IngestError {
    /// Physically implausible; nothing was written
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Write failed; nothing was broadcast
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Taxonomy kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Storage(_) => ErrorKind::StorageError,
        }
    }
}

/// Subscription could not be established
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// Backlog could not be read
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Channel failed while receiving the backlog
    #[error("Live channel closed during backlog delivery")]
    ChannelClosed,
}

/// Fatal collector failures
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Initial connection failed; the run never started
    #[error("Initial bus connection failed: {0}")]
    Connect(#[source] BusError),
}
