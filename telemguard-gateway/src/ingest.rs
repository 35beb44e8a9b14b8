//! Ingestion boundary
//!
//! Entry point for readings submitted by request rather than collected from
//! the bus. The body is a JSON document: either a plain reading or an
//! encrypted envelope (`{"encrypted_data", "iv"}`). Which of the two is
//! accepted depends on the deployment's key material.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use telemguard_auth::{EncryptedEnvelope, SymmetricAuthenticator};
use telemguard_core::{json::reading_from_value, MeasurementId, ValidationError};

use crate::{
    distributor::Distributor,
    errors::{ApiError, ErrorKind},
};

/// Created-resource acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    /// Identifier of the stored measurement
    pub id: MeasurementId,
}

/// Turns request bodies into ingested measurements
pub struct IngestionService {
    distributor: Arc<Distributor>,
    decryptor: Option<Arc<SymmetricAuthenticator>>,
}

impl IngestionService {
    /// Accept plain readings only
    pub fn plain(distributor: Arc<Distributor>) -> Self {
        Self {
            distributor,
            decryptor: None,
        }
    }

    /// Accept encrypted envelopes only
    pub fn encrypted(
        distributor: Arc<Distributor>,
        decryptor: Arc<SymmetricAuthenticator>,
    ) -> Self {
        Self {
            distributor,
            decryptor: Some(decryptor),
        }
    }

    /// Decode, authenticate if required, and ingest one body
    pub fn handle(&self, body: &[u8]) -> Result<IngestAck, ApiError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::NotAnObject)?;
        let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

        let is_envelope = object.contains_key("encrypted_data") || object.contains_key("iv");
        let reading = match (&self.decryptor, is_envelope) {
            (Some(decryptor), true) => decryptor.open(&envelope(object)?)?,
            (Some(_), false) => {
                return Err(ApiError::new(
                    ErrorKind::AuthenticationFailed,
                    "Unencrypted readings are not accepted",
                ))
            }
            (None, true) => {
                return Err(ApiError::new(
                    ErrorKind::DecryptionFailed,
                    "No symmetric key is configured",
                ))
            }
            (None, false) => reading_from_value(&value)?,
        };

        let measurement = self.distributor.ingest(reading)?;
        Ok(IngestAck { id: measurement.id })
    }
}

fn envelope(object: &Map<String, Value>) -> Result<EncryptedEnvelope, ValidationError> {
    Ok(EncryptedEnvelope {
        encrypted_data: string_field(object, "encrypted_data")?,
        iv: string_field(object, "iv")?,
    })
}

fn string_field(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<String, ValidationError> {
    object
        .get(field)
        .ok_or(ValidationError::MissingField { field })?
        .as_str()
        .map(str::to_string)
        .ok_or(ValidationError::WrongType { field })
}
