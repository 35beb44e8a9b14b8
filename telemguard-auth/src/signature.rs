//! RSA-PKCS#1 v1.5 / SHA-256 signature strategy
//!
//! The device signs the 24 raw payload bytes and appends the signature in a
//! signed envelope. The gateway only holds the public half.

use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey, RsaPublicKey,
};
use sha2::Sha256;
use telemguard_core::{
    decode_envelope, decode_reading, encode_envelope, encode_reading, SensorReading,
};

use crate::{AuthError, AuthMode, Authenticator};

/// Verifies payload signatures against one public key
pub struct SignatureVerifier {
    key: VerifyingKey<Sha256>,
}

impl SignatureVerifier {
    /// Wrap a loaded public key
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::new(public_key),
        }
    }

    /// Trust verdict for `signature` over `payload`
    ///
    /// A mismatch is an ordinary `false`, including signatures of the wrong
    /// length or encoding.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::try_from(signature) else {
            return false;
        };
        self.key.verify(payload, &signature).is_ok()
    }
}

/// Authenticator for signed envelopes
pub struct SignatureAuthenticator {
    verifier: SignatureVerifier,
}

impl SignatureAuthenticator {
    /// Authenticator trusting `public_key`
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            verifier: SignatureVerifier::new(public_key),
        }
    }

    /// Underlying verifier
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }
}

impl std::fmt::Debug for SignatureAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureAuthenticator").finish_non_exhaustive()
    }
}

impl Authenticator for SignatureAuthenticator {
    fn mode(&self) -> AuthMode {
        AuthMode::Signature
    }

    fn authenticate(&self, frame: &[u8]) -> Result<SensorReading, AuthError> {
        let envelope = decode_envelope(frame)?;

        if !self.verifier.verify(envelope.payload, envelope.signature) {
            return Err(AuthError::AuthenticationFailed);
        }

        Ok(decode_reading(envelope.payload)?)
    }
}

/// Device-side signer producing signed envelopes
pub struct ReadingSigner {
    key: SigningKey<Sha256>,
}

impl ReadingSigner {
    /// Signer using `private_key`
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self {
            key: SigningKey::new(private_key),
        }
    }

    /// Encode, sign and frame a reading
    pub fn sign(&self, reading: &SensorReading) -> Result<Vec<u8>, AuthError> {
        let payload = encode_reading(reading);
        let signature = self
            .key
            .try_sign(&payload)
            .map_err(|e| AuthError::Sealing(e.to_string()))?;

        Ok(encode_envelope(&payload, &signature.to_vec()))
    }
}
