//! Frame Authentication for TelemGuard
//!
//! ## Overview
//!
//! Bytes read from the bus are untrusted. An [`Authenticator`] turns them
//! into a trusted [`SensorReading`] or says exactly why it could not:
//!
//! | Outcome | Meaning |
//! |---|---|
//! | [`AuthError::Malformed`] | bytes have the wrong shape |
//! | [`AuthError::AuthenticationFailed`] | signature does not match |
//! | [`AuthError::DecryptionFailed`] | tag mismatch or cipher error |
//! | [`AuthError::InvalidPayload`] | decrypted JSON lacks a field |
//!
//! None of these are exceptional; a collector logs them and keeps polling.
//!
//! ## Strategies
//!
//! - [`SignatureAuthenticator`]: RSA PKCS#1 v1.5 with SHA-256 over the
//!   24-byte payload of a signed envelope.
//! - [`SymmetricAuthenticator`]: AES-GCM (128 or 256) over a JSON or binary
//!   reading, shipped as a base64 JSON [`EncryptedEnvelope`].
//!
//! A deployment picks one via [`AuthMode`]; they are not composed.
//!
//! ## Key Material
//!
//! ```no_run
//! use std::path::Path;
//! use telemguard_auth::{AuthMode, KeyMaterial};
//!
//! // Fatal if missing or corrupt
//! let keys = KeyMaterial::load(AuthMode::Signature, Path::new(".keys/sensor_public.pem"))?;
//! let authenticator = keys.authenticator();
//!
//! # let frame = [0u8; 32];
//! match authenticator.authenticate(&frame) {
//!     Ok(reading) => println!("trusted reading from sensor {}", reading.sensor_id),
//!     Err(e) => println!("rejected: {e}"),
//! }
//! # Ok::<(), telemguard_auth::KeyError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::{fmt, str::FromStr};

pub use telemguard_core::SensorReading;

mod errors;
pub mod keys;
pub mod signature;
pub mod symmetric;

pub use errors::{AuthError, KeyError};
pub use keys::KeyMaterial;
pub use signature::{ReadingSigner, SignatureAuthenticator, SignatureVerifier};
pub use symmetric::{EncryptedEnvelope, SymmetricAuthenticator, SymmetricKey};

/// Which authentication strategy a deployment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Signed envelopes verified with a public key
    Signature,
    /// Encrypted envelopes opened with a shared key
    Symmetric,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => f.write_str("signature"),
            Self::Symmetric => f.write_str("symmetric"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signature" | "rsa" => Ok(Self::Signature),
            "symmetric" | "aes" => Ok(Self::Symmetric),
            other => Err(format!("unknown auth mode '{other}' (expected signature or symmetric)")),
        }
    }
}

/// Converts an untrusted bus frame into a trusted reading
pub trait Authenticator: Send + Sync {
    /// Strategy implemented
    fn mode(&self) -> AuthMode;

    /// Verify or decrypt `frame` and decode the reading it carries
    fn authenticate(&self, frame: &[u8]) -> Result<SensorReading, AuthError>;
}

#[cfg(test)]
pub(crate) mod test_keys {
    use std::sync::OnceLock;

    use rsa::{RsaPrivateKey, RsaPublicKey};

    static PAIR: OnceLock<(RsaPrivateKey, RsaPublicKey)> = OnceLock::new();

    /// One 1024-bit pair per test binary; generation is slow
    pub fn rsa_pair() -> (RsaPrivateKey, RsaPublicKey) {
        PAIR.get_or_init(|| {
            let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
            let public = RsaPublicKey::from(&private);
            (private, public)
        })
        .clone()
    }
}
