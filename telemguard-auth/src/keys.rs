//! Key material loading
//!
//! Keys are read once at startup into an immutable [`KeyMaterial`] value
//! which is then handed to whoever needs it. A missing or corrupt key is a
//! [`KeyError`] and the process must not start serving.

use std::{fs, path::Path, sync::Arc};

use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};
use zeroize::Zeroize;

use crate::{
    AuthMode, Authenticator, KeyError, SignatureAuthenticator, SymmetricAuthenticator,
    SymmetricKey,
};

/// Parse an RSA public key from SPKI (`BEGIN PUBLIC KEY`) or PKCS#1 PEM
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// Parse an RSA private key from PKCS#8 or PKCS#1 PEM
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, KeyError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| KeyError::Encoding(e.to_string()))
}

/// Load an RSA public key file
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, KeyError> {
    let pem = read_text(path)?;
    parse_public_key_pem(&pem).map_err(|e| corrupt(path, e))
}

/// Load an RSA private key file (device side)
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, KeyError> {
    let pem = read_text(path)?;
    parse_private_key_pem(&pem).map_err(|e| corrupt(path, e))
}

/// Load a raw symmetric key file
pub fn load_symmetric_key(path: &Path) -> Result<SymmetricKey, KeyError> {
    let mut bytes = fs::read(path).map_err(|source| KeyError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let key = SymmetricKey::from_bytes(&bytes).map_err(|e| corrupt(path, e));
    bytes.zeroize();
    key
}

fn read_text(path: &Path) -> Result<String, KeyError> {
    fs::read_to_string(path).map_err(|source| KeyError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn corrupt(path: &Path, err: KeyError) -> KeyError {
    KeyError::Corrupt {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Verification or decryption key loaded at startup
///
/// Signature and symmetric modes are mutually exclusive: a deployment runs
/// exactly one of them.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Public key for signed envelopes
    Signature(RsaPublicKey),
    /// Shared key for encrypted envelopes
    Symmetric(SymmetricKey),
}

impl KeyMaterial {
    /// Load the key required by `mode` from `path`
    pub fn load(mode: AuthMode, path: &Path) -> Result<Self, KeyError> {
        let material = match mode {
            AuthMode::Signature => Self::Signature(load_public_key(path)?),
            AuthMode::Symmetric => Self::Symmetric(load_symmetric_key(path)?),
        };
        log::info!("Loaded {} key material from {}", mode, path.display());
        Ok(material)
    }

    /// Which strategy this material enables
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Signature(_) => AuthMode::Signature,
            Self::Symmetric(_) => AuthMode::Symmetric,
        }
    }

    /// Shared key, when running in symmetric mode
    pub fn symmetric_key(&self) -> Option<&SymmetricKey> {
        match self {
            Self::Symmetric(key) => Some(key),
            Self::Signature(_) => None,
        }
    }

    /// Build the matching authenticator
    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        match self {
            Self::Signature(key) => Arc::new(SignatureAuthenticator::new(key.clone())),
            Self::Symmetric(key) => Arc::new(SymmetricAuthenticator::new(key.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys;
    use rsa::{
        pkcs1::EncodeRsaPublicKey,
        pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding},
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn spki_and_pkcs1_public_keys() {
        let (_, public) = test_keys::rsa_pair();

        let spki = public.to_public_key_pem(LineEnding::LF).unwrap();
        let pkcs1 = public.to_pkcs1_pem(LineEnding::LF).unwrap();

        assert_eq!(parse_public_key_pem(&spki).unwrap(), public);
        assert_eq!(parse_public_key_pem(&pkcs1).unwrap(), public);
    }

    #[test]
    fn private_key_file() {
        let (private, _) = test_keys::rsa_pair();
        let pem = private.to_pkcs8_pem(LineEnding::LF).unwrap();
        let file = write(pem.as_bytes());

        assert_eq!(load_private_key(file.path()).unwrap(), private);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = KeyMaterial::load(AuthMode::Signature, Path::new("/nonexistent/key.pem"))
            .unwrap_err();
        assert!(matches!(err, KeyError::Unreadable { .. }));
    }

    #[test]
    fn garbage_pem_is_corrupt() {
        let file = write(b"-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n");
        let err = KeyMaterial::load(AuthMode::Signature, file.path()).unwrap_err();
        assert!(matches!(err, KeyError::Corrupt { .. }));
    }

    #[test]
    fn symmetric_key_file() {
        let file = write(&[0x42; 16]);
        let material = KeyMaterial::load(AuthMode::Symmetric, file.path()).unwrap();

        assert_eq!(material.mode(), AuthMode::Symmetric);
        assert_eq!(material.symmetric_key().map(SymmetricKey::bits), Some(128));
        assert_eq!(material.authenticator().mode(), AuthMode::Symmetric);
    }

    #[test]
    fn odd_sized_symmetric_key_is_corrupt() {
        let file = write(&[0x42; 20]);
        assert!(matches!(
            KeyMaterial::load(AuthMode::Symmetric, file.path()),
            Err(KeyError::Corrupt { .. })
        ));
    }
}
