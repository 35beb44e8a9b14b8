//! AES-GCM symmetric strategy
//!
//! The device encrypts a JSON reading under a shared key and ships
//! `{ "encrypted_data": base64(ciphertext || tag), "iv": base64(iv) }`.
//! Key size selects AES-128 or AES-256; IV size (12 to 16 bytes) selects
//! the GCM nonce length. The tag is always 16 bytes.

use aes_gcm::{
    aead::{
        consts::{U12, U13, U14, U15, U16},
        Aead, KeyInit, Nonce,
    },
    aes::{Aes128, Aes256},
    AesGcm,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use telemguard_core::{
    constants::wire::{IV_MAX_LEN, IV_MIN_LEN, TAG_LEN},
    decode_plaintext, FrameError, SensorReading,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{AuthError, AuthMode, Authenticator, KeyError};

/// Length of IVs generated by [`SymmetricAuthenticator::seal`]
pub const SEAL_IV_LEN: usize = 12;

/// Shared AES key (16 or 32 bytes), wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey(Vec<u8>);

impl SymmetricKey {
    /// Accept raw key bytes of a supported size
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        match bytes.len() {
            16 | 32 => Ok(Self(bytes.to_vec())),
            actual => Err(KeyError::InvalidKeyLength { actual }),
        }
    }

    /// Random AES-256 key
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key size in bits
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey(AES-{})", self.bits())
    }
}

/// Transport form of an encrypted reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// base64(ciphertext || tag)
    pub encrypted_data: String,
    /// base64(iv)
    pub iv: String,
}

impl EncryptedEnvelope {
    /// Encode raw IV and sealed bytes
    pub fn new(iv: &[u8], sealed: &[u8]) -> Self {
        Self {
            encrypted_data: STANDARD.encode(sealed),
            iv: STANDARD.encode(iv),
        }
    }

    /// Parse the JSON document carried on the bus
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(bytes).map_err(|_| {
            AuthError::Malformed(FrameError::Unrecognized {
                reason: "frame is not an encrypted envelope",
            })
        })
    }

    /// Serialize as the JSON document carried on the bus
    pub fn to_json(&self) -> Result<Vec<u8>, AuthError> {
        serde_json::to_vec(self).map_err(|e| AuthError::Sealing(e.to_string()))
    }

    /// Decode the base64 fields into `(iv, ciphertext || tag)`
    pub fn decode(&self) -> Result<(Vec<u8>, Vec<u8>), AuthError> {
        let iv = STANDARD
            .decode(&self.iv)
            .map_err(|_| AuthError::decryption("iv is not valid base64"))?;
        let sealed = STANDARD
            .decode(&self.encrypted_data)
            .map_err(|_| AuthError::decryption("encrypted_data is not valid base64"))?;
        Ok((iv, sealed))
    }
}

macro_rules! with_cipher {
    ($op:ident, $key:expr, $iv:expr, $data:expr) => {
        match ($key.len(), $iv.len()) {
            (16, 12) => $op::<AesGcm<Aes128, U12>>($key, $iv, $data),
            (16, 13) => $op::<AesGcm<Aes128, U13>>($key, $iv, $data),
            (16, 14) => $op::<AesGcm<Aes128, U14>>($key, $iv, $data),
            (16, 15) => $op::<AesGcm<Aes128, U15>>($key, $iv, $data),
            (16, 16) => $op::<AesGcm<Aes128, U16>>($key, $iv, $data),
            (32, 12) => $op::<AesGcm<Aes256, U12>>($key, $iv, $data),
            (32, 13) => $op::<AesGcm<Aes256, U13>>($key, $iv, $data),
            (32, 14) => $op::<AesGcm<Aes256, U14>>($key, $iv, $data),
            (32, 15) => $op::<AesGcm<Aes256, U15>>($key, $iv, $data),
            (32, 16) => $op::<AesGcm<Aes256, U16>>($key, $iv, $data),
            _ => Err(AuthError::decryption("unsupported key or iv length")),
        }
    };
}

fn open<C: Aead + KeyInit>(key: &[u8], iv: &[u8], sealed: &[u8]) -> Result<Vec<u8>, AuthError> {
    let cipher = C::new_from_slice(key).map_err(|_| AuthError::decryption("bad key"))?;
    cipher
        .decrypt(Nonce::<C>::from_slice(iv), sealed)
        .map_err(|_| AuthError::decryption("tag mismatch"))
}

fn close<C: Aead + KeyInit>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
    let cipher = C::new_from_slice(key).map_err(|_| AuthError::Sealing("bad key".into()))?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), plaintext)
        .map_err(|_| AuthError::Sealing("encryption failed".into()))
}

fn check_iv(iv: &[u8]) -> Result<(), AuthError> {
    if (IV_MIN_LEN..=IV_MAX_LEN).contains(&iv.len()) {
        Ok(())
    } else {
        Err(AuthError::decryption("iv must be 12 to 16 bytes"))
    }
}

/// Authenticated decryption of `ciphertext || tag`
///
/// Never returns partial plaintext: any failure is `DecryptionFailed`.
pub fn decrypt(key: &SymmetricKey, iv: &[u8], sealed: &[u8]) -> Result<Vec<u8>, AuthError> {
    check_iv(iv)?;
    if sealed.len() < TAG_LEN {
        return Err(AuthError::decryption("ciphertext shorter than tag"));
    }
    with_cipher!(open, key.as_bytes(), iv, sealed)
}

/// Encrypt `plaintext`, returning `ciphertext || tag`
pub fn encrypt(key: &SymmetricKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
    check_iv(iv).map_err(|e| AuthError::Sealing(e.to_string()))?;
    with_cipher!(close, key.as_bytes(), iv, plaintext)
}

/// Authenticator for encrypted envelopes
pub struct SymmetricAuthenticator {
    key: SymmetricKey,
}

impl SymmetricAuthenticator {
    /// Authenticator holding the shared key
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    /// Decrypt an envelope and decode the reading it carries
    pub fn open(&self, envelope: &EncryptedEnvelope) -> Result<SensorReading, AuthError> {
        let (iv, sealed) = envelope.decode()?;
        let plaintext = decrypt(&self.key, &iv, &sealed)?;
        Ok(decode_plaintext(&plaintext)?)
    }

    /// Encrypt a reading as JSON under a fresh random IV (device side)
    pub fn seal(&self, reading: &SensorReading) -> Result<EncryptedEnvelope, AuthError> {
        let mut iv = [0u8; SEAL_IV_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut iv);

        let plaintext = serde_json::to_vec(reading).map_err(|e| AuthError::Sealing(e.to_string()))?;
        let sealed = encrypt(&self.key, &iv, &plaintext)?;
        Ok(EncryptedEnvelope::new(&iv, &sealed))
    }
}

impl std::fmt::Debug for SymmetricAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricAuthenticator")
            .field("key", &self.key)
            .finish()
    }
}

impl Authenticator for SymmetricAuthenticator {
    fn mode(&self) -> AuthMode {
        AuthMode::Symmetric
    }

    fn authenticate(&self, frame: &[u8]) -> Result<SensorReading, AuthError> {
        self.open(&EncryptedEnvelope::from_json(frame)?)
    }
}
