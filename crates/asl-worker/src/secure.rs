//! # Secure Payloads
//!
//! Older producers wrote change-request bodies as
//! `{"secure": true, "payload": "<base64>"}`. The payload decodes to a
//! 12-byte AES-GCM nonce followed by the ciphertext (tag included) of the
//! JSON body, under a 256-bit key shared through configuration.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

/// Errors from secure payload handling.
#[derive(Error, Debug)]
pub enum SecureError {
    #[error("secure payload key must be {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),

    #[error("secure payload key is not valid hex: {0}")]
    KeyHex(String),

    #[error("secure payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("secure payload too short: {0} bytes")]
    TooShort(usize),

    #[error("secure payload failed authentication")]
    Cipher,
}

/// The AES-256-GCM key used for secure payloads.
#[derive(Clone)]
pub struct SecureKey {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureKey([REDACTED])")
    }
}

impl SecureKey {
    pub fn from_bytes(key: &[u8]) -> Result<Self, SecureError> {
        if key.len() != KEY_LEN {
            return Err(SecureError::KeyLength(key.len()));
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| SecureError::KeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Parse a 64-character hex key.
    pub fn from_hex(hex: &str) -> Result<Self, SecureError> {
        let bytes = hex_to_bytes(hex.trim()).map_err(SecureError::KeyHex)?;
        Self::from_bytes(&bytes)
    }

    /// Encrypt `plaintext` under a fresh random nonce into the wire form.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, SecureError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self.cipher.encrypt(&nonce, plaintext).map_err(|_| SecureError::Cipher)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a base64 payload back to the plaintext bytes.
    pub fn decrypt(&self, payload: &str) -> Result<Vec<u8>, SecureError> {
        let raw = STANDARD.decode(payload.trim())?;
        if raw.len() <= NONCE_LEN {
            return Err(SecureError::TooShort(raw.len()));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecureError::Cipher)
    }
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .ok_or_else(|| format!("non-ASCII character near position {i}"))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16).map_err(|e| format!("invalid hex at position {i}: {e}"))
                })
        })
        .collect()
}
