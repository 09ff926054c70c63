//! AES-256-GCM sealing of vault payloads.
//!
//! Every payload is sealed under a fresh random 96-bit nonce. Sealed values
//! are kept base64-encoded so they can live in TEXT columns.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// Base64-encoded ciphertext and the nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: String,
    pub nonce: String,
}

/// Authenticated cipher bound to the vault master key.
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    /// Builds a cipher from a base64-encoded 32-byte master key.
    pub fn from_base64(key_base64: &str) -> Result<Self> {
        let key = BASE64
            .decode(key_base64.trim())
            .context("Encryption key is not valid base64")?;
        Self::from_bytes(&key)
    }

    pub fn from_bytes(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(anyhow!(
                "Encryption key must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                key.len()
            ));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| anyhow!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a new random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Sealed> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        Ok(Sealed {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
        })
    }

    /// Decrypts and authenticates a sealed payload.
    ///
    /// Fails on a wrong key, wrong nonce, or any tampering with the ciphertext.
    pub fn open(&self, sealed: &Sealed) -> Result<Vec<u8>> {
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .context("Failed to decode ciphertext")?;
        let nonce = BASE64
            .decode(&sealed.nonce)
            .context("Failed to decode nonce")?;
        if nonce.len() != NONCE_SIZE {
            return Err(anyhow!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce.len()
            ));
        }

        self.cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))
    }
}
