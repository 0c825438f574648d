//! Passphrase-based AES-256-GCM encryption of site content
//!
//! Every ciphertext is a self-describing base64 string: the payload carries
//! its own salt, nonce and Argon2id parameters, so any client holding the
//! passphrase can decrypt it regardless of local configuration.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{ProtectedTextError, ProtectedTextResult};

use super::key_derivation::{derive_key, KeyDerivationParams, SALT_SIZE};

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Current payload format
const PAYLOAD_VERSION: u8 = 1;

/// Symmetric passphrase-based encryption of site content.
///
/// `decrypt` must fail with [`ProtectedTextError::Decryption`] when the
/// passphrase is wrong or the ciphertext was tampered with.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` into a transportable string
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> ProtectedTextResult<String>;

    /// Decrypt a string produced by [`Cipher::encrypt`]
    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> ProtectedTextResult<String>;
}

/// Encrypted data with associated metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptedPayload {
    /// Version for future algorithm upgrades
    #[serde(rename = "v")]
    version: u8,
    /// Argon2id parameters used for this message
    kdf: KeyDerivationParams,
    /// Key derivation salt (base64 encoded)
    salt: String,
    /// The nonce used for this encryption (base64 encoded)
    nonce: String,
    /// The encrypted ciphertext with authentication tag (base64 encoded)
    ct: String,
}

impl EncryptedPayload {
    fn decode_field(value: &str, name: &str) -> ProtectedTextResult<Vec<u8>> {
        STANDARD.decode(value).map_err(|e| {
            ProtectedTextError::Decryption(format!("Invalid {} encoding: {}", name, e))
        })
    }

    /// Parse the outer base64/JSON envelope
    fn parse(encoded: &str) -> ProtectedTextResult<Self> {
        let json = STANDARD.decode(encoded.trim()).map_err(|e| {
            ProtectedTextError::Decryption(format!("Invalid ciphertext encoding: {}", e))
        })?;
        let payload: Self = serde_json::from_slice(&json).map_err(|e| {
            ProtectedTextError::Decryption(format!("Malformed ciphertext payload: {}", e))
        })?;

        if payload.version != PAYLOAD_VERSION {
            return Err(ProtectedTextError::Decryption(format!(
                "Unsupported encryption version: {}",
                payload.version
            )));
        }
        Ok(payload)
    }

    fn encode(&self) -> ProtectedTextResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

/// Argon2id + AES-256-GCM implementation of [`Cipher`]
#[derive(Debug, Clone, Default)]
pub struct AesGcmCipher {
    params: KeyDerivationParams,
}

impl AesGcmCipher {
    /// Create a cipher that derives keys with the given parameters
    pub fn new(params: KeyDerivationParams) -> Self {
        Self { params }
    }

    /// Key derivation parameters used for new ciphertexts
    pub fn params(&self) -> &KeyDerivationParams {
        &self.params
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> ProtectedTextResult<String> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(passphrase, &salt, &self.params)?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| {
            ProtectedTextError::Encryption(format!("Failed to create cipher: {}", e))
        })?;

        // Generate random nonce
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| ProtectedTextError::Encryption(format!("Encryption failed: {}", e)))?;

        EncryptedPayload {
            version: PAYLOAD_VERSION,
            kdf: self.params,
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(nonce_bytes),
            ct: STANDARD.encode(ciphertext),
        }
        .encode()
    }

    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> ProtectedTextResult<String> {
        let payload = EncryptedPayload::parse(ciphertext)?;
        payload
            .kdf
            .check_limits()
            .map_err(|e| ProtectedTextError::Decryption(e.to_string()))?;

        let salt = EncryptedPayload::decode_field(&payload.salt, "salt")?;
        let nonce_bytes = EncryptedPayload::decode_field(&payload.nonce, "nonce")?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(ProtectedTextError::Decryption(format!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            )));
        }
        let sealed = EncryptedPayload::decode_field(&payload.ct, "ciphertext")?;

        // A payload with unusable KDF params cannot have come from a valid encrypt
        let key = derive_key(passphrase, &salt, &payload.kdf)
            .map_err(|e| ProtectedTextError::Decryption(e.to_string()))?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| {
            ProtectedTextError::Encryption(format!("Failed to create cipher: {}", e))
        })?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_ref())
            .map_err(|_| {
                ProtectedTextError::Decryption("invalid passphrase or corrupted data".to_string())
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            ProtectedTextError::Decryption(format!("Invalid UTF-8 in decrypted data: {}", e))
        })
    }
}
