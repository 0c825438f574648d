//! OpenSSL-compatible AES-256-CBC encryption
//!
//! This is the format the hosted note service and its web UI use (the
//! CryptoJS `AES.encrypt(text, passphrase)` default): base64 of
//! `"Salted__" || salt[8] || ciphertext`, with key and IV derived by
//! `EVP_BytesToKey` over MD5 with one iteration.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use base64::{engine::general_purpose::STANDARD, Engine};
use md5::{Digest, Md5};
use zeroize::Zeroizing;

use super::encryption::Cipher;
use crate::error::{ProtectedTextError, ProtectedTextResult};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Cipher speaking the hosted service's native format
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSslAesCipher;

impl OpenSslAesCipher {
    pub fn new() -> Self {
        Self
    }

    fn encrypt_with_salt(
        plaintext: &str,
        passphrase: &str,
        salt: &[u8; SALT_LEN],
    ) -> ProtectedTextResult<String> {
        let key_iv = evp_bytes_to_key(passphrase.as_bytes(), salt);
        let (key, iv) = key_iv.split_at(KEY_LEN);

        let ciphertext = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| {
                ProtectedTextError::Encryption(format!("Failed to create cipher: {}", e))
            })?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut blob = Vec::with_capacity(MAGIC.len() + SALT_LEN + ciphertext.len());
        blob.extend_from_slice(MAGIC);
        blob.extend_from_slice(salt);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }
}

/// `EVP_BytesToKey(MD5, count = 1)` producing 32 key bytes followed by 16 IV bytes
fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut derived = Zeroizing::new(Vec::with_capacity(KEY_LEN + IV_LEN + 16));
    let mut previous: Vec<u8> = Vec::new();

    while derived.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(passphrase);
        hasher.update(salt);
        previous = hasher.finalize().to_vec();
        derived.extend_from_slice(&previous);
    }

    derived.truncate(KEY_LEN + IV_LEN);
    derived
}

impl Cipher for OpenSslAesCipher {
    fn encrypt(&self, plaintext: &str, passphrase: &str) -> ProtectedTextResult<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self::encrypt_with_salt(plaintext, passphrase, &salt)
    }

    fn decrypt(&self, ciphertext: &str, passphrase: &str) -> ProtectedTextResult<String> {
        let blob = STANDARD.decode(ciphertext.trim()).map_err(|e| {
            ProtectedTextError::Decryption(format!("Invalid ciphertext encoding: {}", e))
        })?;

        let header_len = MAGIC.len() + SALT_LEN;
        if blob.len() <= header_len || &blob[..MAGIC.len()] != MAGIC {
            return Err(ProtectedTextError::Decryption("Missing Salted__ header".to_string()));
        }
        let (salt, sealed) = blob[MAGIC.len()..].split_at(SALT_LEN);

        let key_iv = evp_bytes_to_key(passphrase.as_bytes(), salt);
        let (key, iv) = key_iv.split_at(KEY_LEN);

        let plaintext = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| {
                ProtectedTextError::Encryption(format!("Failed to create cipher: {}", e))
            })?
            .decrypt_padded_vec_mut::<Pkcs7>(sealed)
            .map_err(|_| {
                ProtectedTextError::Decryption("invalid passphrase or corrupted data".to_string())
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            ProtectedTextError::Decryption(format!("Invalid UTF-8 in decrypted data: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // openssl enc -aes-256-cbc -md md5 -S 0102030405060708 -pass pass:secret
    const KNOWN_CIPHERTEXT: &str = "U2FsdGVkX18BAgMEBQYHCDgayERkxXibMuUh6ooXMww=";
    const KNOWN_SALT: [u8; SALT_LEN] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn test_key_and_iv_match_openssl() {
        let key_iv = evp_bytes_to_key(b"secret", &KNOWN_SALT);
        assert_eq!(
            hex::encode_upper(&key_iv[..KEY_LEN]),
            "C9E5A1BD216DBE1317E230CEF48F38EE7F0E17AD64022144BCCEC4A1AA2879AB"
        );
        assert_eq!(
            hex::encode_upper(&key_iv[KEY_LEN..]),
            "E24B32BBBC4EF02ECBCB6576523AD893"
        );
    }

    #[test]
    fn test_decrypts_openssl_output() {
        let plaintext = OpenSslAesCipher.decrypt(KNOWN_CIPHERTEXT, "secret").unwrap();
        assert_eq!(plaintext, "hello world");
    }

    #[test]
    fn test_encrypt_matches_openssl_for_fixed_salt() {
        let encrypted =
            OpenSslAesCipher::encrypt_with_salt("hello world", "secret", &KNOWN_SALT).unwrap();
        assert_eq!(encrypted, KNOWN_CIPHERTEXT);
    }

    #[test]
    fn test_round_trip_with_random_salt() {
        let cipher = OpenSslAesCipher::new();
        let text = "tab one\nzweite Notiz ✓";
        let encrypted = cipher.encrypt(text, "pass").unwrap();
        assert!(encrypted.starts_with("U2FsdGVkX1"));
        assert_eq!(cipher.decrypt(&encrypted, "pass").unwrap(), text);
        assert_ne!(encrypted, cipher.encrypt(text, "pass").unwrap());
    }

    #[test]
    fn test_wrong_passphrase_or_garbage_fails() {
        let cipher = OpenSslAesCipher::new();
        // A wrong key can still yield valid padding by chance; the site tag
        // check catches that case, so only assert it is not the plaintext.
        assert_ne!(
            cipher.decrypt(KNOWN_CIPHERTEXT, "wrong").ok().as_deref(),
            Some("hello world")
        );
        assert!(matches!(
            cipher.decrypt("bm90IHNhbHRlZA==", "secret"),
            Err(ProtectedTextError::Decryption(_))
        ));
        assert!(matches!(
            cipher.decrypt("***", "secret"),
            Err(ProtectedTextError::Decryption(_))
        ));
    }
}
