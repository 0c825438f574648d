//! Cryptographic functions for protected-text
//!
//! Provides the hosted service's OpenSSL-compatible AES-256-CBC format,
//! an AES-256-GCM alternative with Argon2id key derivation, and zeroizing
//! storage for passphrases.

pub mod encryption;
pub mod key_derivation;
pub mod openssl_aes;
pub mod secure_memory;

pub use encryption::{AesGcmCipher, Cipher};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use openssl_aes::OpenSslAesCipher;
pub use secure_memory::SecureString;
