//! Key derivation using Argon2id
//!
//! Derives per-message encryption keys from site passphrases using Argon2id,
//! a memory-hard key derivation function resistant to GPU/ASIC attacks.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ProtectedTextError, ProtectedTextResult};

/// Length of the random salt stored alongside every ciphertext
pub const SALT_SIZE: usize = 16;

/// Highest accepted memory cost in KiB (256 MiB)
pub const MAX_MEMORY_COST: u32 = 262_144;

/// Highest accepted number of passes
pub const MAX_TIME_COST: u32 = 16;

/// Highest accepted number of lanes
pub const MAX_PARALLELISM: u32 = 16;

/// Parameters for key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Create params with specific values
    pub fn with_values(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    fn to_argon2(self) -> ProtectedTextResult<Params> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(32), // Output length for AES-256
        )
        .map_err(|e| {
            ProtectedTextError::Encryption(format!("Invalid Argon2 parameters: {}", e))
        })
    }

    /// Check the cost stays within what this crate is willing to spend.
    ///
    /// Ciphertexts carry their own parameters, so a reader must not trust
    /// them blindly.
    pub fn check_limits(&self) -> ProtectedTextResult<()> {
        if self.memory_cost > MAX_MEMORY_COST
            || self.time_cost > MAX_TIME_COST
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(ProtectedTextError::Encryption(format!(
                "Argon2 parameters exceed limits: m={} KiB, t={}, p={} (max m={}, t={}, p={})",
                self.memory_cost,
                self.time_cost,
                self.parallelism,
                MAX_MEMORY_COST,
                MAX_TIME_COST,
                MAX_PARALLELISM
            )));
        }
        Ok(())
    }

    /// Check the parameters are within limits and accepted by Argon2
    pub fn validate(&self) -> ProtectedTextResult<()> {
        self.check_limits()?;
        self.to_argon2().map(|_| ())
    }
}

/// A derived encryption key, zeroed on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    /// The 32-byte key for AES-256
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

/// Derive an encryption key from a passphrase and salt
pub fn derive_key(
    passphrase: &str,
    salt: &[u8],
    params: &KeyDerivationParams,
) -> ProtectedTextResult<DerivedKey> {
    params.check_limits()?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| ProtectedTextError::Encryption(format!("Key derivation failed: {}", e)))?;

    Ok(DerivedKey { key })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KeyDerivationParams {
        KeyDerivationParams::with_values(64, 1, 1)
    }

    #[test]
    fn test_derive_key() {
        let key = derive_key("test_passphrase", &[7u8; SALT_SIZE], &fast_params()).unwrap();
        assert_eq!(key.as_bytes().len(), 32);
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key("test_passphrase", &salt, &fast_params()).unwrap();
        let key2 = derive_key("test_passphrase", &salt, &fast_params()).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key("passphrase1", &salt, &fast_params()).unwrap();
        let key2 = derive_key("passphrase2", &salt, &fast_params()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("same_passphrase", &[1u8; SALT_SIZE], &fast_params()).unwrap();
        let key2 = derive_key("same_passphrase", &[2u8; SALT_SIZE], &fast_params()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_invalid_params_rejected() {
        // Argon2 needs at least 8 KiB per lane
        let params = KeyDerivationParams::with_values(8, 1, 4);
        assert!(params.validate().is_err());
        assert!(matches!(
            derive_key("x", &[0u8; SALT_SIZE], &params),
            Err(ProtectedTextError::Encryption(_))
        ));
    }

    #[test]
    fn test_excessive_params_rejected() {
        for params in [
            KeyDerivationParams::with_values(8, 100_000, 1),
            KeyDerivationParams::with_values(MAX_MEMORY_COST + 1, 1, 1),
            KeyDerivationParams::with_values(0x0FFF_FFFF, 3, 4),
            KeyDerivationParams::with_values(1024, 1, MAX_PARALLELISM + 1),
        ] {
            assert!(params.validate().is_err());
            assert!(matches!(
                derive_key("x", &[0u8; SALT_SIZE], &params),
                Err(ProtectedTextError::Encryption(_))
            ));
        }
    }

    #[test]
    fn test_default_params_valid() {
        assert!(KeyDerivationParams::default().validate().is_ok());
    }
}
