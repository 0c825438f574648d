//! Versioned content hashing
//!
//! The server never sees plaintext, so optimistic concurrency is driven by a
//! hash of the content the client last saw. The server announces which hash
//! variant applies via its DB version numbers.

use sha2::{Digest, Sha512};

use crate::error::{ProtectedTextError, ProtectedTextResult};

/// Hex-encoded (lowercase) SHA-512 of a UTF-8 string
pub fn hex_sha512(data: &str) -> String {
    hex::encode(Sha512::digest(data.as_bytes()))
}

/// Hash algorithm variant selected by the server's DB version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbVersion {
    /// `sha512(content)`
    V1,
    /// `sha512(content + sha512(passphrase)) + "2"`
    V2,
}

impl DbVersion {
    /// Numeric value as reported by the server
    pub fn number(self) -> i64 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Compute the concurrency token for `content` under this version
    pub fn token(self, content: &str, passphrase: &str) -> String {
        match self {
            Self::V1 => hex_sha512(content),
            Self::V2 => {
                let mut salted = String::with_capacity(content.len() + 128);
                salted.push_str(content);
                salted.push_str(&hex_sha512(passphrase));
                format!("{}{}", hex_sha512(&salted), self.number())
            }
        }
    }
}

impl TryFrom<i64> for DbVersion {
    type Error = ProtectedTextError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(ProtectedTextError::UnsupportedProtocolVersion(other)),
        }
    }
}

/// Concurrency token for `content` under the raw server-reported version
pub fn concurrency_token(
    content: &str,
    passphrase: &str,
    version: i64,
) -> ProtectedTextResult<String> {
    Ok(DbVersion::try_from(version)?.token(content, passphrase))
}
