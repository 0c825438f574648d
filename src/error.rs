//! Custom error types for protected-text
//!
//! This module defines the error hierarchy for the client using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for protected-text operations
#[derive(Error, Debug)]
pub enum ProtectedTextError {
    /// Wrong passphrase or corrupted ciphertext
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Decrypted content does not carry this site's trailing tag
    #[error("Integrity check failed: decrypted content does not belong to this site")]
    IntegrityMismatch,

    /// The server reported a hash version this client cannot compute
    #[error("Unsupported protocol version: {0}")]
    UnsupportedProtocolVersion(i64),

    /// The server refused a save or delete
    #[error("Server rejected {action}: {reason}")]
    WriteRejected {
        action: &'static str,
        reason: String,
    },

    /// Tab index outside the current tab list
    #[error("Tab index {index} out of range (site has {len} tabs)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Encryption or key derivation errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Network or HTTP errors while talking to the remote store
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProtectedTextError {
    /// Create a rejected-save error
    pub fn save_rejected(reason: impl Into<String>) -> Self {
        Self::WriteRejected {
            action: "save",
            reason: reason.into(),
        }
    }

    /// Create a rejected-delete error
    pub fn delete_rejected(reason: impl Into<String>) -> Self {
        Self::WriteRejected {
            action: "delete",
            reason: reason.into(),
        }
    }

    /// Check if this is a rejected write
    pub fn is_write_rejected(&self) -> bool {
        matches!(self, Self::WriteRejected { .. })
    }

    /// Whether re-fetching and re-applying the edit may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::WriteRejected { .. } | Self::Transport(_))
    }
}

// Implement From traits for common error types

impl From<serde_json::Error> for ProtectedTextError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for ProtectedTextError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Json(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type alias for protected-text operations
pub type ProtectedTextResult<T> = Result<T, ProtectedTextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtectedTextError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_write_rejected_error() {
        let err = ProtectedTextError::save_rejected("status fail");
        assert_eq!(err.to_string(), "Server rejected save: status fail");
        assert!(err.is_write_rejected());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_index_out_of_range_error() {
        let err = ProtectedTextError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Tab index 4 out of range (site has 2 tabs)");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ProtectedTextError = json_err.into();
        assert!(matches!(err, ProtectedTextError::Json(_)));
    }
}
