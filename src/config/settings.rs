//! Client settings for protected-text
//!
//! Manages the remote endpoint, HTTP behaviour, the ciphertext format and
//! the key derivation cost used for new ciphertexts.
//!
//! ## Base URL Resolution Order
//!
//! 1. `PROTECTED_TEXT_BASE_URL` environment variable (if set)
//! 2. `base_url` from the supplied JSON document
//! 3. `https://www.protectedtext.com`

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::key_derivation::KeyDerivationParams;
use crate::error::ProtectedTextError;

/// Environment variable overriding the remote base URL
pub const BASE_URL_ENV: &str = "PROTECTED_TEXT_BASE_URL";

/// Default remote service
pub const DEFAULT_BASE_URL: &str = "https://www.protectedtext.com";

/// Ciphertext format used by [`crate::SiteClient::with_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CipherKind {
    /// OpenSSL `Salted__` AES-256-CBC, readable by the hosted service's web UI
    #[default]
    OpensslAes,
    /// Argon2id + AES-256-GCM, for self-hosted stores only
    AesGcm,
}

/// Settings for a [`crate::SiteClient`] and its HTTP store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the note service, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout applied by the HTTP transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Format of saved ciphertexts
    #[serde(default)]
    pub cipher: CipherKind,

    /// Argon2id parameters for newly written `aes_gcm` ciphertexts
    #[serde(default)]
    pub key_derivation: KeyDerivationParams,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("protected-text/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            cipher: CipherKind::default(),
            key_derivation: KeyDerivationParams::default(),
        }
    }
}

impl ClientConfig {
    /// Default settings with the environment override applied
    pub fn from_env() -> Result<Self, ProtectedTextError> {
        Self::default().with_env_overrides()
    }

    /// Parse settings from a JSON document, then apply the environment override
    pub fn from_json(json: &str) -> Result<Self, ProtectedTextError> {
        let config: ClientConfig = serde_json::from_str(json).map_err(|e| {
            ProtectedTextError::Config(format!("Failed to parse client settings: {}", e))
        })?;
        config.with_env_overrides()
    }

    /// Use a different base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different ciphertext format
    pub fn with_cipher(mut self, cipher: CipherKind) -> Self {
        self.cipher = cipher;
        self
    }

    /// Use different key derivation parameters
    pub fn with_key_derivation(mut self, params: KeyDerivationParams) -> Self {
        self.key_derivation = params;
        self
    }

    fn with_env_overrides(mut self) -> Result<Self, ProtectedTextError> {
        if let Ok(custom) = std::env::var(BASE_URL_ENV) {
            self.base_url = custom;
        }
        self.validate()?;
        Ok(self)
    }

    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL with any trailing slash removed
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ProtectedTextError> {
        let base = self.normalized_base_url();
        if base.is_empty() {
            return Err(ProtectedTextError::Config("Base URL cannot be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProtectedTextError::Config(format!(
                "Base URL must use http or https: {}",
                base
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ProtectedTextError::Config(
                "Timeout must be at least one second".into(),
            ));
        }
        self.key_derivation.validate().map_err(|e| {
            ProtectedTextError::Config(format!("Invalid key derivation settings: {}", e))
        })
    }
}
