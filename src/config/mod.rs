//! Configuration module for protected-text
//!
//! This module provides client settings:
//! - Remote endpoint resolution (with environment override)
//! - HTTP timeout and user agent
//! - Ciphertext format
//! - Key derivation cost for new ciphertexts

pub mod settings;

pub use settings::{CipherKind, ClientConfig};
