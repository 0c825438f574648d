//! protected-text - client for ProtectedText-style encrypted note sites
//!
//! A site is a single document encrypted client-side with the user's
//! passphrase. This crate fetches and decrypts it, edits it as a list of
//! tabs, and writes it back using hash-based optimistic concurrency so that
//! concurrent edits are detected rather than overwritten.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `client`: `SiteClient`, the read/modify/write session for one site
//! - `config`: Client settings and environment overrides
//! - `crypto`: Passphrase-based encryption (service-compatible AES-CBC, AES-256-GCM)
//! - `error`: Custom error types
//! - `logging`: tracing subscriber setup
//! - `protocol`: Content hashing, site tags and tab handling
//! - `store`: Remote store trait with HTTP and in-memory implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use protected_text::SiteClient;
//!
//! let mut client = SiteClient::new("mysite", "correct horse battery staple")?;
//! let index = client.append_tab("groceries: milk, eggs").await?;
//! client.replace_tab(index, "groceries: milk, eggs, bread").await?;
//! ```

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod store;

pub use client::SiteClient;
pub use config::ClientConfig;
pub use error::{ProtectedTextError, ProtectedTextResult};
pub use store::{HttpStore, MemoryStore, RemoteStore};
