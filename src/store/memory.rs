//! In-process emulation of the note service
//!
//! Behaves like the real server as far as the client can observe: it keeps
//! the ciphertext and the last accepted content token per site, and refuses
//! writes whose `initHashContent` does not match what it holds.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{ActionResponse, DeleteRequest, RemoteState, RemoteStore, SaveRequest};
use crate::error::{ProtectedTextError, ProtectedTextResult};

#[derive(Debug, Clone)]
struct StoredSite {
    encrypted: String,
    hash: String,
    version: i64,
}

#[derive(Debug)]
struct State {
    sites: HashMap<String, StoredSite>,
    expected_version: i64,
    http_failure: Option<u16>,
    accepted_writes: usize,
    fetches: usize,
}

/// Thread-safe in-memory [`RemoteStore`]
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store expecting version 2 hashes
    pub fn new() -> Self {
        Self::with_expected_version(2)
    }

    /// Empty store expecting the given hash version for writes
    pub fn with_expected_version(version: i64) -> Self {
        Self {
            state: Mutex::new(State {
                sites: HashMap::new(),
                expected_version: version,
                http_failure: None,
                accepted_writes: 0,
                fetches: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the map consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change the version announced for upcoming writes
    pub fn set_expected_version(&self, version: i64) {
        self.lock().expected_version = version;
    }

    /// Make every write fail at the HTTP level with `status`, or stop doing so
    pub fn fail_writes_with_status(&self, status: Option<u16>) {
        self.lock().http_failure = status;
    }

    /// Store raw ciphertext and token for a site, bypassing checks
    pub fn insert_raw(&self, site: &str, encrypted: impl Into<String>, hash: impl Into<String>) {
        let mut state = self.lock();
        let version = state.expected_version;
        state.sites.insert(
            site.to_string(),
            StoredSite {
                encrypted: encrypted.into(),
                hash: hash.into(),
                version,
            },
        );
    }

    /// Ciphertext currently stored for a site
    pub fn raw_content(&self, site: &str) -> Option<String> {
        self.lock().sites.get(site).map(|s| s.encrypted.clone())
    }

    /// Token the next write to `site` must present
    pub fn stored_hash(&self, site: &str) -> Option<String> {
        self.lock().sites.get(site).map(|s| s.hash.clone())
    }

    /// Number of saves and deletes accepted so far
    pub fn accepted_writes(&self) -> usize {
        self.lock().accepted_writes
    }

    /// Number of fetches served so far
    pub fn fetches(&self) -> usize {
        self.lock().fetches
    }

    fn check_http(state: &State, action: &'static str) -> ProtectedTextResult<()> {
        match state.http_failure {
            Some(status) => Err(ProtectedTextError::WriteRejected {
                action,
                reason: format!("HTTP {}", status),
            }),
            None => Ok(()),
        }
    }

    fn token_matches(state: &State, site: &str, presented: &str) -> bool {
        let held = state.sites.get(site).map(|s| s.hash.as_str()).unwrap_or("");
        held == presented
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(&self, site: &str) -> ProtectedTextResult<RemoteState> {
        let mut state = self.lock();
        state.fetches += 1;
        let remote = match state.sites.get(site) {
            Some(stored) => RemoteState {
                encrypted_content: Some(stored.encrypted.clone()),
                is_new: false,
                current_db_version: stored.version,
                expected_db_version: state.expected_version,
            },
            None => RemoteState {
                encrypted_content: None,
                is_new: true,
                current_db_version: state.expected_version,
                expected_db_version: state.expected_version,
            },
        };
        Ok(remote)
    }

    async fn save(&self, site: &str, request: &SaveRequest) -> ProtectedTextResult<ActionResponse> {
        let mut state = self.lock();
        Self::check_http(&state, "save")?;

        if !Self::token_matches(&state, site, &request.init_hash_content) {
            debug!(site, "memory store refusing save with stale token");
            return Ok(ActionResponse::failure("content was modified by someone else"));
        }

        let version = state.expected_version;
        state.sites.insert(
            site.to_string(),
            StoredSite {
                encrypted: request.encrypted_content.clone(),
                hash: request.current_hash_content.clone(),
                version,
            },
        );
        state.accepted_writes += 1;
        Ok(ActionResponse::success())
    }

    async fn delete(
        &self,
        site: &str,
        request: &DeleteRequest,
    ) -> ProtectedTextResult<ActionResponse> {
        let mut state = self.lock();
        Self::check_http(&state, "delete")?;

        if !state.sites.contains_key(site)
            || !Self::token_matches(&state, site, &request.init_hash_content)
        {
            return Ok(ActionResponse::failure("nothing to delete or stale token"));
        }

        state.sites.remove(site);
        state.accepted_writes += 1;
        Ok(ActionResponse::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_site_is_new() {
        let store = MemoryStore::with_expected_version(1);
        let state = store.fetch("nowhere").await.unwrap();
        assert!(state.is_new);
        assert_eq!(state.expected_db_version, 1);
    }

    #[tokio::test]
    async fn test_save_requires_matching_token() {
        let store = MemoryStore::new();

        let first = store.save("s", &SaveRequest::new("", "h1", "c1")).await.unwrap();
        assert!(first.is_success());

        let stale = store.save("s", &SaveRequest::new("", "h2", "c2")).await.unwrap();
        assert!(!stale.is_success());
        assert_eq!(store.raw_content("s").as_deref(), Some("c1"));

        let chained = store.save("s", &SaveRequest::new("h1", "h2", "c2")).await.unwrap();
        assert!(chained.is_success());
        assert_eq!(store.stored_hash("s").as_deref(), Some("h2"));
        assert_eq!(store.accepted_writes(), 2);
    }

    #[tokio::test]
    async fn test_version_advances_on_save() {
        let store = MemoryStore::with_expected_version(1);
        store.save("s", &SaveRequest::new("", "h1", "c1")).await.unwrap();
        store.set_expected_version(2);

        let state = store.fetch("s").await.unwrap();
        assert_eq!(state.current_db_version, 1);
        assert_eq!(state.expected_db_version, 2);

        store.save("s", &SaveRequest::new("h1", "h2", "c2")).await.unwrap();
        assert_eq!(store.fetch("s").await.unwrap().current_db_version, 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.insert_raw("s", "c", "h");

        let wrong = store.delete("s", &DeleteRequest::new("x")).await.unwrap();
        assert!(!wrong.is_success());

        let ok = store.delete("s", &DeleteRequest::new("h")).await.unwrap();
        assert!(ok.is_success());
        assert!(store.fetch("s").await.unwrap().is_new);
    }

    #[tokio::test]
    async fn test_forced_http_failure() {
        let store = MemoryStore::new();
        store.fail_writes_with_status(Some(503));

        let err = store.save("s", &SaveRequest::new("", "h", "c")).await.unwrap_err();
        assert!(err.is_write_rejected());
        assert!(store.raw_content("s").is_none());
    }
}
