//! Site client
//!
//! Provides read-modify-write access to one encrypted site. Every write
//! carries the token of the content this client last confirmed the server
//! holds, so a concurrent edit by someone else makes the write fail instead
//! of silently overwriting it.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{CipherKind, ClientConfig};
use crate::crypto::{AesGcmCipher, Cipher, OpenSslAesCipher, SecureString};
use crate::error::{ProtectedTextError, ProtectedTextResult};
use crate::protocol::{concurrency_token, join_tabs, split_tabs, SiteId};
use crate::store::{DeleteRequest, HttpStore, RemoteStore, SaveRequest};

/// Per-session view of the remote site
#[derive(Debug, Default)]
struct Session {
    /// Plaintext of the last fetch or accepted commit
    document: String,
    /// Token of the content the server is known to hold; empty for a new site
    init_hash_content: String,
    current_db_version: i64,
    expected_db_version: i64,
    has_read: bool,
}

/// Client for a single encrypted site.
///
/// Operations take `&mut self`: one client runs one operation at a time.
/// Wrap it in a `tokio::sync::Mutex` to share it between tasks.
pub struct SiteClient<S = HttpStore> {
    site: String,
    site_id: SiteId,
    passphrase: SecureString,
    store: S,
    cipher: Box<dyn Cipher>,
    session: Session,
}

impl SiteClient<HttpStore> {
    /// Client for `site` on the service named by the environment (or the default)
    pub fn new(
        site: impl Into<String>,
        passphrase: impl Into<SecureString>,
    ) -> ProtectedTextResult<Self> {
        Self::with_config(site, passphrase, &ClientConfig::from_env()?)
    }

    /// Client for `site` using explicit settings
    pub fn with_config(
        site: impl Into<String>,
        passphrase: impl Into<SecureString>,
        config: &ClientConfig,
    ) -> ProtectedTextResult<Self> {
        let store = HttpStore::new(config)?;
        let cipher: Box<dyn Cipher> = match config.cipher {
            CipherKind::OpensslAes => Box::new(OpenSslAesCipher::new()),
            CipherKind::AesGcm => Box::new(AesGcmCipher::new(config.key_derivation)),
        };
        Ok(Self::from_parts(site.into(), passphrase.into(), store, cipher))
    }
}

impl<S: RemoteStore> SiteClient<S> {
    /// Client for `site` backed by any store and cipher
    pub fn with_store(
        site: impl Into<String>,
        passphrase: impl Into<SecureString>,
        store: S,
        cipher: impl Cipher + 'static,
    ) -> Self {
        Self::from_parts(site.into(), passphrase.into(), store, Box::new(cipher))
    }

    fn from_parts(
        site: String,
        passphrase: SecureString,
        store: S,
        cipher: Box<dyn Cipher>,
    ) -> Self {
        let site_id = SiteId::for_site(&site);
        Self {
            site,
            site_id,
            passphrase,
            store,
            cipher,
            session: Session::default(),
        }
    }

    /// Site name
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Identifier appended to every saved plaintext
    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    /// Plaintext of the last fetch or successful commit
    pub fn document(&self) -> &str {
        &self.session.document
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the passphrase used for subsequent operations.
    ///
    /// This does not re-encrypt anything; see [`SiteClient::change_passphrase`].
    pub fn set_passphrase(&mut self, passphrase: impl Into<SecureString>) {
        self.passphrase = passphrase.into();
    }

    /// Fetch, decrypt and verify the site's document.
    ///
    /// A new site yields an empty document. The session token is refreshed
    /// only when the whole read succeeds.
    pub async fn fetch_document(&mut self) -> ProtectedTextResult<String> {
        let remote = self.store.fetch(&self.site).await?;
        debug!(
            site = %self.site,
            is_new = remote.is_new,
            current_db_version = remote.current_db_version,
            expected_db_version = remote.expected_db_version,
            "fetched site state"
        );

        let (document, token) = if remote.is_new {
            (String::new(), String::new())
        } else {
            let encrypted = remote.encrypted_content.unwrap_or_default();
            let decrypted = self.cipher.decrypt(&encrypted, &self.passphrase)?;
            let document = match self.site_id.untag(&decrypted) {
                Ok(body) => body.to_string(),
                Err(e) => {
                    warn!(site = %self.site, "decrypted content carries a foreign site tag");
                    return Err(e);
                }
            };
            let token = concurrency_token(&document, &self.passphrase, remote.current_db_version)?;
            (document, token)
        };

        self.session = Session {
            document: document.clone(),
            init_hash_content: token,
            current_db_version: remote.current_db_version,
            expected_db_version: remote.expected_db_version,
            has_read: true,
        };
        Ok(document)
    }

    /// Encrypt and save `text` as the whole document.
    ///
    /// Fetches first if this session has not read the site yet. A rejected
    /// write leaves the session untouched; re-fetch and re-apply the edit.
    pub async fn commit_document(&mut self, text: &str) -> ProtectedTextResult<()> {
        if !self.session.has_read {
            self.fetch_document().await?;
        }

        let next_token =
            concurrency_token(text, &self.passphrase, self.session.expected_db_version)?;
        let encrypted = self.cipher.encrypt(&self.site_id.tag(text), &self.passphrase)?;
        let request = SaveRequest::new(
            self.session.init_hash_content.clone(),
            next_token.clone(),
            encrypted,
        );

        let response = self
            .store
            .save(&self.site, &request)
            .await
            .inspect_err(|e| {
                if e.is_write_rejected() {
                    warn!(site = %self.site, error = %e, "save refused");
                }
            })?;
        if !response.is_success() {
            warn!(site = %self.site, status = %response.status, "save refused");
            return Err(ProtectedTextError::save_rejected(response.reason()));
        }

        debug!(site = %self.site, bytes = text.len(), "saved site");
        self.session.init_hash_content = next_token;
        self.session.current_db_version = self.session.expected_db_version;
        self.session.document = text.to_string();
        Ok(())
    }

    /// Delete the site on the server.
    ///
    /// Fetches first when no token is cached. A site that was never saved
    /// has no token, so deleting it is always refused by the server.
    /// On success the session starts over as if nothing had been read.
    pub async fn delete_document(&mut self) -> ProtectedTextResult<()> {
        if self.session.init_hash_content.is_empty() {
            self.fetch_document().await?;
        }

        let request = DeleteRequest::new(self.session.init_hash_content.clone());
        let response = self.store.delete(&self.site, &request).await?;
        if !response.is_success() {
            warn!(site = %self.site, status = %response.status, "delete refused");
            return Err(ProtectedTextError::delete_rejected(response.reason()));
        }

        debug!(site = %self.site, "deleted site");
        self.session = Session::default();
        Ok(())
    }

    /// Fetch the document and split it into tabs
    pub async fn list_tabs(&mut self) -> ProtectedTextResult<Vec<String>> {
        let document = self.fetch_document().await?;
        Ok(split_tabs(&document))
    }

    /// Append a tab and return its index
    pub async fn append_tab(&mut self, content: &str) -> ProtectedTextResult<usize> {
        let mut tabs = self.list_tabs().await?;
        let index = tabs.len();
        tabs.push(content.to_string());
        self.commit_document(&join_tabs(&tabs)).await?;
        Ok(index)
    }

    /// Remove the tab at `index`, returning its content
    pub async fn remove_tab(&mut self, index: usize) -> ProtectedTextResult<String> {
        let mut tabs = self.list_tabs().await?;
        check_index(index, tabs.len())?;
        let removed = tabs.remove(index);
        self.commit_document(&join_tabs(&tabs)).await?;
        Ok(removed)
    }

    /// Replace the content of the tab at `index`
    pub async fn replace_tab(&mut self, index: usize, content: &str) -> ProtectedTextResult<()> {
        let mut tabs = self.list_tabs().await?;
        check_index(index, tabs.len())?;
        tabs[index] = content.to_string();
        self.commit_document(&join_tabs(&tabs)).await
    }

    /// Re-encrypt the site under a new passphrase.
    ///
    /// If the save is refused the old passphrase stays in effect.
    pub async fn change_passphrase(
        &mut self,
        new_passphrase: impl Into<SecureString>,
    ) -> ProtectedTextResult<()> {
        let document = self.fetch_document().await?;
        let previous = std::mem::replace(&mut self.passphrase, new_passphrase.into());

        if let Err(e) = self.commit_document(&document).await {
            self.passphrase = previous;
            return Err(e);
        }
        debug!(site = %self.site, "passphrase changed");
        Ok(())
    }
}

fn check_index(index: usize, len: usize) -> ProtectedTextResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(ProtectedTextError::IndexOutOfRange { index, len })
    }
}

impl<S: fmt::Debug> fmt::Debug for SiteClient<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteClient")
            .field("site", &self.site)
            .field("passphrase", &self.passphrase)
            .field("store", &self.store)
            .field("has_read", &self.session.has_read)
            .field("expected_db_version", &self.session.expected_db_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::crypto::KeyDerivationParams;
    use crate::store::MemoryStore;

    fn test_cipher() -> AesGcmCipher {
        AesGcmCipher::new(KeyDerivationParams::with_values(64, 1, 1))
    }

    fn client(store: &Arc<MemoryStore>, passphrase: &str) -> SiteClient<Arc<MemoryStore>> {
        SiteClient::with_store("mysite", passphrase, Arc::clone(store), test_cipher())
    }

    #[tokio::test]
    async fn test_commit_without_read_fetches_once() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");

        client.commit_document("hello").await.unwrap();
        assert_eq!(store.fetches(), 1);

        client.commit_document("hello again").await.unwrap();
        assert_eq!(store.fetches(), 1);
        assert_eq!(client.document(), "hello again");
    }

    #[tokio::test]
    async fn test_tokens_chain_across_commits() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");

        client.commit_document("one").await.unwrap();
        assert_eq!(
            store.stored_hash("mysite").unwrap(),
            concurrency_token("one", "pass", 2).unwrap()
        );

        client.commit_document("two").await.unwrap();
        assert_eq!(
            store.stored_hash("mysite").unwrap(),
            concurrency_token("two", "pass", 2).unwrap()
        );
        assert_eq!(store.accepted_writes(), 2);
    }

    #[tokio::test]
    async fn test_new_site_sends_empty_init_token() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");

        assert_eq!(client.fetch_document().await.unwrap(), "");
        assert!(client.session.has_read);
        assert!(client.session.init_hash_content.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_commit_keeps_session() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");
        client.commit_document("base").await.unwrap();

        store.fail_writes_with_status(Some(500));
        let err = client.commit_document("lost").await.unwrap_err();
        assert!(err.is_write_rejected());
        assert_eq!(client.document(), "base");

        store.fail_writes_with_status(None);
        client.commit_document("kept").await.unwrap();
        assert_eq!(client.fetch_document().await.unwrap(), "kept");
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_decryption_failure() {
        let store = Arc::new(MemoryStore::new());
        client(&store, "right").commit_document("secret").await.unwrap();

        let mut intruder = client(&store, "wrong");
        let err = intruder.fetch_document().await.unwrap_err();
        assert!(matches!(err, ProtectedTextError::Decryption(_)));
        assert!(!intruder.session.has_read);
    }

    #[tokio::test]
    async fn test_unsupported_expected_version() {
        let store = Arc::new(MemoryStore::with_expected_version(7));
        let mut client = client(&store, "pass");

        let err = client.commit_document("text").await.unwrap_err();
        assert!(matches!(err, ProtectedTextError::UnsupportedProtocolVersion(7)));
        assert!(store.raw_content("mysite").is_none());
    }

    #[tokio::test]
    async fn test_version_transition() {
        let store = Arc::new(MemoryStore::with_expected_version(1));
        let mut client = client(&store, "pass");
        client.commit_document("v1 content").await.unwrap();
        assert_eq!(
            store.stored_hash("mysite").unwrap(),
            concurrency_token("v1 content", "pass", 1).unwrap()
        );

        store.set_expected_version(2);
        client.fetch_document().await.unwrap();
        assert_eq!(client.session.current_db_version, 1);
        client.commit_document("v2 content").await.unwrap();
        assert!(store.stored_hash("mysite").unwrap().ends_with('2'));

        assert_eq!(client.fetch_document().await.unwrap(), "v2 content");
        assert_eq!(client.session.current_db_version, 2);
    }

    #[tokio::test]
    async fn test_delete_resets_session() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");
        client.commit_document("bye").await.unwrap();

        client.delete_document().await.unwrap();
        assert!(store.raw_content("mysite").is_none());
        assert_eq!(client.document(), "");
        assert!(!client.session.has_read);
    }

    #[tokio::test]
    async fn test_delete_with_stale_token_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut first = client(&store, "pass");
        let mut second = client(&store, "pass");
        first.commit_document("a").await.unwrap();
        second.fetch_document().await.unwrap();
        first.commit_document("b").await.unwrap();

        let err = second.delete_document().await.unwrap_err();
        assert!(matches!(err, ProtectedTextError::WriteRejected { action: "delete", .. }));
        assert!(store.raw_content("mysite").is_some());
    }

    #[tokio::test]
    async fn test_delete_never_saved_site_refused() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "pass");
        client.fetch_document().await.unwrap();

        let err = client.delete_document().await.unwrap_err();
        assert!(matches!(err, ProtectedTextError::WriteRejected { action: "delete", .. }));
        assert_eq!(store.fetches(), 2);
        assert_eq!(store.accepted_writes(), 0);
    }

    #[tokio::test]
    async fn test_failed_passphrase_change_restores_old_passphrase() {
        let store = Arc::new(MemoryStore::new());
        let mut client = client(&store, "old");
        client.commit_document("text").await.unwrap();

        store.fail_writes_with_status(Some(502));
        assert!(client.change_passphrase("new").await.is_err());
        store.fail_writes_with_status(None);

        assert_eq!(client.fetch_document().await.unwrap(), "text");
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let store = Arc::new(MemoryStore::new());
        let client = client(&store, "hunter2");
        let debug = format!("{:?}", client);
        assert!(debug.contains("mysite"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_check_index() {
        assert!(check_index(0, 1).is_ok());
        assert!(matches!(
            check_index(1, 1),
            Err(ProtectedTextError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}
