//! Remote store abstraction
//!
//! The client only needs three calls from the note service: fetch the
//! current envelope, save a new ciphertext, and delete the site. Both the
//! HTTP implementation and the in-memory emulation speak the same wire
//! types defined here.

pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProtectedTextResult;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// Status value the server returns for an accepted write
pub const STATUS_SUCCESS: &str = "success";

/// Envelope returned by `GET {base}/{site}?action=getJSON`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    /// Encrypted content; empty or absent for a new site
    #[serde(rename = "eContent", default)]
    pub encrypted_content: Option<String>,

    /// The site has never been saved
    #[serde(rename = "isNew", default)]
    pub is_new: bool,

    /// Hash version the stored content was saved under
    #[serde(rename = "currentDBVersion", default)]
    pub current_db_version: i64,

    /// Hash version the server expects the next write to use
    #[serde(rename = "expectedDBVersion", default)]
    pub expected_db_version: i64,
}

/// Form body of a save request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    /// Token of the content the client last saw
    pub init_hash_content: String,
    /// Token of the content being written
    pub current_hash_content: String,
    pub encrypted_content: String,
    action: &'static str,
}

impl SaveRequest {
    pub fn new(
        init_hash_content: impl Into<String>,
        current_hash_content: impl Into<String>,
        encrypted_content: impl Into<String>,
    ) -> Self {
        Self {
            init_hash_content: init_hash_content.into(),
            current_hash_content: current_hash_content.into(),
            encrypted_content: encrypted_content.into(),
            action: "save",
        }
    }
}

/// Form body of a delete request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub init_hash_content: String,
    action: &'static str,
}

impl DeleteRequest {
    pub fn new(init_hash_content: impl Into<String>) -> Self {
        Self {
            init_hash_content: init_hash_content.into(),
            action: "delete",
        }
    }
}

/// JSON acknowledgement of a save or delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Human-readable reason for a rejection
    pub fn reason(&self) -> String {
        match &self.message {
            Some(message) => format!("status {}: {}", self.status, message),
            None => format!("status {}", self.status),
        }
    }
}

/// Remote storage for encrypted sites.
///
/// Implementations report transport problems as errors; an application-level
/// refusal comes back as an [`ActionResponse`] whose status is not
/// `"success"`. An HTTP-level refusal of a write should be reported as
/// [`crate::ProtectedTextError::WriteRejected`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the current envelope for `site`
    async fn fetch(&self, site: &str) -> ProtectedTextResult<RemoteState>;

    /// Submit new content for `site`
    async fn save(&self, site: &str, request: &SaveRequest) -> ProtectedTextResult<ActionResponse>;

    /// Delete `site`
    async fn delete(
        &self,
        site: &str,
        request: &DeleteRequest,
    ) -> ProtectedTextResult<ActionResponse>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn fetch(&self, site: &str) -> ProtectedTextResult<RemoteState> {
        (**self).fetch(site).await
    }

    async fn save(&self, site: &str, request: &SaveRequest) -> ProtectedTextResult<ActionResponse> {
        (**self).save(site, request).await
    }

    async fn delete(
        &self,
        site: &str,
        request: &DeleteRequest,
    ) -> ProtectedTextResult<ActionResponse> {
        (**self).delete(site, request).await
    }
}
