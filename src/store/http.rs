//! HTTP implementation of [`RemoteStore`] using reqwest

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{ActionResponse, DeleteRequest, RemoteState, RemoteStore, SaveRequest};
use crate::config::ClientConfig;
use crate::error::{ProtectedTextError, ProtectedTextResult};

/// Talks to the note service over HTTP(S)
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    /// Build a store from validated settings
    pub fn new(config: &ClientConfig) -> ProtectedTextResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProtectedTextError::Config(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
        })
    }

    /// URL of a site page, e.g. `https://www.protectedtext.com/mysite`
    pub fn site_url(&self, site: &str) -> String {
        format!("{}/{}", self.base_url, site.trim_start_matches('/'))
    }

    async fn post_action<T: Serialize + Sync>(
        &self,
        site: &str,
        form: &T,
        action: &'static str,
    ) -> ProtectedTextResult<ActionResponse> {
        let url = self.site_url(site);
        debug!(%url, action, "posting site action");

        let response = self.client.post(&url).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtectedTextError::WriteRejected {
                action,
                reason: format!("HTTP {}", status),
            });
        }

        Ok(response.json::<ActionResponse>().await?)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn fetch(&self, site: &str) -> ProtectedTextResult<RemoteState> {
        let url = self.site_url(site);
        debug!(%url, "fetching site state");

        let response = self
            .client
            .get(&url)
            .query(&[("action", "getJSON")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProtectedTextError::Transport(format!(
                "GET {} returned HTTP {}",
                url, status
            )));
        }

        Ok(response.json::<RemoteState>().await?)
    }

    async fn save(&self, site: &str, request: &SaveRequest) -> ProtectedTextResult<ActionResponse> {
        self.post_action(site, request, "save").await
    }

    async fn delete(
        &self,
        site: &str,
        request: &DeleteRequest,
    ) -> ProtectedTextResult<ActionResponse> {
        self.post_action(site, request, "delete").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_url() {
        let config = ClientConfig::default().with_base_url("https://notes.example/");
        let store = HttpStore::new(&config).unwrap();
        assert_eq!(store.site_url("mysite"), "https://notes.example/mysite");
        assert_eq!(store.site_url("/mysite"), "https://notes.example/mysite");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig::default().with_base_url("notes.example");
        assert!(matches!(
            HttpStore::new(&config),
            Err(ProtectedTextError::Config(_))
        ));
    }

    #[test]
    fn test_debug_shows_base_url() {
        let store = HttpStore::new(&ClientConfig::default()).unwrap();
        assert!(format!("{:?}", store).contains("protectedtext.com"));
    }
}
