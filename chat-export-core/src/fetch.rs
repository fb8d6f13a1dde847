//! HTTP implementation of [`BlobFetcher`].

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use tracing::{error, info};

use crate::contract::{BlobFetcher, FetchError};

/// Fetches blobs from a fixed origin. References that are already absolute
/// URLs are used as they are.
pub struct HttpBlobFetcher {
    client: Client,
    origin: String,
    session_cookie: Option<String>,
}

impl HttpBlobFetcher {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            origin: origin.into().trim_end_matches('/').to_string(),
            session_cookie: None,
        }
    }

    /// Send `cookie` as the `Cookie` header with every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn resolve_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else if reference.starts_with('/') {
            format!("{}{}", self.origin, reference)
        } else {
            format!("{}/{}", self.origin, reference)
        }
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.resolve_url(url);
        info!(url = %url, "Fetching blob");

        let mut request = self.client.get(&url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to send blob request");
            FetchError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Blob source returned error");
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read blob body");
            FetchError::Transport(e.to_string())
        })?;
        info!(url = %url, size = bytes.len(), "Fetched blob");
        Ok(bytes.to_vec())
    }
}
