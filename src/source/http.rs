//! URL loader backed by `reqwest`, with inline handling of `data:` URIs.

use async_trait::async_trait;
use resize_scale::Surface;
use tracing::debug;

use super::{Loader, decode_surface};
use crate::encode::data_uri_to_blob;
use crate::error::{ResizeError, ResizeResult};

/// Loads `http://`, `https://` and `data:` URLs.
#[derive(Clone, Debug, Default)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch(&self, url: &str) -> ResizeResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResizeError::load_with(url, "request failed", e))?
            .error_for_status()
            .map_err(|e| {
                let status = e.status().map(|s| s.as_u16().to_string()).unwrap_or_default();
                ResizeError::load_with(url, "server returned an error status", e)
                    .with_metadata("status", status)
            })?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ResizeError::load_with(url, "failed to read response body", e))?;
        debug!(url, bytes = bytes.len(), "fetched image");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Loader for HttpLoader {
    async fn load(&self, url: &str) -> ResizeResult<Surface> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ResizeError::load("", "no source url given")
                .with_recovery_suggestion("Pass an http(s) or data: URL"));
        }
        let scheme = trimmed.split_once(':').map(|(s, _)| s.to_ascii_lowercase());
        match scheme.as_deref() {
            Some("data") => {
                let blob = data_uri_to_blob(trimmed).map_err(|e| {
                    ResizeError::load_with("data: uri", "malformed data uri", e)
                })?;
                decode_surface(blob.data, "data: uri").await
            }
            Some("http") | Some("https") => {
                let bytes = self.fetch(trimmed).await?;
                decode_surface(bytes, trimmed).await
            }
            _ => Err(ResizeError::load(trimmed, "unsupported url scheme")
                .with_recovery_suggestion("Use an http(s) or data: URL, or pass a file input")),
        }
    }
}
