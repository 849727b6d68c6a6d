//! Avatar source resolution.
//!
//! Policy documents reference avatars by source URI; the bytes are only
//! fetched by the reconciler immediately before the corresponding
//! `SetAvatar` connector call. A failed read aborts that one action, not
//! the pass.

use async_trait::async_trait;
use tracing::debug;

use crate::error::AvatarError;

/// Resolves an avatar source reference to raw image bytes.
#[async_trait]
pub trait AvatarReader: Send + Sync {
    /// Fetch the image bytes behind the reference.
    async fn read(&self, uri: &str) -> Result<Vec<u8>, AvatarError>;
}

/// Reads avatars from `http(s)://` URLs and `file://` paths.
#[derive(Debug)]
pub struct UriAvatarReader {
    client: reqwest::Client,
}

impl UriAvatarReader {
    /// Create a reader with a default HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a reader with a caller-supplied HTTP client (to share
    /// connection pools or timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for UriAvatarReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AvatarReader for UriAvatarReader {
    async fn read(&self, uri: &str) -> Result<Vec<u8>, AvatarError> {
        if let Some(path) = uri.strip_prefix("file://") {
            let bytes =
                std::fs::read(path).map_err(|e| AvatarError::read(uri, e.to_string()))?;
            debug!(uri, size = bytes.len(), "read avatar from file");
            return Ok(bytes);
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            let response = self
                .client
                .get(uri)
                .send()
                .await
                .map_err(|e| AvatarError::read(uri, e.to_string()))?
                .error_for_status()
                .map_err(|e| AvatarError::read(uri, e.to_string()))?;

            let bytes = response
                .bytes()
                .await
                .map_err(|e| AvatarError::read(uri, e.to_string()))?;
            debug!(uri, size = bytes.len(), "fetched avatar over http");
            return Ok(bytes.to_vec());
        }

        Err(AvatarError::UnsupportedScheme(uri.to_string()))
    }
}
