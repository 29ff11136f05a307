//! Compressed payload fetching
//!
//! One GET per payload file, all files of an environment in flight at once.
//! The environment resolves only when every file has arrived; the first
//! failure fails the whole environment and no partial face list is returned.

use std::time::Duration;

use bytes::Bytes;
use futures_util::future::try_join_all;
use thiserror::Error;

use super::source::EnvironmentSource;

/// Errors that can occur while fetching payloads
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// URL of the request that failed, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Status { url, .. } | FetchError::Transport { url, .. } => Some(url),
            FetchError::Client(_) => None,
        }
    }
}

/// HTTP client bound to a CDN base URL
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    base: String,
}

impl AssetFetcher {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            base: base.into(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Fetch a single payload; any non-2xx status is a failure
    pub async fn fetch_file(&self, url: String) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;
        tracing::trace!(%url, bytes = body.len(), "Fetched payload");
        Ok(body)
    }

    /// Fetch every file of one environment concurrently
    ///
    /// Returns the buffers in the order of `paths`.
    pub async fn fetch_environment(
        &self,
        source: &EnvironmentSource,
        paths: &[String],
    ) -> Result<Vec<Bytes>, FetchError> {
        tracing::debug!(environment = %source.id, files = paths.len(), "Fetching environment");
        let requests = paths.iter().map(|path| self.fetch_file(source.url(&self.base, path)));
        let files = try_join_all(requests).await?;
        tracing::debug!(
            environment = %source.id,
            files = files.len(),
            bytes = files.iter().map(|f| f.len()).sum::<usize>(),
            "Fetched environment"
        );
        Ok(files)
    }
}
