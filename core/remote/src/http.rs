//! HTTP implementation of the remote endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use drift_common::{Error, Result};

use crate::endpoint::{BatchItemResult, BatchRequest, RemoteEndpoint};

/// Default bound on any single request to the remote.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote authority reachable over HTTP.
///
/// Batches go to POST `sync/batch`, the health probe to GET `health`,
/// both relative to the base URL. Every request carries the client-wide
/// timeout; a timeout surfaces as a transport error like any other
/// network failure.
pub struct HttpRemote {
    http: Client,
    base_url: Url,
}

impl HttpRemote {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| Error::InvalidInput(format!("Invalid remote URL: {}", e)))?;

        let http = Client::builder()
            .user_agent("Drift/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidInput(format!("Invalid endpoint path {}: {}", path, e)))
    }
}

#[async_trait]
impl RemoteEndpoint for HttpRemote {
    async fn submit_batch(&self, request: &BatchRequest) -> Result<Vec<BatchItemResult>> {
        let url = self.endpoint("sync/batch")?;
        debug!(
            "Submitting batch of {} items (checksum {:08x})",
            request.items.len(),
            request.checksum
        );

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Batch endpoint returned {}", status);
            return Err(Error::Transport(format!(
                "Batch endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<Vec<BatchItemResult>>()
            .await
            .map_err(|e| Error::Transport(format!("Malformed batch response: {}", e)))
    }

    async fn check_health(&self) -> Result<bool> {
        let url = self.endpoint("health")?;

        match self.http.get(url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                debug!("Health probe failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(HttpRemote::new("not a url").is_err());
    }

    #[test]
    fn test_endpoint_joins_relative_paths() {
        let remote = HttpRemote::new("https://sync.example.com/api/").unwrap();
        let url = remote.endpoint("sync/batch").unwrap();
        assert_eq!(url.as_str(), "https://sync.example.com/api/sync/batch");
    }
}
