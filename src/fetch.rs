use async_trait::async_trait;
use tracing::debug;

use crate::traits::{DocumentFetcher, HarvestError};

/// Downloads documents over HTTP(S) with a shared `reqwest` client.
///
/// The client keeps reqwest's defaults: redirects are followed and no
/// request timeout is set.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let transport = |e: reqwest::Error| HarvestError::TransportFailure {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?;
        debug!(url, status = %response.status(), "Response received");

        let body = response.bytes().await.map_err(transport)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_transport_failure() {
        let err = HttpFetcher::new().fetch("not a url").await.unwrap_err();
        match err {
            HarvestError::TransportFailure { url, .. } => assert_eq!(url, "not a url"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
