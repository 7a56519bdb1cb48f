use crate::harvest::traits::AnalysisError;
use crate::model::SearchHit;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Transport failure for {url}: {reason}")]
    TransportFailure { url: String, reason: String },
    #[error("[{provider}] no matches found")]
    NoResults { provider: String },
    #[error("No credentials configured for {0}")]
    ConfigurationMissing(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<AnalysisError> for HarvestError {
    fn from(err: AnalysisError) -> Self {
        HarvestError::MalformedInput(err.to_string())
    }
}

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Downloads the raw bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the provider tag attached to every hit (e.g., "google", "bing").
    fn provider_id(&self) -> &str;

    /// Dorks `domain` for documents with file type `extension`.
    async fn search(&self, domain: &str, extension: &str) -> Result<Vec<SearchHit>, HarvestError>;
}
