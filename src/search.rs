//! Search-engine dorking.
//!
//! Google Custom Search and Bing Web Search clients, plus the fan-out that
//! runs one query per (provider, extension) pair and funnels every hit into a
//! single dedup collector.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::model::{DocumentTask, SearchHit};
use crate::notice::Notifier;
use crate::settings::UserSettings;
use crate::traits::{HarvestError, SearchProvider};

pub const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const BING_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

/// File types dorked when none are given.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "xlsx", "xlsm", "xltx", "xltm", "docx", "docm", "dotm", "dotx", "ppt", "pptx", "potm", "potx",
    "pdf",
];

fn transport_error(url: &str, err: reqwest::Error) -> HarvestError {
    HarvestError::TransportFailure {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

// ============================================================================
// Google
// ============================================================================

pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    link: String,
}

impl GoogleSearch {
    pub fn new(client: reqwest::Client, api_key: String, engine_id: String) -> Self {
        Self {
            client,
            api_key,
            engine_id,
        }
    }

    pub fn query(domain: &str, extension: &str) -> String {
        format!("site:{domain} & filetype:{extension}")
    }
}

fn google_hits(response: GoogleResponse) -> Result<Vec<SearchHit>, HarvestError> {
    if response.items.is_empty() {
        return Err(HarvestError::NoResults {
            provider: "google".to_string(),
        });
    }
    Ok(response
        .items
        .into_iter()
        .map(|item| SearchHit {
            provider: "google".to_string(),
            url: item.link,
        })
        .collect())
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn provider_id(&self) -> &str {
        "google"
    }

    async fn search(&self, domain: &str, extension: &str) -> Result<Vec<SearchHit>, HarvestError> {
        let query = Self::query(domain, extension);
        let response: GoogleResponse = self
            .client
            .get(GOOGLE_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transport_error(GOOGLE_ENDPOINT, e))?
            .json()
            .await
            .map_err(|e| HarvestError::MalformedInput(e.to_string()))?;
        google_hits(response)
    }
}

// ============================================================================
// Bing
// ============================================================================

pub struct BingSearch {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    #[serde(default)]
    web_pages: BingWebPages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingWebPages {
    #[serde(default)]
    total_estimated_matches: u64,
    #[serde(default)]
    value: Vec<BingPage>,
}

#[derive(Debug, Deserialize)]
struct BingPage {
    url: String,
}

impl BingSearch {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    pub fn query(domain: &str, extension: &str) -> String {
        format!("site:{domain} && filetype:{extension} && instreamset:(url title):{extension}")
    }
}

fn bing_hits(response: BingResponse) -> Result<Vec<SearchHit>, HarvestError> {
    if response.web_pages.total_estimated_matches == 0 {
        return Err(HarvestError::NoResults {
            provider: "bing".to_string(),
        });
    }
    Ok(response
        .web_pages
        .value
        .into_iter()
        .map(|page| SearchHit {
            provider: "bing".to_string(),
            url: page.url,
        })
        .collect())
}

#[async_trait]
impl SearchProvider for BingSearch {
    fn provider_id(&self) -> &str {
        "bing"
    }

    async fn search(&self, domain: &str, extension: &str) -> Result<Vec<SearchHit>, HarvestError> {
        let query = Self::query(domain, extension);
        let response: BingResponse = self
            .client
            .get(BING_ENDPOINT)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transport_error(BING_ENDPOINT, e))?
            .json()
            .await
            .map_err(|e| HarvestError::MalformedInput(e.to_string()))?;
        bing_hits(response)
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Builds a provider for every set of credentials present in `settings`.
///
/// A provider without credentials is reported and left out; an empty result
/// means the run finds no documents.
pub fn providers_from_settings(
    settings: &UserSettings,
    client: &reqwest::Client,
    notifier: Notifier,
) -> Vec<Arc<dyn SearchProvider>> {
    let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();

    if settings.bing_key.is_empty() {
        notifier.failure(HarvestError::ConfigurationMissing("bing".to_string()));
    } else {
        providers.push(Arc::new(BingSearch::new(
            client.clone(),
            settings.bing_key.clone(),
        )));
    }

    if settings.google_key.is_empty() || settings.google_id.is_empty() {
        notifier.failure(HarvestError::ConfigurationMissing("google".to_string()));
    } else {
        providers.push(Arc::new(GoogleSearch::new(
            client.clone(),
            settings.google_key.clone(),
            settings.google_id.clone(),
        )));
    }

    providers
}

/// Dorks `domain` for every extension on every provider and returns the
/// distinct document URLs in first-seen order.
#[instrument(skip(providers, extensions, notifier), fields(providers = providers.len()))]
pub async fn discover_documents(
    providers: &[Arc<dyn SearchProvider>],
    domain: &str,
    extensions: &[String],
    notifier: Notifier,
) -> Vec<DocumentTask> {
    let (hit_tx, hit_rx) = mpsc::unbounded_channel::<SearchHit>();
    let collector = tokio::spawn(dedup_hits(hit_rx, notifier));

    let mut dorks = JoinSet::new();
    for provider in providers {
        for extension in extensions {
            let provider = Arc::clone(provider);
            let domain = domain.to_string();
            let extension = extension.clone();
            let hits = hit_tx.clone();
            dorks.spawn(async move {
                match provider.search(&domain, &extension).await {
                    Ok(found) => {
                        debug!(provider = provider.provider_id(), %extension, hits = found.len(), "Dork completed");
                        for hit in found {
                            // receiver only closes after every dork joined
                            let _ = hits.send(hit);
                        }
                    }
                    Err(e) => notifier.failure(format_args!("{} ({})", e, extension)),
                }
            });
        }
    }
    drop(hit_tx);

    while let Some(joined) = dorks.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Dork task aborted");
        }
    }

    let urls = collector.await.unwrap_or_else(|e| {
        warn!(error = %e, "URL collector aborted");
        IndexSet::new()
    });
    notifier.progress(format_args!("Total documents identified: {}", urls.len()));
    urls.into_iter().map(DocumentTask::new).collect()
}

async fn dedup_hits(
    mut hits: mpsc::UnboundedReceiver<SearchHit>,
    notifier: Notifier,
) -> IndexSet<String> {
    let mut urls = IndexSet::new();
    while let Some(hit) = hits.recv().await {
        if urls.contains(&hit.url) {
            continue;
        }
        notifier.progress(format_args!("[{}] {}", hit.provider, hit.url));
        urls.insert(hit.url);
    }
    urls
}
