//! Per-document harvest pipeline.
//!
//! This module provides the [`DocumentPipeline`] coordinator that drives one
//! [`DocumentTask`] through its stages (Fetch → Dispatch → Analysis) with:
//! - Async fetching through a [`DocumentFetcher`]
//! - CPU-bound analysis moved onto `tokio`'s blocking pool
//! - Structured logging via `tracing`
//!
//! No stage has a timeout. A hung fetch holds its own worker slot and
//! nothing else.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::harvest::formats::{default_formats, format_for};
use crate::harvest::traits::DocumentFormat;
use crate::model::{AnalysisResult, DocumentTask};
use crate::notice::Notifier;
use crate::traits::{DocumentFetcher, HarvestError};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Complete harvest result for one document.
#[derive(Debug)]
pub struct HarvestResult {
    /// Artifacts mined from the document
    pub analysis: AnalysisResult,

    /// Performance and processing statistics
    pub stats: HarvestStats,
}

/// Statistics about one document's trip through the pipeline.
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    /// Time spent downloading the document (milliseconds)
    pub fetch_duration_ms: u64,

    /// Time spent analysing the document (milliseconds)
    pub analysis_duration_ms: u64,

    /// Size of the fetched document (bytes)
    pub size_bytes: u64,

    /// Format that handled the document (e.g., "ooxml", "pdf")
    pub format: String,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that drop a single document from the run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The document could not be downloaded
    #[error("Failed to fetch {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: HarvestError,
    },

    /// The document was downloaded but could not be analysed
    #[error("Failed to analyse {url}: {reason}")]
    AnalysisFailed { url: String, reason: String },

    /// The blocking analysis task panicked or was cancelled
    #[error("Analysis task for {url} did not complete: {source}")]
    TaskJoin {
        url: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Fetches a document and hands it to the [`DocumentFormat`] matching its
/// extension.
///
/// # Thread Safety
///
/// The pipeline is `Send + Sync` and shared by every worker in the pool.
///
/// # Example
///
/// ```ignore
/// use doc_harvester::fetch::HttpFetcher;
/// use doc_harvester::harvest::DocumentPipeline;
/// use doc_harvester::model::DocumentTask;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = DocumentPipeline::new(HttpFetcher::new());
///     let task = DocumentTask::new("https://example.com/report.docx");
///     if let Some(result) = pipeline.execute(task).await? {
///         println!("{:?}", result.analysis.record.names);
///     }
///     Ok(())
/// }
/// ```
pub struct DocumentPipeline<F>
where
    F: DocumentFetcher,
{
    /// Download stage implementation
    fetcher: F,

    /// Analysis stage implementations, tried in order
    formats: Vec<Arc<dyn DocumentFormat>>,

    notifier: Notifier,
}

impl<F> DocumentPipeline<F>
where
    F: DocumentFetcher,
{
    /// Creates a pipeline with every known format and a non-silent notifier.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            formats: default_formats(),
            notifier: Notifier::default(),
        }
    }

    /// Replaces the set of formats documents are dispatched to.
    pub fn with_formats(mut self, formats: Vec<Arc<dyn DocumentFormat>>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier
    }

    /// Runs one document through fetch and analysis.
    ///
    /// Returns `Ok(None)` when no format handles the task's extension; the
    /// document is still fetched but nothing is extracted from it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the fetch fails or the matching format
    /// cannot open the document. Callers skip the document and carry on.
    #[instrument(skip(self, task), fields(url = %task.url))]
    pub async fn execute(&self, task: DocumentTask) -> Result<Option<HarvestResult>, PipelineError> {
        let mut stats = HarvestStats::default();

        // ====================================================================
        // Stage 1: Fetch
        // ====================================================================

        self.notifier.progress(format_args!("Processing file: {}", task.url));
        let fetch_start = Instant::now();

        let content = self
            .fetcher
            .fetch(&task.url)
            .await
            .map_err(|source| PipelineError::FetchFailed {
                url: task.url.clone(),
                source,
            })?;

        stats.fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
        stats.size_bytes = content.len() as u64;
        debug!(
            duration_ms = stats.fetch_duration_ms,
            size_bytes = stats.size_bytes,
            "Fetch completed"
        );

        // ====================================================================
        // Stage 2: Dispatch
        // ====================================================================

        let Some(format) = format_for(&self.formats, &task.extension).cloned() else {
            debug!(extension = %task.extension, "No format for extension, dropping");
            return Ok(None);
        };
        stats.format = format.name().to_string();

        // ====================================================================
        // Stage 3: Analysis
        // ====================================================================

        let analysis_start = Instant::now();

        let metadata = tokio::task::spawn_blocking(move || format.analyze(&content))
            .await
            .map_err(|source| PipelineError::TaskJoin {
                url: task.url.clone(),
                source,
            })?
            .map_err(|e| PipelineError::AnalysisFailed {
                url: task.url.clone(),
                reason: HarvestError::from(e).to_string(),
            })?;

        stats.analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;
        info!(
            format = %stats.format,
            duration_ms = stats.analysis_duration_ms,
            names = metadata.record.names.len(),
            usernames = metadata.record.usernames.len(),
            "Analysis completed"
        );

        Ok(Some(HarvestResult {
            analysis: AnalysisResult {
                url: task.url,
                extension: task.extension,
                record: metadata.record,
                software: metadata.software,
            },
            stats,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::traits::{AnalysisError, DocumentMetadata};
    use async_trait::async_trait;

    // Mock fetcher serving a fixed body, or failing for URLs containing "down"
    struct MockFetcher;

    #[async_trait]
    impl DocumentFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
            if url.contains("down") {
                return Err(HarvestError::TransportFailure {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    // Mock format echoing the body back as a name, failing on "corrupt"
    struct MockFormat;

    impl DocumentFormat for MockFormat {
        fn name(&self) -> &str {
            "mock"
        }

        fn can_handle(&self, extension: &str) -> bool {
            extension == ".docx"
        }

        fn analyze(&self, content: &[u8]) -> Result<DocumentMetadata, AnalysisError> {
            let body = String::from_utf8_lossy(content);
            if body.contains("corrupt") {
                return Err(AnalysisError::MalformedArchive("bad central directory".into()));
            }
            let mut metadata = DocumentMetadata::default();
            metadata.record.names.insert(body.into_owned());
            metadata.software.push("Mock 1.0".to_string());
            Ok(metadata)
        }
    }

    fn pipeline() -> DocumentPipeline<MockFetcher> {
        DocumentPipeline::new(MockFetcher)
            .with_formats(vec![Arc::new(MockFormat)])
            .with_notifier(Notifier::silent())
    }

    #[tokio::test]
    async fn test_pipeline_execution() {
        let task = DocumentTask::new("https://a.example/plan.docx");
        let result = pipeline().execute(task).await.unwrap().unwrap();

        assert_eq!(result.analysis.url, "https://a.example/plan.docx");
        assert_eq!(result.analysis.extension, ".docx");
        assert_eq!(
            result.analysis.record.names.to_vec(),
            vec!["https://a.example/plan.docx"]
        );
        assert_eq!(result.analysis.software, vec!["Mock 1.0"]);
        assert_eq!(result.stats.format, "mock");
        assert_eq!(result.stats.size_bytes, 27);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_dropped() {
        let task = DocumentTask::new("https://a.example/notes.txt");
        assert!(pipeline().execute(task).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_document() {
        let task = DocumentTask::new("https://down.example/plan.docx");
        let err = pipeline().execute(task).await.unwrap_err();
        assert!(matches!(err, PipelineError::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_analysis_failure_skips_document() {
        let task = DocumentTask::new("https://a.example/corrupt.docx");
        let err = pipeline().execute(task).await.unwrap_err();
        assert!(matches!(err, PipelineError::AnalysisFailed { .. }));
        assert!(err.to_string().contains("bad central directory"));
    }

    #[tokio::test]
    async fn test_silent_fetch_failure_still_skips() {
        // a silenced notifier must not change the control flow
        let pipeline = DocumentPipeline::new(MockFetcher)
            .with_formats(vec![Arc::new(MockFormat)])
            .with_notifier(Notifier::new(true));
        let task = DocumentTask::new("https://down.example/plan.docx");
        assert!(pipeline.execute(task).await.is_err());
    }
}
