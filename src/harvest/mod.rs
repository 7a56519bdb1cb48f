//! Forensic extraction engine.
//!
//! Turns the raw bytes of a fetched document into a [`MetadataRecord`]:
//! - **Formats**: [`DocumentFormat`] implementations for OOXML packages and PDFs
//! - **XML**: a generic element tree and the searches run over it
//! - **Identity**: hostname, username, name, email and path extractors
//! - **OLE**: printable-string carving for embedded binary parts
//! - **Pipeline**: async fetch → dispatch → analysis via [`DocumentPipeline`]

pub mod formats;
pub mod identity;
pub mod ole;
pub mod pipeline;
pub mod search;
pub mod traits;
pub mod xml;

// Re-export commonly used types
pub use traits::{
    AnalysisError, AppProperties, ArtifactSet, CoreProperties, DocumentFormat, DocumentMetadata,
    MetadataRecord,
};

pub use formats::{default_formats, format_for, OoxmlFormat, PdfFormat};
pub use pipeline::{DocumentPipeline, HarvestResult, HarvestStats, PipelineError};
