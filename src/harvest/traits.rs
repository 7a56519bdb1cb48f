//! Core traits and types for the document forensic engine.
//!
//! This module defines the foundational pieces every extractor shares:
//! - Format dispatch via [`DocumentFormat`]
//! - The per-document accumulator [`MetadataRecord`] and its
//!   order-preserving, deduplicating [`ArtifactSet`]
//! - Standardized error handling via [`AnalysisError`]

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Document Format Trait
// ============================================================================

/// Abstraction over the document formats the harvester can mine (OOXML
/// packages, PDF files).
///
/// Each supported format provides:
/// - Dispatch by inferred extension via [`DocumentFormat::can_handle`]
/// - In-memory analysis of the fetched bytes
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// worker in the pool and analysis runs on the blocking thread pool.
pub trait DocumentFormat: Send + Sync {
    /// Returns the unique identifier for this format.
    ///
    /// Examples: `"ooxml"`, `"pdf"`
    fn name(&self) -> &str;

    /// Returns `true` if this format handles documents with `extension`.
    ///
    /// `extension` is lower-cased and includes the leading dot (`".docx"`).
    fn can_handle(&self, extension: &str) -> bool;

    /// Mines `content` for artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] only when the document as a whole cannot be
    /// opened. Damage confined to one part is skipped by the implementation.
    fn analyze(&self, content: &[u8]) -> Result<DocumentMetadata, AnalysisError>;
}

/// Output of a [`DocumentFormat`]: the artifact record plus the software
/// fingerprint(s) the format could derive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub record: MetadataRecord,
    pub software: Vec<String>,
}

// ============================================================================
// Artifact Collections
// ============================================================================

/// Insertion-ordered set of artifact values for one document.
///
/// Empty strings are never stored and a value already present is not
/// appended a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet(IndexSet<String>);

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` unless it is empty or already present.
    ///
    /// Returns `true` if the set grew.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        self.0.insert(value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Returns the first value inserted, if any.
    pub fn first(&self) -> Option<&String> {
        self.0.first()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> Extend<S> for ArtifactSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ArtifactSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ArtifactSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Metadata Structures
// ============================================================================

/// Everything mined from a single document.
///
/// Created when a package begins processing, filled part by part, and handed
/// off once the whole package has been walked. Every collection is an
/// [`ArtifactSet`]; the two embedded-content flags only ever go from `false`
/// to `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// `docProps/core.xml` fields
    pub core: CoreProperties,

    /// `docProps/app.xml` fields
    pub app: AppProperties,

    /// Relationship targets marked `TargetMode="External"`
    pub external_links: ArtifactSet,

    /// `descr` attributes of drawing objects, often the original image path
    pub image_links: ArtifactSet,

    /// Local and UNC paths recovered from OLE parts and `absPath` elements
    pub file_paths: ArtifactSet,

    /// Printer names. No extractor populates this yet; kept so the export
    /// shape is stable.
    pub printers: ArtifactSet,

    /// Hosts taken from UNC paths
    pub hostnames: ArtifactSet,

    pub emails: ArtifactSet,

    /// Display names (authors, editors, commenters, path segments with spaces)
    pub names: ArtifactSet,

    /// Operating-system account names
    pub usernames: ArtifactSet,

    /// `<tag>content</tag>` snippets around grep keyword hits
    pub grep_keywords: ArtifactSet,

    /// `"<sheet> - (<state>)"` descriptors for hidden worksheets
    pub hidden_sheets: ArtifactSet,

    /// Workbook `absPath` urls
    pub last_saved_paths: ArtifactSet,

    pub embedded_docs: bool,
    pub embedded_media: bool,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag_embedded_docs(&mut self) {
        self.embedded_docs = true;
    }

    pub fn flag_embedded_media(&mut self) {
        self.embedded_media = true;
    }
}

/// Author fields from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreProperties {
    pub creator: String,
    pub last_modified_by: String,
}

/// Application fields from `docProps/app.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProperties {
    pub application: String,
    pub company: String,

    /// Raw `AppVersion`, e.g. `"16.0300"`
    pub version: String,
}

/// Marker returned when the Office release cannot be determined.
pub const UNKNOWN_VERSION: &str = "(Version unknown)";

impl AppProperties {
    /// Maps the major component of [`AppProperties::version`] to the Office
    /// release year.
    ///
    /// A version with no `.` or an unlisted major number yields
    /// [`UNKNOWN_VERSION`].
    pub fn major_version(&self) -> &'static str {
        let mut tokens = self.version.split('.');
        let major = tokens.next().unwrap_or_default();
        if tokens.next().is_none() {
            return UNKNOWN_VERSION;
        }
        match major {
            "16" => "2016",
            "15" => "2013",
            "14" => "2010",
            "12" => "2007",
            "11" => "2003",
            _ => UNKNOWN_VERSION,
        }
    }

    /// Software fingerprint reported for the document, e.g. `"Office 2016"`.
    pub fn software_fingerprint(&self) -> String {
        format!("Office {}", self.major_version())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that stop a whole document from being analysed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The zip container could not be opened
    #[error("Malformed package archive: {0}")]
    MalformedArchive(String),

    /// A part was not well-formed XML
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// The PDF structure could not be parsed
    #[error("Malformed PDF: {0}")]
    MalformedPdf(String),

    /// Generic I/O error while reading a part
    #[error("I/O error during analysis: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn app(version: &str) -> AppProperties {
        AppProperties {
            version: version.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_major_version_mapping() {
        assert_eq!(app("16.0.1").major_version(), "2016");
        assert_eq!(app("16.0.1").software_fingerprint(), "Office 2016");
        assert_eq!(app("14.0000").major_version(), "2010");
        assert_eq!(app("11.5").major_version(), "2003");
    }

    #[test]
    fn test_major_version_unknown() {
        assert_eq!(app("99.0").major_version(), UNKNOWN_VERSION);
        assert_eq!(app("16").major_version(), UNKNOWN_VERSION);
        assert_eq!(app("").major_version(), UNKNOWN_VERSION);
        assert_eq!(
            app("").software_fingerprint(),
            "Office (Version unknown)"
        );
    }

    #[test]
    fn test_artifact_set_dedup_and_order() {
        let mut set = ArtifactSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert!(!set.insert(""));
        assert_eq!(set.to_vec(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_record_serialization() {
        let mut record = MetadataRecord::new();
        record.names.insert("J. Smith");
        record.flag_embedded_media();

        let json = serde_json::to_string(&record).unwrap();
        let back: MetadataRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back, record);
        assert!(json.contains("\"names\":[\"J. Smith\"]"));
    }
}
