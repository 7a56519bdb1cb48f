//! Office Open XML (`.docx`, `.xlsx`, `.pptx`) package aggregator.
//!
//! Every part of the zip package is dispatched by its path: OLE blobs go to
//! the string carver, XML and relationship parts get the full grep pass plus
//! any targeted search their path calls for. Results accumulate into one
//! [`MetadataRecord`] per package.

use std::io::{Cursor, Read, Seek};

use tracing::debug;
use zip::ZipArchive;

use crate::harvest::identity::{absorb_identities, extract_emails, rederive_identities};
use crate::harvest::ole::ole_file_paths;
use crate::harvest::search::{
    external_links, find_attr_anywhere, find_attr_on_tag, find_tag_content, hidden_sheets,
    keyword_grep,
};
use crate::harvest::traits::{AnalysisError, DocumentFormat, DocumentMetadata, MetadataRecord};
use crate::harvest::xml::{self, XmlNode};

/// Keywords grepped for in every XML or relationships part.
pub const GREP_KEYWORDS: &[&str] = &["password"];

/// Largest decompressed part read into memory; bigger parts are skipped.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// [`DocumentFormat`] for Word, Excel and PowerPoint packages.
#[derive(Debug, Clone, Default)]
pub struct OoxmlFormat;

impl DocumentFormat for OoxmlFormat {
    fn name(&self) -> &str {
        "ooxml"
    }

    fn can_handle(&self, extension: &str) -> bool {
        matches!(extension, ".docx" | ".xlsx" | ".pptx")
    }

    fn analyze(&self, content: &[u8]) -> Result<DocumentMetadata, AnalysisError> {
        let record = extract_package(Cursor::new(content))?;
        let software = vec![record.app.software_fingerprint()];
        Ok(DocumentMetadata { record, software })
    }
}

/// Walks every part of the package behind `reader`.
///
/// # Errors
///
/// Returns [`AnalysisError::MalformedArchive`] only if the zip directory
/// cannot be read. Unreadable, oversized or malformed parts are skipped.
pub fn extract_package<R: Read + Seek>(reader: R) -> Result<MetadataRecord, AnalysisError> {
    extract_package_with_limit(reader, MAX_PART_BYTES)
}

/// [`extract_package`] with a custom cap on decompressed part size.
pub fn extract_package_with_limit<R: Read + Seek>(
    reader: R,
    max_part_bytes: u64,
) -> Result<MetadataRecord, AnalysisError> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| AnalysisError::MalformedArchive(e.to_string()))?;
    let mut record = MetadataRecord::new();

    for index in 0..archive.len() {
        let (name, bytes) = match read_part(&mut archive, index, max_part_bytes) {
            Ok(part) => part,
            Err(e) => {
                debug!(index, error = %e, "Skipping unreadable part");
                continue;
            }
        };
        process_part(&mut record, &name, &bytes);
    }

    finalize(&mut record);
    Ok(record)
}

/// Reads one part, never trusting the size declared in the zip headers.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    max_bytes: u64,
) -> Result<(String, Vec<u8>), AnalysisError> {
    let mut file = archive
        .by_index(index)
        .map_err(|e| AnalysisError::MalformedArchive(e.to_string()))?;
    let name = file.name().to_string();
    let mut bytes = Vec::new();
    (&mut file).take(max_bytes + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > max_bytes {
        return Err(AnalysisError::MalformedArchive(format!(
            "part {name} decompresses past {max_bytes} bytes"
        )));
    }
    Ok((name, bytes))
}

/// Dispatches one part by path. The checks are independent; a single part
/// can trip several of them.
fn process_part(record: &mut MetadataRecord, name: &str, bytes: &[u8]) {
    if name.contains("embed") {
        record.flag_embedded_docs();
    }
    if name.contains("media") {
        record.flag_embedded_media();
    }

    if name.ends_with(".bin") {
        let paths = ole_file_paths(bytes);
        for path in &paths {
            absorb_identities(record, path);
        }
        record.file_paths.extend(paths);
    }

    if name.contains("xml") || name.contains(".rels") {
        if let Err(e) = process_xml_part(record, name, bytes) {
            debug!(part = name, error = %e, "Skipping malformed XML part");
        }
    }
}

fn process_xml_part(
    record: &mut MetadataRecord,
    name: &str,
    bytes: &[u8],
) -> Result<(), AnalysisError> {
    let text = String::from_utf8_lossy(bytes);

    absorb_identities(record, &text);
    record.emails.extend(extract_emails(&text));

    let root = xml::parse(bytes)?;

    if name.contains("docProps/core.xml") {
        record.core.creator = root.child_text("creator");
        record.core.last_modified_by = root.child_text("lastModifiedBy");
    }

    if name.contains("docProps/app.xml") {
        record.app.application = root.child_text("Application");
        record.app.company = root.child_text("Company");
        record.app.version = root.child_text("AppVersion");
    }

    if name.contains("xl/workbook.xml") {
        record.hidden_sheets.extend(hidden_sheets(&root));
        record
            .last_saved_paths
            .extend(find_attr_on_tag(&root, "absPath", "url"));
    }

    if name.contains("people") {
        record.names.extend(find_attr_on_tag(&root, "person", "author"));
        // userId often looks like "S::someone@example.com"
        record
            .emails
            .extend(find_attr_on_tag(&root, "presenceInfo", "userId"));
    }

    if name.contains("changes") {
        record.names.extend(find_attr_on_tag(&root, "chgData", "name"));
    }

    if name.contains("document") {
        record.image_links.extend(find_attr_anywhere(&root, "descr"));
    }

    if name.contains("comments") {
        record.names.extend(find_tag_content(&root, "author"));
    }

    grep_common(record, &text, &root);
    Ok(())
}

/// Checks run on every XML or relationships part regardless of its path.
fn grep_common(record: &mut MetadataRecord, text: &str, root: &XmlNode<'_>) {
    for keyword in GREP_KEYWORDS {
        if !text.contains(keyword) {
            continue;
        }
        if let Some(hit) = keyword_grep(root, keyword) {
            record.grep_keywords.insert(hit);
        }
    }

    record
        .file_paths
        .extend(find_attr_on_tag(root, "absPath", "url"));
    record.external_links.extend(external_links(root));
}

fn finalize(record: &mut MetadataRecord) {
    let creator = record.core.creator.clone();
    let last_modified_by = record.core.last_modified_by.clone();
    record.names.insert(creator);
    record.names.insert(last_modified_by);

    rederive_identities(record);
}

// ============================================================================
// Tests
// ============================================================================
