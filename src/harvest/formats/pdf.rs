//! PDF document-information reader.
//!
//! Only the `Info` dictionary is consulted: `Author` becomes a name,
//! `Creator` and `Producer` become software fingerprints.

use lopdf::{Dictionary, Document, Object};

use crate::harvest::traits::{AnalysisError, DocumentFormat, DocumentMetadata, MetadataRecord};

/// [`DocumentFormat`] for `.pdf` files.
#[derive(Debug, Clone, Default)]
pub struct PdfFormat;

impl DocumentFormat for PdfFormat {
    fn name(&self) -> &str {
        "pdf"
    }

    fn can_handle(&self, extension: &str) -> bool {
        extension == ".pdf"
    }

    fn analyze(&self, content: &[u8]) -> Result<DocumentMetadata, AnalysisError> {
        let (author, software) = pdf_info(content)?;
        let mut record = MetadataRecord::new();
        record.names.insert(author);
        Ok(DocumentMetadata { record, software })
    }
}

/// Reads `(author, [creator, producer])` from a PDF, omitting empty fields.
///
/// # Errors
///
/// Returns [`AnalysisError::MalformedPdf`] when the file structure cannot be
/// parsed.
pub fn pdf_info(content: &[u8]) -> Result<(String, Vec<String>), AnalysisError> {
    let doc = Document::load_mem(content).map_err(|e| AnalysisError::MalformedPdf(e.to_string()))?;

    let Some(info) = info_dictionary(&doc) else {
        return Ok((String::new(), Vec::new()));
    };

    let author = text_field(&doc, info, b"Author");
    let software = [b"Creator".as_slice(), b"Producer".as_slice()]
        .into_iter()
        .map(|key| text_field(&doc, info, key))
        .filter(|value| !value.is_empty())
        .collect();

    Ok((author, software))
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve(doc, info).as_dict().ok()
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn text_field(doc: &Document, dict: &Dictionary, key: &[u8]) -> String {
    match dict.get(key).map(|value| resolve(doc, value)) {
        Ok(Object::String(bytes, _)) => decode_text_string(bytes).trim().to_string(),
        _ => String::new(),
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a byte-order mark,
/// otherwise one character per byte.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ============================================================================
// Tests
// ============================================================================
