//! Document format implementations.
//!
//! This module contains the format-specific implementations of the
//! [`DocumentFormat`](crate::harvest::DocumentFormat) trait:
//! - `ooxml` - Word/Excel/PowerPoint zip packages
//! - `pdf` - PDF document information

pub mod ooxml;
pub mod pdf;

use std::sync::Arc;

use crate::harvest::traits::DocumentFormat;

pub use ooxml::OoxmlFormat;
pub use pdf::PdfFormat;

/// Every format the harvester knows how to mine.
pub fn default_formats() -> Vec<Arc<dyn DocumentFormat>> {
    vec![Arc::new(OoxmlFormat), Arc::new(PdfFormat)]
}

/// First format in `formats` that handles `extension`.
pub fn format_for<'a>(
    formats: &'a [Arc<dyn DocumentFormat>],
    extension: &str,
) -> Option<&'a Arc<dyn DocumentFormat>> {
    formats.iter().find(|format| format.can_handle(extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_extension() {
        let formats = default_formats();
        for (ext, expected) in [
            (".docx", Some("ooxml")),
            (".xlsx", Some("ooxml")),
            (".pptx", Some("ooxml")),
            (".pdf", Some("pdf")),
            (".docm", None),
            ("", None),
        ] {
            assert_eq!(format_for(&formats, ext).map(|f| f.name()), expected, "{ext}");
        }
    }
}
