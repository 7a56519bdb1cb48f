//! Run reduction and presentation.
//!
//! [`reduce`] flattens per-document results into one [`FinalResult`] with a
//! row per artifact, each row tagged with the document it came from.
//! [`render_text`] lays the tables out for a terminal and [`write_json`]
//! exports them.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::model::{
    AnalysisResult, Email, EmbeddedDoc, EmbeddedMedia, ExternalLink, FilePath, FinalResult,
    Grepped, HiddenSheet, Hostname, ImageLink, LastSavedPath, Name, Printer, Software, Source,
    Username,
};

/// Characters of a document URL shown in the text report.
pub const URL_DISPLAY_WIDTH: usize = 45;

const COLUMN_PADDING: usize = 8;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("Unable to marshal results to JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Error writing JSON to file: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Reducer
// ============================================================================

/// Display name of a document: the URL's last path segment, query-unescaped.
///
/// Falls back to the raw segment when it holds a malformed `%` escape.
pub fn file_name_from_url(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or_default();
    if !has_valid_escapes(segment) {
        return segment.to_string();
    }
    let spaced = segment.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            if !matches!(hex, Some(h) if h.iter().all(u8::is_ascii_hexdigit)) {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Flattens every result into one row per artifact, in result order.
pub fn reduce(results: &[AnalysisResult]) -> FinalResult {
    let mut out = FinalResult::default();

    for result in results {
        let source = Source {
            file_name: file_name_from_url(&result.url),
            file_url: result.url.clone(),
        };
        let record = &result.record;

        macro_rules! rows {
            ($table:ident, $values:expr, $row:ident { $field:ident }) => {
                out.$table.extend($values.into_iter().map(|value| $row {
                    $field: value.to_string(),
                    source: source.clone(),
                }));
            };
        }

        rows!(external_links, &record.external_links, ExternalLink { external_link });
        rows!(image_links, &record.image_links, ImageLink { image_link });
        rows!(file_paths, &record.file_paths, FilePath { file_path });
        rows!(printers, &record.printers, Printer { printer });
        rows!(hostnames, &record.hostnames, Hostname { hostname });
        rows!(emails, &record.emails, Email { email_addr });
        rows!(names, &record.names, Name { name });
        rows!(usernames, &record.usernames, Username { username });
        rows!(grepped_values, &record.grep_keywords, Grepped { value });
        rows!(hidden_sheets, &record.hidden_sheets, HiddenSheet { sheet_name });
        rows!(last_saved_paths, &record.last_saved_paths, LastSavedPath { path });
        rows!(softwares, &result.software, Software { value });

        if record.embedded_docs {
            out.embedded_docs.push(EmbeddedDoc {
                source: source.clone(),
            });
        }
        if record.embedded_media {
            out.embedded_medias.push(EmbeddedMedia {
                source: source.clone(),
            });
        }
    }

    debug!(documents = results.len(), "Results reduced");
    out
}

// ============================================================================
// Presentation
// ============================================================================

pub fn to_json(result: &FinalResult) -> Result<String, ReportError> {
    Ok(serde_json::to_string(result)?)
}

pub fn write_json(result: &FinalResult, path: &Path) -> Result<(), ReportError> {
    fs::write(path, to_json(result)?)?;
    Ok(())
}

fn display_url(url: &str) -> String {
    let shown: String = url.chars().take(URL_DISPLAY_WIDTH).collect();
    format!("{shown}...")
}

fn quoted(s: &str) -> String {
    format!("\"{s}\"")
}

/// A titled table whose columns are padded to their widest cell.
struct Table {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(header: Vec<&'static str>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self, out: &mut String) {
        if self.rows.is_empty() {
            return;
        }
        let underline: Vec<String> = self.header.iter().map(|h| "=".repeat(h.len())).collect();
        let header: Vec<String> = self.header.iter().map(|h| h.to_string()).collect();
        let lines: Vec<&Vec<String>> = [&header, &underline]
            .into_iter()
            .chain(self.rows.iter())
            .collect();

        let columns = self.header.len();
        let mut widths = vec![0; columns];
        for line in &lines {
            for (i, cell) in line.iter().enumerate().take(columns - 1) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        for line in lines {
            for (i, cell) in line.iter().enumerate() {
                if i + 1 < columns {
                    let pad = widths[i] + COLUMN_PADDING - cell.chars().count();
                    let _ = write!(out, "{cell}{}", " ".repeat(pad));
                } else {
                    out.push_str(cell);
                }
            }
            out.push('\n');
        }
        out.push('\n');
    }
}

fn source_table<'a, T: 'a>(
    title: &'static str,
    rows: impl IntoIterator<Item = &'a T>,
    cells: impl Fn(&T) -> (String, &Source),
) -> Table {
    let mut table = Table::new(vec![title, "Dorked File Name", "Dorked URL"]);
    for row in rows {
        let (value, source) = cells(row);
        table.row(vec![
            value,
            quoted(&source.file_name),
            display_url(&source.file_url),
        ]);
    }
    table
}

/// Renders every non-empty table for terminal output.
pub fn render_text(result: &FinalResult) -> String {
    let mut grep = Table::new(vec!["Grep Result", "Dorked URL"]);
    for row in &result.grepped_values {
        grep.row(vec![row.value.clone(), display_url(&row.source.file_url)]);
    }

    let tables = [
        source_table("Containing Embedded Docs", &result.embedded_docs, |r| {
            (String::new(), &r.source)
        }),
        source_table("Containing Embedded Media", &result.embedded_medias, |r| {
            (String::new(), &r.source)
        }),
        source_table("External Link", &result.external_links, |r| {
            (r.external_link.clone(), &r.source)
        }),
        source_table("Image Link", &result.image_links, |r| {
            (r.image_link.clone(), &r.source)
        }),
        source_table("File Paths", &result.file_paths, |r| {
            (quoted(&r.file_path), &r.source)
        }),
        source_table("Last Saved Path", &result.last_saved_paths, |r| {
            (quoted(&r.path), &r.source)
        }),
        source_table("Printer", &result.printers, |r| {
            (r.printer.clone(), &r.source)
        }),
        source_table("Hidden Sheet", &result.hidden_sheets, |r| {
            (r.sheet_name.clone(), &r.source)
        }),
        source_table("Software", &result.softwares, |r| {
            (r.value.clone(), &r.source)
        }),
        source_table("Hostname", &result.hostnames, |r| {
            (r.hostname.clone(), &r.source)
        }),
        grep,
        source_table("Name", &result.names, |r| (r.name.clone(), &r.source)),
        source_table("Email Address", &result.emails, |r| {
            (r.email_addr.clone(), &r.source)
        }),
        source_table("Username", &result.usernames, |r| {
            (r.username.clone(), &r.source)
        }),
    ];

    let mut out = String::new();
    for table in &tables {
        table.render(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::traits::MetadataRecord;

    fn result(url: &str, build: impl FnOnce(&mut MetadataRecord)) -> AnalysisResult {
        let mut record = MetadataRecord::default();
        build(&mut record);
        AnalysisResult {
            url: url.to_string(),
            extension: crate::model::infer_extension(url),
            record,
            software: vec!["Office 2016".to_string()],
        }
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://a.example/docs/Q3%20Budget+Final.xlsx"),
            "Q3 Budget Final.xlsx"
        );
        assert_eq!(file_name_from_url("https://a.example/a%2Bb.pdf"), "a+b.pdf");
        assert_eq!(file_name_from_url("https://a.example/100%.docx"), "100%.docx");
        assert_eq!(file_name_from_url("https://a.example/"), "");
    }

    #[test]
    fn test_reduce_tags_rows_with_source() {
        let results = vec![
            result("https://a.example/one.docx", |r| {
                r.names.insert("Alice Smith".to_string());
                r.usernames.insert("asmith".to_string());
                r.embedded_media = true;
            }),
            result("https://b.example/two%20b.xlsx", |r| {
                r.names.insert("Bob Jones".to_string());
                r.hidden_sheets.insert("Secret - (hidden)".to_string());
            }),
        ];

        let reduced = reduce(&results);

        let names: Vec<(&str, &str)> = reduced
            .names
            .iter()
            .map(|n| (n.name.as_str(), n.source.file_name.as_str()))
            .collect();
        assert_eq!(names, vec![("Alice Smith", "one.docx"), ("Bob Jones", "two b.xlsx")]);
        assert_eq!(reduced.usernames.len(), 1);
        assert_eq!(reduced.hidden_sheets[0].source.file_url, "https://b.example/two%20b.xlsx");
        assert_eq!(reduced.softwares.len(), 2);
        assert_eq!(reduced.embedded_medias.len(), 1);
        assert!(reduced.embedded_docs.is_empty());
        assert!(reduced.printers.is_empty());
    }

    #[test]
    fn test_reduce_nothing() {
        assert!(reduce(&[]).is_empty());
    }

    #[test]
    fn test_render_text_tables() {
        let long_url = format!("https://a.example/{}/one.docx", "x".repeat(60));
        let results = vec![result(&long_url, |r| {
            r.emails.insert("ops@a.example".to_string());
            r.grep_keywords.insert("<p>password</p>".to_string());
        })];

        let text = render_text(&reduce(&results));
        let lines: Vec<&str> = text.lines().collect();

        assert!(!lines.iter().any(|l| l.starts_with("Name")));
        let software = lines.iter().position(|l| l.starts_with("Software")).unwrap();
        assert!(lines[software + 1].starts_with("========"));
        assert!(lines[software + 2].contains("\"one.docx\""));

        let truncated = format!("{}...", &long_url[..URL_DISPLAY_WIDTH]);
        assert!(lines[software + 2].ends_with(&truncated));

        let grep = lines.iter().position(|l| l.starts_with("Grep Result")).unwrap();
        assert!(lines[grep + 2].starts_with("<p>password</p>"));
        assert!(!lines[grep + 2].contains("one.docx\""));

        let email = lines.iter().position(|l| l.starts_with("Email Address")).unwrap();
        // header and row columns line up
        let col = lines[email].find("Dorked File Name").unwrap();
        assert_eq!(lines[email + 2].find("\"one.docx\""), Some(col));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loot.json");
        let reduced = reduce(&[result("https://a.example/one.pdf", |r| {
            r.names.insert("Alice".to_string());
        })]);

        write_json(&reduced, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["names"][0]["name"], "Alice");
        assert_eq!(json["names"][0]["file_name"], "one.pdf");
        assert_eq!(json["software"][0]["software"], "Office 2016");
        assert!(json.get("emails").is_none());
    }
}
