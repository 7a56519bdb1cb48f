use crate::harvest::traits::MetadataRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub provider: String, // e.g., "google", "bing"
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTask {
    pub url: String,
    pub extension: String, // lower-cased, leading dot, "" when none
}

impl DocumentTask {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let extension = infer_extension(&url);
        Self { url, extension }
    }
}

/// Extension of the URL's final path segment: `".../Report.DOCX"` → `".docx"`.
///
/// Only a trailing run of ASCII letters after the last dot counts, so a
/// query string or fragment leaves the extension empty.
pub fn infer_extension(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or_default();
    match segment.rfind('.') {
        Some(dot) if segment[dot + 1..].chars().all(|c| c.is_ascii_alphabetic()) => {
            segment[dot..].to_ascii_lowercase()
        }
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub url: String,
    pub extension: String,
    pub record: MetadataRecord,
    pub software: Vec<String>, // e.g., "Office 2016", PDF Creator/Producer
}

/// Every artifact from a run, one table per kind.
///
/// Rows keep the order in which worker results arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_links: Vec<ExternalLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_links: Vec<ImageLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<FilePath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub printers: Vec<Printer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<Hostname>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<Email>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<Name>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usernames: Vec<Username>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grepped_values: Vec<Grepped>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_sheets: Vec<HiddenSheet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_saved_paths: Vec<LastSavedPath>,
    #[serde(default, rename = "software", skip_serializing_if = "Vec::is_empty")]
    pub softwares: Vec<Software>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded_docs: Vec<EmbeddedDoc>,
    #[serde(default, rename = "embedded_media", skip_serializing_if = "Vec::is_empty")]
    pub embedded_medias: Vec<EmbeddedMedia>,
}

impl FinalResult {
    pub fn is_empty(&self) -> bool {
        self.external_links.is_empty()
            && self.image_links.is_empty()
            && self.file_paths.is_empty()
            && self.printers.is_empty()
            && self.hostnames.is_empty()
            && self.emails.is_empty()
            && self.names.is_empty()
            && self.usernames.is_empty()
            && self.grepped_values.is_empty()
            && self.hidden_sheets.is_empty()
            && self.last_saved_paths.is_empty()
            && self.softwares.is_empty()
            && self.embedded_docs.is_empty()
            && self.embedded_medias.is_empty()
    }
}

/// Where a row came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_url: String,
}

macro_rules! finding {
    ($(#[$doc:meta])* $name:ident, $field:ident, $json:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(rename = $json, default, skip_serializing_if = "String::is_empty")]
            pub $field: String,
            #[serde(flatten)]
            pub source: Source,
        }
    };
}

finding!(ExternalLink, external_link, "external_link");
finding!(ImageLink, image_link, "image_link");
finding!(FilePath, file_path, "file_path");
finding!(Printer, printer, "printer");
finding!(Hostname, hostname, "hostname");
finding!(Email, email_addr, "email_address");
finding!(Name, name, "name");
finding!(Username, username, "username");
finding!(Grepped, value, "value");
finding!(HiddenSheet, sheet_name, "sheet_name");
finding!(LastSavedPath, path, "path");
finding!(Software, value, "software");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedDoc {
    #[serde(flatten)]
    pub source: Source,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedMedia {
    #[serde(flatten)]
    pub source: Source,
}
