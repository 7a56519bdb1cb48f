//! Identity and location extractors.
//!
//! Regex-driven helpers that turn raw strings (XML text, carved OLE strings,
//! recovered paths) into hostnames, usernames, display names, e-mail
//! addresses and file paths. A pattern that matches nothing is the common
//! case and simply yields nothing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::harvest::traits::{ArtifactSet, MetadataRecord};

/// Host segment of UNC paths: `\\host\share` → `host`
static UNC_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\\\([a-zA-Z0-9.-]+)\\").expect("UNC host regex is hardcoded and valid")
});

/// Profile-directory path shapes; capture group 1 is the account segment.
static PROFILE_PATHS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        r"documents%20and%20settings\\(.*?)\\",
        r"DOCUME~1/(.*?)/",
        r"Users\\(.*?)\\",
        r"Users/(.*?)/",
    ]
    .map(|pattern| Regex::new(pattern).expect("profile path regex is hardcoded and valid"))
});

/// Captures that look like accounts but are parser noise.
const FALSE_POSITIVES: &[&str] = &["", ".", "<cp:keywords></cp:keywords><dc:description>"];

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9+._-]+@[a-zA-Z0-9._-]+\.[a-zA-Z0-9_-]+")
        .expect("Email regex is hardcoded and valid")
});

/// Drive-letter paths ending in a file name: `C:\dir\file.ext`
static LOCAL_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z]:[\\/](?:[a-zA-Z0-9]+[\\/])*[a-zA-Z0-9-]+\.[a-zA-Z0-9]+")
        .expect("local path regex is hardcoded and valid")
});

/// UNC paths ending in a file name: `\\host\share$\dir\file.ext`
static UNC_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\\\\)+(?:[a-zA-Z0-9.-]+\\)*(?:[a-zA-Z0-9.$-]+\\)*[a-zA-Z0-9-]+\.[a-zA-Z0-9]+")
        .expect("UNC path regex is hardcoded and valid")
});

/// Hostnames named in UNC paths inside `s`.
pub fn extract_hostnames(s: &str) -> Vec<String> {
    UNC_HOST
        .captures_iter(s)
        .filter_map(|caps| caps.get(1))
        .map(|host| host.as_str().to_string())
        .collect()
}

/// Account segments of profile-directory paths inside `s`, split into
/// `(display names, usernames)`.
///
/// A segment without a space is a username. One with a space is a display
/// name, unless it starts with the space, in which case it is still treated
/// as a username.
pub fn extract_usernames_and_names(s: &str) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut usernames = Vec::new();

    for pattern in PROFILE_PATHS.iter() {
        for caps in pattern.captures_iter(s) {
            let Some(segment) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if FALSE_POSITIVES.contains(&segment) {
                continue;
            }
            if segment.contains(' ') && !segment.starts_with(' ') {
                names.push(segment.to_string());
            } else {
                usernames.push(segment.to_string());
            }
        }
    }

    (names, usernames)
}

/// E-mail shaped substrings of `s`, first occurrence order, no duplicates.
pub fn extract_emails(s: &str) -> ArtifactSet {
    EMAIL.find_iter(s).map(|m| m.as_str()).collect()
}

/// First local path and first UNC path found in `s`.
pub fn extract_file_paths(s: &str) -> Vec<String> {
    [&*LOCAL_PATH, &*UNC_PATH]
        .into_iter()
        .filter_map(|pattern| pattern.find(s))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Greps raw text for hostnames, names and usernames and merges them into
/// `record`.
pub fn absorb_identities(record: &mut MetadataRecord, s: &str) {
    record.hostnames.extend(extract_hostnames(s));
    let (names, usernames) = extract_usernames_and_names(s);
    record.names.extend(names);
    record.usernames.extend(usernames);
}

/// Re-scans the record's names and file paths for usernames and hostnames
/// that only surface once the surrounding context is stripped away.
pub fn rederive_identities(record: &mut MetadataRecord) {
    let mut usernames = Vec::new();
    let mut hostnames = Vec::new();

    for name in &record.names {
        usernames.extend(extract_usernames_and_names(name).1);
    }
    for path in &record.file_paths {
        usernames.extend(extract_usernames_and_names(path).1);
        hostnames.extend(extract_hostnames(path));
    }

    record.usernames.extend(usernames);
    record.hostnames.extend(hostnames);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostnames_from_unc() {
        let hosts = extract_hostnames(r"see \\fileserver01\share\a.docx and \\10.0.0.5\c$\x");
        assert_eq!(hosts, vec!["fileserver01", "10.0.0.5"]);
        assert!(extract_hostnames(r"C:\Users\x").is_empty());
    }

    #[test]
    fn test_username_vs_display_name() {
        let (names, users) = extract_usernames_and_names("file:///C:/Users/jdoe/Desktop/a.docx");
        assert!(names.is_empty());
        assert_eq!(users, vec!["jdoe"]);

        let (names, users) = extract_usernames_and_names("C:/Users/John Doe/Desktop");
        assert_eq!(names, vec!["John Doe"]);
        assert!(users.is_empty());
    }

    #[test]
    fn test_leading_space_is_username() {
        let (names, users) = extract_usernames_and_names("Users/ jdoe x/");
        assert!(names.is_empty());
        assert_eq!(users, vec![" jdoe x"]);
    }

    #[test]
    fn test_all_path_shapes() {
        let s = r"documents%20and%20settings\alice\ DOCUME~1/bob/ Users\carol\ Users/dave/";
        let (_, users) = extract_usernames_and_names(s);
        assert_eq!(users, vec!["alice", "bob", "carol", "dave"]);
    }

    #[test]
    fn test_false_positives_rejected() {
        let (names, users) = extract_usernames_and_names("Users//x Users/./");
        assert!(names.is_empty());
        assert!(users.is_empty());
    }

    #[test]
    fn test_emails_deduplicated() {
        let emails = extract_emails(
            "mailto:info@example.com?subject=hi&amp;cc=another@example.com info@example.com",
        );
        assert_eq!(emails.to_vec(), vec!["info@example.com", "another@example.com"]);
    }

    #[test]
    fn test_file_paths() {
        assert_eq!(
            extract_file_paths(r"xxC:\Users\jdoe\report.xlsx!"),
            vec![r"C:\Users\jdoe\report.xlsx"]
        );
        assert_eq!(
            extract_file_paths(r"\\srv-01\share$\q3\budget.xlsx"),
            vec![r"\\srv-01\share$\q3\budget.xlsx"]
        );
        assert!(extract_file_paths("no paths here").is_empty());
    }

    #[test]
    fn test_rederive_identities() {
        let mut record = MetadataRecord::new();
        record.file_paths.insert(r"\\fs1\home\Users\mallory\x.doc");
        record.names.insert("Users/eve/");

        rederive_identities(&mut record);

        assert_eq!(record.usernames.to_vec(), vec!["eve", "mallory"]);
        assert_eq!(record.hostnames.to_vec(), vec!["fs1"]);
    }
}
