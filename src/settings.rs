//! Search-engine credentials kept between runs.
//!
//! Stored as `settings.json` in `~/.doc-harvester/` (`~/DocHarvester` on
//! Windows).

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("Unable to determine user home directory")]
    NoHomeDir,

    #[error("Invalid setting '{0}', expected key=value")]
    InvalidPair(String),

    #[error("Settings serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    #[serde(rename = "bing")]
    pub bing_key: String,
    /// Google API key
    #[serde(rename = "googleKey")]
    pub google_key: String,
    /// Custom Search Engine ID
    #[serde(rename = "googleId")]
    pub google_id: String,
}

impl UserSettings {
    /// Reads the settings file.
    ///
    /// A missing file, or one that does not hold valid JSON, yields empty
    /// settings: every provider is then reported as unconfigured and the run
    /// finds nothing. `--config` creates or repairs the file.
    pub fn read(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "No settings file, run with --config to create one");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        match serde_json::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable settings file, ignoring");
                Ok(Self::default())
            }
        }
    }

    pub fn write(&self, path: &Path) -> SettingsResult<()> {
        debug!(path = %path.display(), "Saving settings");
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Applies `"bing=...,googleKey=...,googleId=..."` on top of the file at
    /// `path` (if any) and writes the result back.
    pub fn update(path: &Path, pairs: &str) -> SettingsResult<Self> {
        let mut settings = if path.exists() {
            Self::read(path)?
        } else {
            Self::default()
        };
        settings.apply(pairs)?;
        settings.write(path)?;
        Ok(settings)
    }

    /// Merges key/value pairs into `self`. Unknown keys are ignored.
    pub fn apply(&mut self, pairs: &str) -> SettingsResult<()> {
        for (key, value) in parse_settings_string(pairs)? {
            match key.as_str() {
                "bing" => self.bing_key = value,
                "googleKey" => self.google_key = value,
                "googleId" => self.google_id = value,
                other => debug!(key = other, "Ignoring unknown setting"),
            }
        }
        Ok(())
    }
}

/// Splits `"a=1,b=2"` into pairs. The value is everything after the first `=`.
pub fn parse_settings_string(pairs: &str) -> SettingsResult<Vec<(String, String)>> {
    pairs
        .split(',')
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| SettingsError::InvalidPair(pair.to_string()))
        })
        .collect()
}

/// `~/.doc-harvester`, or `~/DocHarvester` on Windows.
pub fn settings_dir() -> SettingsResult<PathBuf> {
    let dirs = BaseDirs::new().ok_or(SettingsError::NoHomeDir)?;
    let name = if cfg!(windows) {
        "DocHarvester"
    } else {
        ".doc-harvester"
    };
    Ok(dirs.home_dir().join(name))
}

/// Creates the settings directory if needed and returns the settings file path.
pub fn ensure_settings_file_path() -> SettingsResult<PathBuf> {
    let dir = settings_dir()?;
    fs::create_dir_all(&dir)?;
    Ok(dir.join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_settings_string() {
        let pairs = parse_settings_string("bing=111,googleKey=222,googleId=a=b").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("bing".to_string(), "111".to_string()),
                ("googleKey".to_string(), "222".to_string()),
                ("googleId".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn test_pair_without_equals_is_rejected() {
        let err = parse_settings_string("bing=1,googleKey").unwrap_err();
        assert!(matches!(err, SettingsError::InvalidPair(ref p) if p == "googleKey"));
    }

    #[test]
    fn test_update_merges_into_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        UserSettings::update(&path, "bing=111,googleKey=222").unwrap();
        let merged = UserSettings::update(&path, "googleId=333,colour=blue").unwrap();

        assert_eq!(
            merged,
            UserSettings {
                bing_key: "111".to_string(),
                google_key: "222".to_string(),
                google_id: "333".to_string(),
            }
        );
        assert_eq!(UserSettings::read(&path).unwrap(), merged);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["googleKey"], "222");
        assert_eq!(raw["bing"], "111");
    }

    #[test]
    fn test_failed_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        UserSettings::update(&path, "bing=111").unwrap();

        assert!(UserSettings::update(&path, "bing=999,oops").is_err());
        assert_eq!(UserSettings::read(&path).unwrap().bing_key, "111");
    }

    #[test]
    fn test_read_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(UserSettings::read(&path).unwrap(), UserSettings::default());
        assert!(!path.exists());

        fs::write(&path, "not json").unwrap();
        assert_eq!(UserSettings::read(&path).unwrap(), UserSettings::default());
    }
}
