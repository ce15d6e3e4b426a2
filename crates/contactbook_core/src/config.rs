//! File locations and tunables for one contact book.
//!
//! # Invariants
//! - Relative paths resolve against `data_dir`.
//! - `duplicate_threshold` is within `[0, 1]` after loading.

use crate::dedupe::matcher::{MatchOptions, DEFAULT_DUPLICATE_THRESHOLD};
use crate::dedupe::similarity::SimilarityKind;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    InvalidThreshold(f64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::InvalidThreshold(value) => {
                write!(f, "duplicate_threshold {value} must be within [0, 1]")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidThreshold(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Contact book configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub data_dir: PathBuf,
    pub store_file: PathBuf,
    pub backup_dir: PathBuf,
    /// Hidden undo side file.
    pub snapshot_file: PathBuf,
    pub error_log: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub duplicate_threshold: f64,
    pub include_contact_info_in_score: bool,
    pub similarity: SimilarityKind,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            store_file: PathBuf::from("contacts.csv"),
            backup_dir: PathBuf::from("backups"),
            snapshot_file: PathBuf::from(".contacts.snapshot.json"),
            error_log: PathBuf::from("error_log.txt"),
            log_dir: PathBuf::from("logs"),
            log_level: default_log_level().to_string(),
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            include_contact_info_in_score: false,
            similarity: SimilarityKind::default(),
        }
    }
}

impl BookConfig {
    /// Default layout rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(ConfigError::InvalidThreshold(self.duplicate_threshold));
        }
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_dir)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.snapshot_file)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.resolve(&self.error_log)
    }

    pub fn log_path(&self) -> PathBuf {
        self.resolve(&self.log_dir)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.duplicate_threshold,
            include_contact_info_in_score: self.include_contact_info_in_score,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BookConfig, ConfigError};
    use crate::dedupe::similarity::SimilarityKind;
    use std::path::PathBuf;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BookConfig::from_toml_str(
            r#"
data_dir = "/tmp/book"
duplicate_threshold = 0.9
similarity = "normalized_levenshtein"
"#,
        )
        .unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/book/contacts.csv"));
        assert_eq!(config.backup_path(), PathBuf::from("/tmp/book/backups"));
        assert_eq!(config.match_options().threshold, 0.9);
        assert_eq!(config.similarity, SimilarityKind::NormalizedLevenshtein);
        assert!(!config.include_contact_info_in_score);
    }

    #[test]
    fn absolute_paths_are_kept() {
        let config = BookConfig {
            error_log: PathBuf::from("/var/log/contacts.txt"),
            ..BookConfig::in_dir("/tmp/book")
        };
        assert_eq!(config.error_log_path(), PathBuf::from("/var/log/contacts.txt"));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = BookConfig::from_toml_str("duplicate_threshold = 1.2").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold(_)));
    }
}
