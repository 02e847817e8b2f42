//! Pipeline configuration, loaded from TOML.
//!
//! ```toml
//! [local]
//! storage = "/var/lib/vigil"
//! last_check = "201808011050"
//! save_diff_index = true
//!
//! [local.previous]
//! PS_LibreAcces_Personne_activite = "/var/lib/vigil/PS_LibreAcces_Personne_activite_201807300827.txt"
//!
//! [tracks.PS_LibreAcces_Personne_activite]
//! filename = "stats-personne.json"
//! save_history = true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::catalog::parse_timestamp;
use crate::error::{ConfigError, ConfigResult};

/// Directory searched when the named config file does not exist.
pub const DEFAULT_CONFIG_DIR: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub local: LocalConfig,
    /// Per-category track output settings.
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory holding data files, diff artifacts and track documents.
    pub storage: PathBuf,
    /// Timestamp (`YYYYMMDDHHMM`) of the last processed batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
    /// Write `new_<file>.diff` / `index_<file>.csv` next to the data.
    #[serde(default)]
    pub save_diff_index: bool,
    #[serde(default = "default_sha_suffix")]
    pub sha_suffix: String,
    /// Last processed data file per category.
    #[serde(default)]
    pub previous: BTreeMap<String, PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Track document, relative to `local.storage`. No file, no persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,
    #[serde(default)]
    pub save_history: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_sha_suffix() -> String {
    vigil_digest::DEFAULT_SUFFIX.to_string()
}

impl Config {
    /// A minimal configuration rooted at `storage`.
    pub fn new(storage: impl Into<PathBuf>) -> Self {
        Self {
            local: LocalConfig {
                storage: storage.into(),
                last_check: None,
                save_diff_index: false,
                sha_suffix: default_sha_suffix(),
                previous: BTreeMap::new(),
            },
            tracks: BTreeMap::new(),
        }
    }

    /// The file actually used for `path`: `path` itself when it exists,
    /// otherwise the same file name under [`DEFAULT_CONFIG_DIR`].
    pub fn locate(path: &Path) -> PathBuf {
        if path.exists() {
            return path.to_path_buf();
        }
        let fallback = match path.file_name() {
            Some(name) => Path::new(DEFAULT_CONFIG_DIR).join(name),
            None => return path.to_path_buf(),
        };
        info!(
            requested = %path.display(),
            fallback = %fallback.display(),
            "config file not found; using default"
        );
        fallback
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.local.storage.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("local.storage is empty".into()));
        }
        if self.local.sha_suffix.is_empty() {
            return Err(ConfigError::Invalid("local.sha_suffix is empty".into()));
        }
        if let Some(stamp) = &self.local.last_check {
            parse_timestamp(stamp).map_err(|e| {
                ConfigError::Invalid(format!("local.last_check {stamp:?}: {e}"))
            })?;
        }
        for (category, track) in &self.tracks {
            if track.filename.as_ref().is_some_and(|f| f.as_os_str().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "tracks.{category}.filename is empty"
                )));
            }
        }
        Ok(())
    }

    /// Write the config back, replacing the file atomically.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let body =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        let err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
        tmp.write_all(body.as_bytes()).map_err(err)?;
        tmp.persist(path).map_err(|e| err(e.error))?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Track settings of a category, if configured.
    pub fn track(&self, category: &str) -> Option<&TrackConfig> {
        self.tracks.get(category)
    }
}
