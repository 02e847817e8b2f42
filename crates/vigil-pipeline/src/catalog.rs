//! Data file naming and the category registry.
//!
//! Data extracts are named `<root>_<YYYYMMDDHHMM>.<txt|zip>`. The root
//! selects the category; the timestamp dates the extract.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};

/// Timestamp layout embedded in data file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
/// Layout of the data date recorded in track documents.
pub const DATA_DATE_FORMAT: &str = "%Y-%m-%d";

static DATA_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)_(\d{12})\.(txt|zip)$").expect("data file name pattern is valid")
});

/// Parse a `YYYYMMDDHHMM` timestamp.
pub fn parse_timestamp(stamp: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
}

/// A parsed data file (or archive) name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFileName {
    /// Everything before the timestamp, e.g. `PS_LibreAcces_Personne_activite`.
    pub root: String,
    pub timestamp: NaiveDateTime,
    pub extension: String,
}

impl DataFileName {
    /// Parse a bare file name (no directories).
    pub fn parse(name: &str) -> PipelineResult<Self> {
        let invalid = || PipelineError::InvalidDataFileName(name.to_string());
        let caps = DATA_FILE_NAME.captures(name).ok_or_else(invalid)?;
        let timestamp = parse_timestamp(&caps[2]).map_err(|_| invalid())?;
        Ok(Self {
            root: caps[1].to_string(),
            timestamp,
            extension: caps[3].to_string(),
        })
    }

    /// The `YYYYMMDDHHMM` form of the timestamp.
    pub fn stamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// The `YYYY-MM-DD` data date.
    pub fn data_date(&self) -> String {
        self.timestamp.format(DATA_DATE_FORMAT).to_string()
    }

    /// Returns `true` if this name is strictly later than `last_check`.
    /// No previous check means everything is newer.
    pub fn is_newer_than(&self, last_check: Option<&NaiveDateTime>) -> bool {
        last_check.map_or(true, |last| self.timestamp > *last)
    }
}

/// The set of known extraction categories.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeSet<String>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every category named in `[tracks]` or `[local.previous]`.
    pub fn from_config(config: &Config) -> Self {
        let categories = config
            .tracks
            .keys()
            .chain(config.local.previous.keys())
            .cloned()
            .collect();
        Self { categories }
    }

    pub fn register(&mut self, category: impl Into<String>) {
        self.categories.insert(category.into());
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.iter().map(String::as_str)
    }

    /// The category of a data file.
    pub fn classify(&self, name: &DataFileName) -> PipelineResult<String> {
        if self.contains(&name.root) {
            Ok(name.root.clone())
        } else {
            Err(PipelineError::UnknownCategory(name.root.clone()))
        }
    }
}
