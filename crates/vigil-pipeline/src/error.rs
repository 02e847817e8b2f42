use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading, validating or saving the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file name does not follow `<root>_<YYYYMMDDHHMM>.<txt|zip>`.
    #[error("not a data file name: {0}")]
    InvalidDataFileName(String),

    /// The file name root matches no registered category.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("source provider failed: {0}")]
    Source(String),

    #[error("statistics extraction failed: {0}")]
    Extractor(String),

    #[error("digest error: {0}")]
    Digest(#[from] vigil_digest::DigestError),

    #[error("diff error: {0}")]
    Diff(#[from] vigil_diff::DiffError),

    #[error("track error: {0}")]
    Track(#[from] vigil_track::TrackError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
