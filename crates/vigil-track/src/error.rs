//! Error types for track persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing a track document.
///
/// All of them are fatal for the upsert that raised them; the target file
/// is left as it was.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The track document exists but could not be read.
    #[error("cannot read track document {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The track document could not be written.
    #[error("cannot write track document {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not a valid track document.
    #[error("malformed track document {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for track operations.
pub type TrackResult<T> = std::result::Result<T, TrackError>;
