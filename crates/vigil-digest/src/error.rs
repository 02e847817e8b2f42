//! Error types for the digest crate.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while digesting a file or loading its sidecar.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// The original data file could not be opened or read.
    #[error("source unavailable: {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The sidecar cache exists but could not be read.
    #[error("digest cache unavailable: {}: {source}", path.display())]
    CacheUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A sidecar record is not a valid `<index>:<hex>` pair.
    #[error("malformed digest record at {}:{line}: {reason}", path.display())]
    CacheParse {
        path: PathBuf,
        /// 1-based line number of the offending record.
        line: usize,
        reason: String,
    },

    /// The sidecar cache could not be written.
    #[error("cannot write digest cache {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for digest results.
pub type DigestResult<T> = Result<T, DigestError>;
