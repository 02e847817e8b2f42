//! Error types for the diff crate.

use std::io;
use std::path::PathBuf;

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// The new index points at a line the source lines do not have.
    #[error("line index {index} out of range for {len} source lines")]
    IndexOutOfRange { index: usize, len: usize },

    /// A diff artifact could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
