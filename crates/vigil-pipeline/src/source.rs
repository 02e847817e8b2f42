//! Where data files come from.
//!
//! Downloading and unpacking extracts is not this crate's business; a
//! [`SourceProvider`] hands the pipeline a named batch of readable flat
//! text files.

use std::path::PathBuf;

use crate::error::PipelineResult;

/// A set of data files published together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceBatch {
    /// Batch (archive) file name; carries the batch timestamp.
    pub name: String,
    pub files: Vec<PathBuf>,
}

/// Supplies the next batch to process.
pub trait SourceProvider {
    /// Returns `Ok(None)` when nothing is available.
    fn fetch(&self) -> PipelineResult<Option<SourceBatch>>;
}

/// Files that are already on local disk.
#[derive(Clone, Debug)]
pub struct LocalFiles {
    batch: SourceBatch,
}

impl LocalFiles {
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            batch: SourceBatch {
                name: name.into(),
                files,
            },
        }
    }
}

impl SourceProvider for LocalFiles {
    fn fetch(&self) -> PipelineResult<Option<SourceBatch>> {
        if self.batch.files.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.batch.clone()))
    }
}
