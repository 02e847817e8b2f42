//! Diff engine over line digests.
//!
//! Compares two fingerprint indexes and reports the lines of the new file
//! whose content never appeared in the old one. This is a content diff, not
//! a sequence diff: no insertion/deletion alignment, no move detection.
//!
//! # Key Types
//!
//! - [`LineDiff`] / [`DiffRecord`] -- The new-content records of a comparison
//! - [`save_diff_index_list`] / [`save_diff_artifacts`] -- Output files

pub mod error;
pub mod line_diff;
pub mod output;

pub use error::{DiffError, DiffResult};
pub use line_diff::{compute_diff, diff_digests, DiffRecord, DiffSummary, LineDiff};
pub use output::{save_diff_artifacts, save_diff_index_list};
