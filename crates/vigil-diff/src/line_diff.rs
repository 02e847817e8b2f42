//! Content-based line diff.
//!
//! A line of the new file is "new" when its exact hash occurs nowhere in the
//! old file. Position plays no part: reordered lines never show up, and
//! removals are not reported at all.

use serde::Serialize;
use vigil_digest::{Digest, DigestIndex, LineHash, SourceLines};

use crate::error::{DiffError, DiffResult};

/// A line of the new file whose content did not exist in the old one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    /// Hash of the line's raw bytes.
    pub hash: LineHash,
    /// 1-based line number in the new file.
    pub line_number: usize,
    /// Trimmed line text.
    pub text: String,
}

impl DiffRecord {
    /// The 0-based line index in the new file.
    pub fn line_index(&self) -> usize {
        self.line_number - 1
    }
}

/// The result of diffing two digests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LineDiff {
    /// New-content records, in the new index's iteration order.
    pub records: Vec<DiffRecord>,
    /// Physical line count of the new file.
    pub new_lines: usize,
}

impl LineDiff {
    /// Returns `true` if the new file has no new content.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of new-content records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffRecord> + '_ {
        self.records.iter()
    }

    /// Display line numbers, in emission order.
    pub fn line_numbers(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.line_number).collect()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            total_new_lines: self.new_lines,
            new_records: self.records.len(),
        }
    }
}

/// Counts of a diff, as fed to metric blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Physical lines in the new file.
    pub total_new_lines: usize,
    /// Lines whose content is new ("modified lines").
    pub new_records: usize,
}

/// Compute the records of `new_index` whose hash is absent from `old_index`.
///
/// Records are emitted in `new_index` iteration order, i.e. the order in
/// which each distinct hash was first seen in the new file, carrying the
/// line index of its last occurrence.
pub fn compute_diff(
    old_index: &DigestIndex,
    new_lines: &SourceLines,
    new_index: &DigestIndex,
) -> DiffResult<LineDiff> {
    let records = new_index
        .iter()
        .filter(|(hash, _)| !old_index.contains(hash))
        .map(|(hash, line_index)| {
            let text = new_lines.get(line_index).ok_or(DiffError::IndexOutOfRange {
                index: line_index,
                len: new_lines.len(),
            })?;
            Ok(DiffRecord {
                hash,
                line_number: line_index + 1,
                text: text.to_string(),
            })
        })
        .collect::<DiffResult<Vec<_>>>()?;

    Ok(LineDiff {
        records,
        new_lines: new_lines.len(),
    })
}

/// Diff two whole digests.
pub fn diff_digests(old: &Digest, new: &Digest) -> DiffResult<LineDiff> {
    compute_diff(&old.index, &new.lines, &new.index)
}
