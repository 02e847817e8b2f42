//! In-memory fingerprint index of a text file.
//!
//! A [`Digest`] pairs the [`DigestIndex`] (hash to 0-based line index) with
//! the [`SourceLines`] it was computed from. The index holds one entry per
//! distinct hash: when several lines share content, the last occurrence's
//! line index wins and the earlier ones are unreachable by lookup.

use std::collections::HashMap;

use crate::hash::LineHash;

/// Mapping from line hash to the 0-based index of its last occurrence.
///
/// Iteration follows the order in which each distinct hash was first
/// inserted. Re-inserting a known hash updates its line index in place
/// without moving it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestIndex {
    positions: HashMap<LineHash, usize>,
    order: Vec<LineHash>,
}

impl DigestIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash -> line_index`, overwriting any prior mapping.
    ///
    /// Returns the previous line index if the hash was already present.
    pub fn insert(&mut self, hash: LineHash, line_index: usize) -> Option<usize> {
        let previous = self.positions.insert(hash, line_index);
        if previous.is_none() {
            self.order.push(hash);
        }
        previous
    }

    /// Line index recorded for `hash`.
    pub fn get(&self, hash: &LineHash) -> Option<usize> {
        self.positions.get(hash).copied()
    }

    /// Returns `true` if `hash` occurs anywhere in the indexed file.
    pub fn contains(&self, hash: &LineHash) -> bool {
        self.positions.contains_key(hash)
    }

    /// Number of distinct hashes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate `(hash, line_index)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (LineHash, usize)> + '_ {
        self.order
            .iter()
            .filter_map(|hash| self.positions.get(hash).map(|&idx| (*hash, idx)))
    }
}

/// Trimmed line texts, index-aligned with the original file.
///
/// Duplicates are kept: the length is the physical line count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLines(Vec<String>);

impl SourceLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.0.push(line);
    }

    /// Text of the line at the 0-based `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for SourceLines {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

/// The fingerprint of one file: its index plus the lines it indexes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Digest {
    pub index: DigestIndex,
    pub lines: SourceLines,
}

impl Digest {
    /// Number of physical lines read.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
