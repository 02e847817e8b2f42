//! Sidecar cache format.
//!
//! One record per physical line of the original file, in file order,
//! duplicates included:
//!
//! ```text
//! <0-based line index>:<64 hex chars>\n
//! ```
//!
//! The sidecar lives next to the data file under `<original><suffix>`.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DigestError, DigestResult};
use crate::hash::LineHash;
use crate::index::DigestIndex;

/// Default sidecar suffix.
pub const DEFAULT_SUFFIX: &str = ".sha";

/// Separator between the line index and the hash in a record.
pub const FIELD_SEPARATOR: char = ':';

/// Sidecar path for `path`: the suffix is appended unless `path` already
/// ends with it.
pub fn sha_filename(path: &Path, suffix: &str) -> PathBuf {
    if path.as_os_str().to_string_lossy().ends_with(suffix) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Format one sidecar record, newline included.
pub fn format_record(line_index: usize, hash: &LineHash) -> String {
    format!("{line_index}{FIELD_SEPARATOR}{hash}\n")
}

/// Parse one sidecar record (without its newline).
///
/// The index is the first field and the hash the last one.
pub fn parse_record(record: &str) -> Result<(usize, LineHash), String> {
    let record = record.trim();
    let mut fields = record.split(FIELD_SEPARATOR);
    let first = fields.next().unwrap_or_default();
    let last = fields.last().ok_or_else(|| format!("missing separator in {record:?}"))?;

    let line_index = first
        .parse::<usize>()
        .map_err(|e| format!("bad line index {first:?}: {e}"))?;
    let hash = LineHash::from_hex(last).map_err(|e| format!("bad hash {last:?}: {e}"))?;
    Ok((line_index, hash))
}

/// Load a sidecar into a fresh index. Later records win for repeated hashes.
pub fn read_sidecar(path: &Path) -> DigestResult<DigestIndex> {
    let unavailable = |source| DigestError::CacheUnavailable {
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(path).map_err(unavailable)?);
    let mut index = DigestIndex::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(unavailable)?;
        let (line_index, hash) = parse_record(&line).map_err(|reason| DigestError::CacheParse {
            path: path.to_path_buf(),
            line: n + 1,
            reason,
        })?;
        index.insert(hash, line_index);
    }

    debug!(path = %path.display(), entries = index.len(), "loaded digest sidecar");
    Ok(index)
}
