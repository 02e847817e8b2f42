//! Diff output files.
//!
//! - Index list: one display line number per line.
//! - Data artifact: one new line text per line.
//! - Index artifact: a single line of comma-joined display line numbers.
//!
//! Every file is written to a temporary sibling and renamed into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{DiffError, DiffResult};
use crate::line_diff::DiffRecord;

/// Write the display line numbers of `records`, one per line.
pub fn save_diff_index_list(records: &[DiffRecord], out_path: &Path) -> DiffResult<()> {
    info!(path = %out_path.display(), differences = records.len(), "save diff index list");
    let body: String = records
        .iter()
        .map(|r| format!("{}\n", r.line_number))
        .collect();
    write_atomic(out_path, body.as_bytes())
}

/// Write the two-file artifact pair. Either path may be `None` to skip it.
///
/// Returns the paths actually written, data file first.
pub fn save_diff_artifacts(
    data_path: Option<&Path>,
    index_path: Option<&Path>,
    records: &[DiffRecord],
) -> DiffResult<Vec<PathBuf>> {
    info!(
        data = ?data_path,
        index = ?index_path,
        differences = records.len(),
        "save diff artifacts"
    );
    let mut written = Vec::new();

    if let Some(path) = data_path {
        let body: String = records.iter().map(|r| format!("{}\n", r.text)).collect();
        write_atomic(path, body.as_bytes())?;
        written.push(path.to_path_buf());
    }

    if let Some(path) = index_path {
        let joined = records
            .iter()
            .map(|r| r.line_number.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write_atomic(path, format!("{joined}\n").as_bytes())?;
        written.push(path.to_path_buf());
    }

    Ok(written)
}

fn write_atomic(path: &Path, contents: &[u8]) -> DiffResult<()> {
    let err = |source| DiffError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
    tmp.write_all(contents).map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_digest::LineHash;

    fn record(line_number: usize, text: &str) -> DiffRecord {
        DiffRecord {
            hash: LineHash::of(format!("{text}\n").as_bytes()),
            line_number,
            text: text.into(),
        }
    }

    #[test]
    fn index_list_one_number_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("diff.idx");
        save_diff_index_list(&[record(4, "d"), record(2, "b")], &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "4\n2\n");
    }

    #[test]
    fn empty_index_list_is_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("diff.idx");
        save_diff_index_list(&[], &out).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn artifacts_written_in_emission_order() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("new_file.txt.diff");
        let index = dir.path().join("index_file.txt.csv");
        let records = [record(3, "c|1"), record(1, "a|2")];

        let written =
            save_diff_artifacts(Some(data.as_path()), Some(index.as_path()), &records).unwrap();
        assert_eq!(written, vec![data.clone(), index.clone()]);
        assert_eq!(std::fs::read_to_string(&data).unwrap(), "c|1\na|2\n");
        assert_eq!(std::fs::read_to_string(&index).unwrap(), "3,1\n");
    }

    #[test]
    fn omitted_artifacts_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.csv");

        let written =
            save_diff_artifacts(None, Some(index.as_path()), &[record(1, "a")]).unwrap();
        assert_eq!(written, vec![index.clone()]);
        assert_eq!(std::fs::read_to_string(&index).unwrap(), "1\n");

        assert!(save_diff_artifacts(None, None, &[]).unwrap().is_empty());
    }

    #[test]
    fn empty_index_artifact_is_single_newline() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.csv");
        save_diff_artifacts(None, Some(index.as_path()), &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&index).unwrap(), "\n");
    }

    #[test]
    fn unwritable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("no-such-dir").join("diff.idx");
        assert!(matches!(
            save_diff_index_list(&[record(1, "a")], &out),
            Err(DiffError::Write { .. })
        ));
    }
}
