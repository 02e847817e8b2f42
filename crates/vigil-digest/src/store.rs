//! The [`DigestStore`]: computes, caches and reloads per-line digests.
//!
//! A sidecar, once written, is trusted indefinitely. There is no mtime or
//! content re-check; the only way back to a fresh computation is deleting
//! the sidecar ([`DigestStore::invalidate`]) or calling
//! [`DigestStore::make_digest`] directly.
//!
//! Callers must serialize operations that target the same data file. The
//! sidecar is replaced via write-temp-then-rename, so readers never see a
//! half-written cache, but two concurrent writers race last-write-wins.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, info_span, Span};

use crate::error::{DigestError, DigestResult};
use crate::hash::LineHash;
use crate::index::{Digest, DigestIndex, SourceLines};
use crate::sidecar::{self, DEFAULT_SUFFIX};

/// Computes and persists fingerprint indexes for text files.
#[derive(Clone, Debug)]
pub struct DigestStore {
    suffix: String,
    span: Span,
}

impl Default for DigestStore {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

impl DigestStore {
    /// Create a store writing sidecars with the given suffix.
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            span: info_span!("digest_store"),
        }
    }

    /// Log all operations of this store under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The sidecar suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Sidecar path for a data file.
    pub fn sha_filename(&self, path: &Path) -> PathBuf {
        sidecar::sha_filename(path, &self.suffix)
    }

    /// Returns `true` if a sidecar exists for `path`.
    pub fn is_cached(&self, path: &Path) -> bool {
        self.sha_filename(path).exists()
    }

    /// Digest `path`, reusing its sidecar when present.
    ///
    /// With a sidecar, the index comes from the cache and the text is
    /// re-read from `path`, which therefore must still be readable.
    /// Without one, the file is hashed and the sidecar written in the same
    /// pass.
    pub fn digest(&self, path: &Path) -> DigestResult<Digest> {
        let mut digest = Digest::default();
        self.digest_into(path, &mut digest)?;
        Ok(digest)
    }

    /// Like [`digest`](Self::digest), but failures are logged and whatever
    /// was read before the failure is returned (possibly nothing).
    ///
    /// An unreadable file and an empty file are indistinguishable here.
    pub fn digest_or_empty(&self, path: &Path) -> Digest {
        let mut digest = Digest::default();
        if let Err(e) = self.digest_into(path, &mut digest) {
            let _guard = self.span.enter();
            error!(path = %path.display(), error = %e, "digest failed; continuing with partial result");
        }
        digest
    }

    /// Hash `path` from scratch and (re)write its sidecar.
    pub fn make_digest(&self, path: &Path) -> DigestResult<Digest> {
        let mut digest = Digest::default();
        self.make_digest_into(path, &mut digest)?;
        Ok(digest)
    }

    /// Load a sidecar file into an index.
    pub fn load_digest(&self, sidecar_path: &Path) -> DigestResult<DigestIndex> {
        let _guard = self.span.enter();
        info!(path = %sidecar_path.display(), "load digest");
        sidecar::read_sidecar(sidecar_path)
    }

    /// Read the trimmed lines of a data file.
    pub fn load_lines(&self, path: &Path) -> DigestResult<SourceLines> {
        let mut lines = SourceLines::new();
        self.load_lines_into(path, &mut lines)?;
        Ok(lines)
    }

    /// Delete the sidecar of `path`. Returns `false` if there was none.
    pub fn invalidate(&self, path: &Path) -> DigestResult<bool> {
        let _guard = self.span.enter();
        let sidecar_path = self.sha_filename(path);
        match fs::remove_file(&sidecar_path) {
            Ok(()) => {
                info!(path = %sidecar_path.display(), "digest cache removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(DigestError::Persist {
                path: sidecar_path,
                source,
            }),
        }
    }

    fn digest_into(&self, path: &Path, digest: &mut Digest) -> DigestResult<()> {
        let sidecar_path = self.sha_filename(path);
        if sidecar_path.exists() {
            // Index first: a lenient caller keeps it even if the source is gone.
            digest.index = self.load_digest(&sidecar_path)?;
            self.load_lines_into(path, &mut digest.lines)
        } else {
            self.make_digest_into(path, digest)
        }
    }

    fn load_lines_into(&self, path: &Path, lines: &mut SourceLines) -> DigestResult<()> {
        let _guard = self.span.enter();
        info!(path = %path.display(), "load data");

        let unavailable = |source| DigestError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = BufReader::new(File::open(path).map_err(unavailable)?);
        let mut buf = Vec::new();
        while read_line(&mut reader, &mut buf).map_err(unavailable)? {
            lines.push(trimmed_text(&buf));
        }
        Ok(())
    }

    fn make_digest_into(&self, path: &Path, digest: &mut Digest) -> DigestResult<()> {
        let _guard = self.span.enter();
        info!(path = %path.display(), "make digest");

        let unavailable = |source| DigestError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let sidecar_path = self.sha_filename(path);
        let persist = |source| DigestError::Persist {
            path: sidecar_path.clone(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let mut tmp = NamedTempFile::new_in(parent_dir(&sidecar_path)).map_err(persist)?;

        {
            let mut reader = BufReader::new(file);
            let mut writer = BufWriter::new(tmp.as_file_mut());
            let mut buf = Vec::new();
            let mut line_index = 0usize;

            while read_line(&mut reader, &mut buf).map_err(unavailable)? {
                let hash = LineHash::of(&buf);
                digest.index.insert(hash, line_index);
                digest.lines.push(trimmed_text(&buf));
                writer
                    .write_all(sidecar::format_record(line_index, &hash).as_bytes())
                    .map_err(persist)?;
                line_index += 1;
            }
            writer.flush().map_err(persist)?;
        }

        tmp.persist(&sidecar_path).map_err(|e| persist(e.error))?;
        debug!(
            path = %sidecar_path.display(),
            lines = digest.lines.len(),
            distinct = digest.index.len(),
            "digest cache written"
        );
        Ok(())
    }
}

/// Read one physical line, terminator included, into `buf`.
/// Returns `false` at end of input.
///
/// Only `\n` ends a line. Form feeds, vertical tabs, `\x1c`..`\x1e`, NEL and
/// the Unicode line/paragraph separators stay inside the line, so a file
/// containing them indexes differently from a splitter that breaks on them.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    Ok(reader.read_until(b'\n', buf)? > 0)
}

fn trimmed_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn h(s: &str) -> LineHash {
        LineHash::of(s.as_bytes())
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn fresh_digest_writes_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\nb\nc\n");
        let store = DigestStore::default();

        let digest = store.digest(&path).unwrap();
        assert_eq!(digest.index.len(), 3);
        assert_eq!(digest.lines.as_slice(), ["a", "b", "c"]);

        let sidecar = fs::read_to_string(dir.path().join("a.txt.sha")).unwrap();
        let expected = format!("0:{}\n1:{}\n2:{}\n", h("a\n"), h("b\n"), h("c\n"));
        assert_eq!(sidecar, expected);
    }

    #[test]
    fn duplicate_lines_keep_last_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "dup.txt", "a\na\n");
        let store = DigestStore::default();

        let digest = store.digest(&path).unwrap();
        assert_eq!(digest.index.len(), 1);
        assert_eq!(digest.index.get(&h("a\n")), Some(1));
        assert_eq!(digest.lines.len(), 2);

        // The sidecar still records both physical lines.
        let sidecar = fs::read_to_string(store.sha_filename(&path)).unwrap();
        assert_eq!(sidecar.lines().count(), 2);
    }

    #[test]
    fn cached_digest_matches_fresh_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\nb\na\nc\n");
        let store = DigestStore::default();

        let fresh = store.digest(&path).unwrap();
        assert!(store.is_cached(&path));
        let cached = store.digest(&path).unwrap();
        assert_eq!(fresh, cached);
    }

    #[test]
    fn cache_is_trusted_even_when_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\nb\n");
        let store = DigestStore::default();
        store.digest(&path).unwrap();

        fs::write(&path, "x\ny\n").unwrap();
        let digest = store.digest(&path).unwrap();
        assert!(digest.index.contains(&h("a\n")));
        assert!(!digest.index.contains(&h("x\n")));
        // Text is always re-read from the data file.
        assert_eq!(digest.lines.as_slice(), ["x", "y"]);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\n");
        let store = DigestStore::default();
        store.digest(&path).unwrap();

        fs::write(&path, "z\n").unwrap();
        assert!(store.invalidate(&path).unwrap());
        assert!(!store.invalidate(&path).unwrap());

        let digest = store.digest(&path).unwrap();
        assert!(digest.index.contains(&h("z\n")));
    }

    #[test]
    fn lines_are_trimmed_but_hashed_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "ws.txt", "  a \r\nlast");
        let store = DigestStore::default();

        let digest = store.digest(&path).unwrap();
        assert_eq!(digest.lines.as_slice(), ["a", "last"]);
        assert_eq!(digest.index.get(&h("  a \r\n")), Some(0));
        assert_eq!(digest.index.get(&h("last")), Some(1));
    }

    #[test]
    fn missing_source_is_an_error_and_leaves_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let store = DigestStore::default();

        assert!(matches!(
            store.digest(&path),
            Err(DigestError::SourceUnavailable { .. })
        ));
        assert!(!store.is_cached(&path));
    }

    #[test]
    fn cached_digest_still_needs_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\n");
        let store = DigestStore::default();
        store.digest(&path).unwrap();

        fs::remove_file(&path).unwrap();
        assert!(matches!(
            store.digest(&path),
            Err(DigestError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn digest_or_empty_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let store = DigestStore::default();
        let digest = store.digest_or_empty(&dir.path().join("missing.txt"));
        assert!(digest.index.is_empty());
        assert!(digest.lines.is_empty());
    }

    #[test]
    fn digest_or_empty_keeps_cached_index_without_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "old.txt", "a\nb\n");
        let store = DigestStore::default();
        store.digest(&path).unwrap();

        fs::remove_file(&path).unwrap();
        let digest = store.digest_or_empty(&path);
        assert_eq!(digest.index.len(), 2);
        assert_eq!(digest.index.get(&h("a\n")), Some(0));
        assert_eq!(digest.index.get(&h("b\n")), Some(1));
        assert!(digest.lines.is_empty());
    }

    #[test]
    fn malformed_sidecar_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\n");
        write_file(dir.path(), "a.txt.sha", "0:nothex\n");
        let store = DigestStore::default();

        assert!(matches!(
            store.digest(&path),
            Err(DigestError::CacheParse { line: 1, .. })
        ));
    }

    #[test]
    fn custom_suffix_is_used_on_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "a\n");
        let store = DigestStore::new(".digest");

        store.digest(&path).unwrap();
        assert!(dir.path().join("a.txt.digest").exists());
        assert!(!dir.path().join("a.txt.sha").exists());
        assert_eq!(store.digest(&path).unwrap().index.len(), 1);
    }

    #[test]
    fn empty_file_digests_to_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.txt", "");
        let store = DigestStore::default();

        let digest = store.digest(&path).unwrap();
        assert!(digest.index.is_empty());
        assert_eq!(fs::read_to_string(store.sha_filename(&path)).unwrap(), "");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn index_holds_distinct_lines_at_last_position(
            lines in proptest::collection::vec("[a-c]{0,2}", 0..20)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let content: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let path = write_file(dir.path(), "p.txt", &content);

            let digest = DigestStore::default().digest(&path).unwrap();
            let distinct: std::collections::HashSet<_> = lines.iter().collect();
            prop_assert_eq!(digest.index.len(), distinct.len());
            prop_assert_eq!(digest.lines.len(), lines.len());

            for line in &distinct {
                let last = lines.iter().rposition(|l| l == *line).unwrap();
                prop_assert_eq!(digest.index.get(&h(&format!("{line}\n"))), Some(last));
            }
        }
    }
}
