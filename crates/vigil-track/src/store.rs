//! File-backed track persistence.
//!
//! Every upsert is a full read-modify-rewrite of one JSON document. The
//! rewrite goes through a temporary sibling file and a rename, so a failed
//! write leaves the previous document intact. There is no locking: at most
//! one writer per document at a time.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn, Span};

use crate::error::{TrackError, TrackResult};
use crate::types::{MetricBlock, TrackDocument, TrackPoint};

/// Reads and rewrites track documents under a storage directory.
#[derive(Clone, Debug)]
pub struct TrackStore {
    root: PathBuf,
    span: Span,
}

impl TrackStore {
    /// Create a store resolving block outputs against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            span: info_span!("track_store"),
        }
    }

    /// Log all operations of this store under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Resolve a block output path. Absolute paths are kept as-is.
    pub fn resolve(&self, output: &Path) -> PathBuf {
        self.root.join(output)
    }

    /// Load the document at `path`. A missing or blank file is an empty
    /// document.
    pub fn load(&self, path: &Path) -> TrackResult<TrackDocument> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TrackDocument::new()),
            Err(source) => {
                return Err(TrackError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(TrackDocument::new());
        }
        serde_json::from_str(&raw).map_err(|e| TrackError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Rewrite the whole document at `path`.
    pub fn save(&self, path: &Path, document: &TrackDocument) -> TrackResult<()> {
        let mut body = serde_json::to_string_pretty(document)
            .map_err(|e| TrackError::Serialization(e.to_string()))?;
        body.push('\n');

        let err = |source| TrackError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(err)?;
        tmp.write_all(body.as_bytes()).map_err(err)?;
        tmp.persist(path).map_err(|e| err(e.error))?;
        Ok(())
    }

    /// Record one metric value in the document at `path`.
    ///
    /// See [`TrackDocument::upsert`] for the latest-only and history rules.
    pub fn upsert(
        &self,
        path: &Path,
        category: &str,
        key: &str,
        date: &str,
        value: impl Into<Value>,
        history: bool,
    ) -> TrackResult<()> {
        let _guard = self.span.enter();
        debug!(path = %path.display(), category, key, date, history, "upsert track");

        let mut document = self.load(path)?;
        document.upsert(category, key, TrackPoint::new(date, value), history);
        self.save(path, &document)
    }

    /// Persist every block that names an output, dated `date`.
    ///
    /// Blocks are applied in order, one upsert per value, so blocks sharing
    /// an output see each other's writes. Returns each distinct file
    /// written, in first-write order.
    pub fn save_tracks(&self, date: &str, blocks: &[MetricBlock]) -> TrackResult<Vec<PathBuf>> {
        let _guard = self.span.enter();
        info!(blocks = blocks.len(), date, "save tracks");

        let mut saved = Vec::new();
        for block in blocks {
            let Some(output) = block
                .output
                .as_deref()
                .filter(|o| !o.as_os_str().is_empty())
            else {
                debug!(title = %block.title, "block has no output; not persisted");
                continue;
            };
            if block.kind.is_empty() {
                warn!(title = %block.title, "block has no type; nothing saved");
                continue;
            }

            let path = self.resolve(output);
            info!(
                kind = %block.kind,
                path = %path.display(),
                values = block.values.len(),
                "save tracks set"
            );

            if block.values.is_empty() {
                let mut document = self.load(&path)?;
                document.ensure_category(&block.kind);
                self.save(&path, &document)?;
            }
            for entry in &block.values {
                self.upsert(
                    &path,
                    &block.kind,
                    &entry.key,
                    date,
                    entry.val.clone(),
                    block.history_flag,
                )?;
            }

            if !saved.contains(&path) {
                saved.push(path);
            }
        }
        Ok(saved)
    }
}
