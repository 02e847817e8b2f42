//! The change-detection pipeline.
//!
//! For each data file of a batch: digest the previous file of the same
//! category and the new one, diff them, write the diff artifacts, extract
//! metric blocks and persist them as tracks. Runs are sequential; nothing
//! here may run concurrently against the same storage directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, info_span, warn, Span};
use vigil_diff::{diff_digests, save_diff_artifacts};
use vigil_digest::{Digest, DigestStore};
use vigil_track::{MetricBlock, TrackStore};

use crate::catalog::{parse_timestamp, CategoryRegistry, DataFileName};
use crate::config::Config;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::extract::{ExtractContext, LineStats, StatsExtractor};
use crate::source::SourceProvider;

/// Outcome of processing one data file.
#[derive(Clone, Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub category: String,
    pub date: String,
    /// Previous file diffed against, if any.
    pub previous: Option<PathBuf>,
    pub line_count: usize,
    pub changed_lines: usize,
    pub blocks: Vec<MetricBlock>,
    /// Diff artifacts and track documents written.
    pub written: Vec<PathBuf>,
}

/// Outcome of one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub batch: Option<String>,
    pub date: Option<String>,
    /// `true` when the batch was not newer than the last check.
    pub up_to_date: bool,
    pub files: Vec<FileReport>,
    /// Files that are not data files of a known category.
    pub skipped: Vec<PathBuf>,
}

impl RunReport {
    /// Every file written during the run, in order.
    pub fn written(&self) -> Vec<&Path> {
        self.files
            .iter()
            .flat_map(|f| f.written.iter().map(PathBuf::as_path))
            .collect()
    }

    /// Returns `true` if the run advanced the configuration (a newer batch
    /// was taken, even if every file in it was skipped).
    pub fn changed_state(&self) -> bool {
        self.batch.is_some() && !self.up_to_date
    }
}

/// Digest, diff and track pipeline over a storage directory.
pub struct Pipeline {
    config: Config,
    registry: CategoryRegistry,
    digests: DigestStore,
    tracks: TrackStore,
    extractor: Box<dyn StatsExtractor>,
    span: Span,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("storage", &self.config.local.storage)
            .field("registry", &self.registry)
            .field("sha_suffix", &self.digests.suffix())
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from a validated configuration, with the built-in
    /// [`LineStats`] extractor.
    pub fn new(config: Config) -> Self {
        let span = info_span!("pipeline", storage = %config.local.storage.display());
        Self {
            registry: CategoryRegistry::from_config(&config),
            digests: DigestStore::new(config.local.sha_suffix.clone())
                .with_span(info_span!(parent: &span, "digest_store")),
            tracks: TrackStore::new(config.local.storage.clone())
                .with_span(info_span!(parent: &span, "track_store")),
            extractor: Box::new(LineStats),
            config,
            span,
        }
    }

    /// Replace the statistics extractor.
    pub fn with_extractor(mut self, extractor: impl StatsExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Log under `span`; the component stores log under children of it.
    pub fn with_span(mut self, span: Span) -> Self {
        self.digests = self
            .digests
            .with_span(info_span!(parent: &span, "digest_store"));
        self.tracks = self
            .tracks
            .with_span(info_span!(parent: &span, "track_store"));
        self.span = span;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configuration, with `last_check` and `previous` advanced by the
    /// runs performed so far.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Returns `true` if the batch named `batch_name` is strictly later
    /// than the last check.
    pub fn is_newer(&self, batch_name: &str) -> PipelineResult<bool> {
        let name = DataFileName::parse(batch_name)?;
        let last = self.last_check()?;
        Ok(name.is_newer_than(last.as_ref()))
    }

    fn last_check(&self) -> PipelineResult<Option<chrono::NaiveDateTime>> {
        self.config
            .local
            .last_check
            .as_deref()
            .map(|stamp| {
                parse_timestamp(stamp).map_err(|e| {
                    PipelineError::from(ConfigError::Invalid(format!(
                        "local.last_check {stamp:?}: {e}"
                    )))
                })
            })
            .transpose()
    }

    /// Process one data file dated `date`.
    ///
    /// The previous file of the category is digested leniently: a missing
    /// or unreadable previous file counts as empty, so every line is new.
    /// The new file must be readable.
    pub fn process_file(&mut self, path: &Path, date: &str) -> PipelineResult<FileReport> {
        let _guard = self.span.enter();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::InvalidDataFileName(path.display().to_string()))?;
        let category = self.registry.classify(&DataFileName::parse(&file_name)?)?;
        info!(path = %path.display(), %category, "compute file");

        let previous = self.config.local.previous.get(&category).cloned();
        let old = match &previous {
            Some(prev) => {
                info!(old = %prev.display(), new = %path.display(), "diff");
                self.digests.digest_or_empty(prev)
            }
            None => {
                info!(%category, "no previous file; every line is new");
                Digest::default()
            }
        };
        let new = self.digests.digest(path)?;
        let diff = diff_digests(&old, &new)?;
        let summary = diff.summary();
        info!(differences = summary.new_records, "diff count");

        let mut written = Vec::new();
        if self.config.local.save_diff_index {
            let storage = &self.config.local.storage;
            let data_path = storage.join(format!("new_{file_name}.diff"));
            let index_path = storage.join(format!("index_{file_name}.csv"));
            written.extend(save_diff_artifacts(
                Some(data_path.as_path()),
                Some(index_path.as_path()),
                &diff.records,
            )?);
        }

        let ctx = ExtractContext {
            category: &category,
            data_path: path,
            date,
            digest: &new,
            diff: &diff,
            track: self.config.track(&category),
        };
        let blocks = self.extractor.extract(&ctx)?;
        written.extend(self.tracks.save_tracks(date, &blocks)?);

        self.config
            .local
            .previous
            .insert(category.clone(), path.to_path_buf());

        Ok(FileReport {
            path: path.to_path_buf(),
            category,
            date: date.to_string(),
            previous,
            line_count: summary.total_new_lines,
            changed_lines: summary.new_records,
            blocks,
            written,
        })
    }

    /// Fetch a batch and process it if it is newer than the last check.
    ///
    /// Files that are not data files of a registered category are logged
    /// and skipped. Any other failure aborts the run; files processed
    /// before the failure keep their outputs.
    pub fn run(&mut self, provider: &dyn SourceProvider) -> PipelineResult<RunReport> {
        let Some(batch) = provider.fetch()? else {
            let _guard = self.span.enter();
            info!("no data available");
            return Ok(RunReport::default());
        };

        let stamp = DataFileName::parse(&batch.name)?;
        let mut report = RunReport {
            batch: Some(batch.name.clone()),
            date: Some(stamp.data_date()),
            ..RunReport::default()
        };

        if !stamp.is_newer_than(self.last_check()?.as_ref()) {
            let _guard = self.span.enter();
            info!(
                batch = %batch.name,
                last_check = ?self.config.local.last_check,
                "no newer file"
            );
            report.up_to_date = true;
            return Ok(report);
        }

        let date = stamp.data_date();
        for file in &batch.files {
            match self.process_file(file, &date) {
                Ok(file_report) => report.files.push(file_report),
                Err(
                    e @ (PipelineError::UnknownCategory(_)
                    | PipelineError::InvalidDataFileName(_)),
                ) => {
                    let _guard = self.span.enter();
                    warn!(path = %file.display(), error = %e, "skipping file");
                    report.skipped.push(file.clone());
                }
                Err(e) => return Err(e),
            }
        }

        self.config.local.last_check = Some(stamp.stamp());
        let _guard = self.span.enter();
        info!(
            batch = %batch.name,
            processed = report.files.len(),
            skipped = report.skipped.len(),
            "run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use crate::source::LocalFiles;
    use serde_json::{json, Value};
    use std::fs;

    const CAT: &str = "PS_LibreAcces_Personne_activite";

    fn config_for(storage: &Path) -> Config {
        let mut config = Config::new(storage);
        config.local.save_diff_index = true;
        config.tracks.insert(
            CAT.into(),
            TrackConfig {
                filename: Some(PathBuf::from("stats.json")),
                save_history: true,
                title: None,
            },
        );
        config
    }

    fn data_file(dir: &Path, stamp: &str, content: &str) -> PathBuf {
        let path = dir.join(format!("{CAT}_{stamp}.txt"));
        fs::write(&path, content).unwrap();
        path
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn first_file_is_entirely_new() {
        let dir = tempfile::tempdir().unwrap();
        let file = data_file(dir.path(), "201807300827", "h\na\nb\n");
        let mut pipeline = Pipeline::new(config_for(dir.path()));

        let report = pipeline.process_file(&file, "2018-07-30").unwrap();
        assert_eq!(report.category, CAT);
        assert_eq!(report.previous, None);
        assert_eq!(report.line_count, 3);
        assert_eq!(report.changed_lines, 3);
        assert_eq!(pipeline.config().local.previous.get(CAT), Some(&file));
    }

    #[test]
    fn second_file_diffs_against_previous() {
        let dir = tempfile::tempdir().unwrap();
        let first = data_file(dir.path(), "201807300827", "h\na\nb\nc\n");
        let second = data_file(dir.path(), "201808300827", "h\na\nx\nc\n");
        let mut pipeline = Pipeline::new(config_for(dir.path()));

        pipeline.process_file(&first, "2018-07-30").unwrap();
        let report = pipeline.process_file(&second, "2018-08-30").unwrap();
        assert_eq!(report.previous, Some(first));
        assert_eq!(report.changed_lines, 1);

        let name = second.file_name().unwrap().to_string_lossy().into_owned();
        let data = dir.path().join(format!("new_{name}.diff"));
        let index = dir.path().join(format!("index_{name}.csv"));
        assert_eq!(fs::read_to_string(&data).unwrap(), "x\n");
        assert_eq!(fs::read_to_string(&index).unwrap(), "3\n");
        assert!(report.written.contains(&data));
        assert!(report.written.contains(&index));

        assert_eq!(
            read_json(&dir.path().join("stats.json"))["stats"]["changed_lines"],
            json!([
                {"date": "2018-07-30", "value": 4},
                {"date": "2018-08-30", "value": 1}
            ])
        );
    }

    #[test]
    fn missing_previous_file_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config
            .local
            .previous
            .insert(CAT.into(), dir.path().join("gone.txt"));
        let file = data_file(dir.path(), "201807300827", "a\nb\n");
        let mut pipeline = Pipeline::new(config);

        let report = pipeline.process_file(&file, "2018-07-30").unwrap();
        assert_eq!(report.changed_lines, 2);
    }

    #[test]
    fn missing_new_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config_for(dir.path()));
        let missing = dir.path().join(format!("{CAT}_201807300827.txt"));
        assert!(matches!(
            pipeline.process_file(&missing, "2018-07-30"),
            Err(PipelineError::Digest(_))
        ));
    }

    #[test]
    fn unknown_category_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Other_201807300827.txt");
        fs::write(&path, "a\n").unwrap();
        let mut pipeline = Pipeline::new(config_for(dir.path()));
        assert!(matches!(
            pipeline.process_file(&path, "2018-07-30"),
            Err(PipelineError::UnknownCategory(_))
        ));
    }

    #[test]
    fn run_processes_newer_batch_and_skips_strangers() {
        let dir = tempfile::tempdir().unwrap();
        let file = data_file(dir.path(), "201807300827", "a\n");
        let readme = dir.path().join("README.txt");
        fs::write(&readme, "hello\n").unwrap();
        let mut config = config_for(dir.path());
        config.local.last_check = Some("201807010000".into());
        let mut pipeline = Pipeline::new(config);

        let provider = LocalFiles::new(
            "PS_LibreAcces_201808011050.zip",
            vec![file, readme.clone()],
        );
        let report = pipeline.run(&provider).unwrap();

        assert!(!report.up_to_date);
        assert!(report.changed_state());
        assert_eq!(report.date.as_deref(), Some("2018-08-01"));
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.skipped, vec![readme]);
        assert!(report.written().contains(&dir.path().join("stats.json").as_path()));
        assert_eq!(
            pipeline.config().local.last_check.as_deref(),
            Some("201808011050")
        );
    }

    #[test]
    fn run_ignores_batch_not_newer_than_last_check() {
        let dir = tempfile::tempdir().unwrap();
        let file = data_file(dir.path(), "201807300827", "a\n");
        let mut config = config_for(dir.path());
        config.local.last_check = Some("201808011050".into());
        let mut pipeline = Pipeline::new(config);

        let provider = LocalFiles::new("PS_LibreAcces_201808011050.zip", vec![file]);
        let report = pipeline.run(&provider).unwrap();
        assert!(report.up_to_date);
        assert!(!report.changed_state());
        assert!(!dir.path().join("stats.json").exists());
    }

    #[test]
    fn run_without_batch_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(config_for(dir.path()));
        let report = pipeline.run(&LocalFiles::new("x_201808011050.zip", vec![])).unwrap();
        assert!(report.batch.is_none());
    }

    #[test]
    fn is_newer_uses_last_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        assert!(Pipeline::new(config.clone())
            .is_newer("x_201808011050.zip")
            .unwrap());

        config.local.last_check = Some("201808011050".into());
        let pipeline = Pipeline::new(config);
        assert!(!pipeline.is_newer("x_201808011050.zip").unwrap());
        assert!(pipeline.is_newer("x_201808011051.zip").unwrap());
    }

    struct FixedBlocks;

    impl StatsExtractor for FixedBlocks {
        fn extract(&self, ctx: &ExtractContext<'_>) -> PipelineResult<Vec<MetricBlock>> {
            Ok(vec![MetricBlock::new("Domains", "mssante")
                .with_value("a.example", 2)
                .with_output("domains.json")
                .with_history(false)
                .with_rss(ctx.diff.is_empty())])
        }
    }

    #[test]
    fn custom_extractor_blocks_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let file = data_file(dir.path(), "201807300827", "a\n");
        let mut pipeline = Pipeline::new(config_for(dir.path())).with_extractor(FixedBlocks);

        pipeline.process_file(&file, "2018-07-30").unwrap();
        assert_eq!(
            read_json(&dir.path().join("domains.json")),
            json!({"mssante": {"a.example": {"date": "2018-07-30", "value": 2}}})
        );
    }
}
