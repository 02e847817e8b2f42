//! Statistics extraction seam.
//!
//! Domain statistics over the data records live outside this workspace. An
//! extractor turns one processed file into metric blocks, which the
//! pipeline hands to the track store unchanged.

use std::path::Path;

use vigil_diff::LineDiff;
use vigil_digest::Digest;
use vigil_track::MetricBlock;

use crate::config::TrackConfig;
use crate::error::PipelineResult;

/// Everything known about a file once it has been digested and diffed.
#[derive(Clone, Copy, Debug)]
pub struct ExtractContext<'a> {
    pub category: &'a str,
    pub data_path: &'a Path,
    /// Data date, `YYYY-MM-DD`.
    pub date: &'a str,
    pub digest: &'a Digest,
    pub diff: &'a LineDiff,
    /// Track settings for the category, if configured.
    pub track: Option<&'a TrackConfig>,
}

/// Produces metric blocks for a processed data file.
pub trait StatsExtractor {
    fn extract(&self, ctx: &ExtractContext<'_>) -> PipelineResult<Vec<MetricBlock>>;
}

/// Built-in extractor: line counts only.
///
/// Emits one `stats` block with `line_count`, `distinct_lines` and
/// `changed_lines`, routed to the category's configured track file.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineStats;

impl StatsExtractor for LineStats {
    fn extract(&self, ctx: &ExtractContext<'_>) -> PipelineResult<Vec<MetricBlock>> {
        let title = ctx
            .track
            .and_then(|t| t.title.clone())
            .unwrap_or_else(|| format!("{} file statistics", ctx.category));

        let mut block = MetricBlock::new(title, "stats")
            .with_value("line_count", ctx.digest.line_count())
            .with_value("distinct_lines", ctx.digest.index.len())
            .with_value("changed_lines", ctx.diff.len())
            .with_rss(true);

        if let Some(track) = ctx.track {
            block.output = track.filename.clone();
            block.history_flag = track.save_history;
        }
        Ok(vec![block])
    }
}
