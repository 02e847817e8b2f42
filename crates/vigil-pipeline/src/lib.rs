//! The Vigil change-detection pipeline.
//!
//! Ties the digest, diff and track crates together: a [`SourceProvider`]
//! supplies a timestamped batch of data files, each file is classified into
//! a category, diffed against the previous file of that category, and the
//! metric blocks produced by a [`StatsExtractor`] are written to the track
//! documents configured for it.
//!
//! # Modules
//!
//! - [`config`] -- TOML configuration with validation and default fallback
//! - [`catalog`] -- Data file naming and the [`CategoryRegistry`]
//! - [`source`] -- The [`SourceProvider`] seam and [`LocalFiles`]
//! - [`extract`] -- The [`StatsExtractor`] seam and [`LineStats`]
//! - [`pipeline`] -- The [`Pipeline`] runner

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod source;

pub use catalog::{parse_timestamp, CategoryRegistry, DataFileName};
pub use config::{Config, LocalConfig, TrackConfig, DEFAULT_CONFIG_DIR};
pub use error::{ConfigError, ConfigResult, PipelineError, PipelineResult};
pub use extract::{ExtractContext, LineStats, StatsExtractor};
pub use pipeline::{FileReport, Pipeline, RunReport};
pub use source::{LocalFiles, SourceBatch, SourceProvider};
