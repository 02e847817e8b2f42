//! Metric tracking for the Vigil pipeline.
//!
//! Persists named metric values over time in JSON documents of the form
//! `{category: {key: value}}`, where a value is either the latest
//! `{date, value}` pair or the full dated history of the key.
//!
//! # Modules
//!
//! - [`error`] -- Error types for track persistence
//! - [`types`] -- [`TrackDocument`], [`TrackValue`], [`MetricBlock`]
//! - [`store`] -- The file-backed [`TrackStore`]

pub mod error;
pub mod store;
pub mod types;

pub use error::{TrackError, TrackResult};
pub use store::TrackStore;
pub use types::{MetricBlock, MetricEntry, TrackDocument, TrackPoint, TrackValue};
