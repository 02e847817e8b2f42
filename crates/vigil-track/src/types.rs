//! Track document and metric block types.
//!
//! On disk a track document looks like:
//!
//! ```json
//! {
//!   "stats": {
//!     "line_count": {"date": "2023-01-02", "value": 12},
//!     "changed_lines": [
//!       {"date": "2023-01-01", "value": 3},
//!       {"date": "2023-01-02", "value": 5}
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One dated metric value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub date: String,
    pub value: Value,
}

impl TrackPoint {
    pub fn new(date: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
        }
    }
}

/// The stored shape of one metric key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackValue {
    /// Every recorded date, in insertion order.
    History(Vec<TrackPoint>),
    /// Only the most recent value.
    Latest(TrackPoint),
}

impl TrackValue {
    /// The most recently appended point.
    pub fn latest(&self) -> Option<&TrackPoint> {
        match self {
            Self::History(points) => points.last(),
            Self::Latest(point) => Some(point),
        }
    }
}

/// `{category: {metric key: value}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackDocument {
    categories: BTreeMap<String, BTreeMap<String, TrackValue>>,
}

impl TrackDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the document has no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Metrics of a category.
    pub fn category(&self, category: &str) -> Option<&BTreeMap<String, TrackValue>> {
        self.categories.get(category)
    }

    /// Stored value of one metric.
    pub fn get(&self, category: &str, key: &str) -> Option<&TrackValue> {
        self.categories.get(category)?.get(key)
    }

    /// Category names, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.categories.keys().map(String::as_str)
    }

    /// Create `category` if it does not exist yet.
    pub fn ensure_category(&mut self, category: &str) -> &mut BTreeMap<String, TrackValue> {
        self.categories.entry(category.to_string()).or_default()
    }

    /// Record `point` under `category`/`key`.
    ///
    /// Latest-only mode replaces whatever was stored. History mode keeps a
    /// list: a point with an already recorded date replaces that entry's
    /// value (the last one if the date repeats), any other date is appended.
    /// A non-list value under history mode is discarded for a fresh list.
    pub fn upsert(&mut self, category: &str, key: &str, point: TrackPoint, history: bool) {
        let metrics = self.ensure_category(category);

        if !history {
            metrics.insert(key.to_string(), TrackValue::Latest(point));
            return;
        }

        match metrics.get_mut(key) {
            Some(TrackValue::History(points)) => {
                match points.iter_mut().rev().find(|p| p.date == point.date) {
                    Some(existing) => existing.value = point.value,
                    None => points.push(point),
                }
            }
            _ => {
                metrics.insert(key.to_string(), TrackValue::History(vec![point]));
            }
        }
    }
}

/// One `{key, val}` pair of a metric block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub key: String,
    pub val: Value,
}

/// A titled group of metrics produced by a statistics extractor.
///
/// Blocks without an `output` are reported but never persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBlock {
    #[serde(default)]
    pub title: String,
    /// Category the values are stored under.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub values: Vec<MetricEntry>,
    /// Whether the block belongs in the published update summary.
    #[serde(default)]
    pub rss: bool,
    /// Target track document, relative to the storage directory.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(rename = "historyFlag", alias = "history_flag", default)]
    pub history_flag: bool,
}

impl MetricBlock {
    pub fn new(title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, val: impl Into<Value>) -> Self {
        self.values.push(MetricEntry {
            key: key.into(),
            val: val.into(),
        });
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_history(mut self, history: bool) -> Self {
        self.history_flag = history;
        self
    }

    pub fn with_rss(mut self, rss: bool) -> Self {
        self.rss = rss;
        self
    }
}
