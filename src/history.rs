use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app_dirs::AppDirs;
use crate::error::HistoryError;
use crate::session::SessionResult;
use crate::util::{mean, truncate_metric};

/// The values stored for one past session. On disk these sit under their
/// decimal id: `{"1": {"wpm": 60, "cpm": 300, "accuracy": 90}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetrics {
    pub wpm: u32,
    pub cpm: u32,
    pub accuracy: u32,
}

impl From<&SessionResult> for RecordMetrics {
    fn from(result: &SessionResult) -> Self {
        Self {
            wpm: truncate_metric(result.wpm),
            cpm: truncate_metric(result.cpm),
            accuracy: truncate_metric(result.accuracy_percent),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: u64,
    pub metrics: RecordMetrics,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HistorySummary {
    pub avg_wpm: f64,
    pub avg_cpm: f64,
    pub avg_accuracy: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Metric {
    #[strum(to_string = "WPM")]
    Wpm,
    #[strum(to_string = "CPM")]
    Cpm,
    #[strum(to_string = "Accuracy")]
    Accuracy,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Wpm, Metric::Cpm, Metric::Accuracy];

    pub fn of(&self, metrics: &RecordMetrics) -> u32 {
        match self {
            Metric::Wpm => metrics.wpm,
            Metric::Cpm => metrics.cpm,
            Metric::Accuracy => metrics.accuracy,
        }
    }
}

/// Durable record of past sessions, kept as one JSON document that is
/// rewritten in full on every append.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    records: BTreeMap<u64, RecordMetrics>,
}

impl HistoryStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_path(AppDirs::history_path())
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
            records: BTreeMap::new(),
        }
    }

    /// `with_path` followed by `load`
    pub fn open<P: AsRef<Path>>(p: P) -> Self {
        let mut store = Self::with_path(p);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory collection with what is on disk. A missing file
    /// is an empty history; an unreadable or malformed one is logged and
    /// treated as empty.
    pub fn load(&mut self) -> &BTreeMap<u64, RecordMetrics> {
        self.records = match self.read_from_disk() {
            Ok(records) => records,
            Err(HistoryError::Read(e)) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unusable history file");
                BTreeMap::new()
            }
        };
        info!(path = %self.path.display(), records = self.records.len(), "history loaded");
        &self.records
    }

    fn read_from_disk(&self) -> Result<BTreeMap<u64, RecordMetrics>, HistoryError> {
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes).map_err(HistoryError::Parse)
    }

    /// Record a finished session. The record is kept in memory even when the
    /// write fails; `HistoryError::into_record` hands it back in that case.
    pub fn append(&mut self, result: &SessionResult) -> Result<HistoryRecord, HistoryError> {
        let id = self.next_id();
        let record = HistoryRecord {
            id,
            metrics: RecordMetrics::from(result),
        };
        self.records.insert(id, record.metrics);

        match self.persist() {
            Ok(()) => {
                info!(id, wpm = record.metrics.wpm, "session saved to history");
                Ok(record)
            }
            Err(source) => Err(HistoryError::Persist { record, source }),
        }
    }

    fn next_id(&self) -> u64 {
        let last = self.records.keys().next_back().copied().unwrap_or(0);
        last.max(self.records.len() as u64) + 1
    }

    fn persist(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.records)?;
        fs::write(&self.path, data)
    }

    pub fn records(&self) -> &BTreeMap<u64, RecordMetrics> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Arithmetic mean of every field, all zero for an empty history
    pub fn aggregate(&self) -> HistorySummary {
        let avg = |metric: Metric| {
            let values: Vec<f64> = self
                .records
                .values()
                .map(|m| metric.of(m) as f64)
                .collect();
            mean(&values).unwrap_or(0.0)
        };

        HistorySummary {
            avg_wpm: avg(Metric::Wpm),
            avg_cpm: avg(Metric::Cpm),
            avg_accuracy: avg(Metric::Accuracy),
        }
    }

    /// `(id, value)` points in session order, for trend display
    pub fn series(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .map(|(id, m)| (*id as f64, metric.of(m) as f64))
            .collect()
    }

    /// The last `n` records, newest first
    pub fn recent(&self, n: usize) -> Vec<HistoryRecord> {
        self.records
            .iter()
            .rev()
            .take(n)
            .map(|(id, metrics)| HistoryRecord {
                id: *id,
                metrics: *metrics,
            })
            .collect()
    }
}
