use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::request::SearchMode;
use crate::traits::HistoryLog;

/// Summary of one completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub mode: SearchMode,
    pub query: String,
    pub ext: Option<String>,
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Appends one JSON object per line.
pub struct JsonLinesHistory {
    path: PathBuf,
}

impl JsonLinesHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryLog for JsonLinesHistory {
    fn record(&self, record: &HistoryRecord) {
        let line = match serde_json::to_string(record) {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "cannot serialize history record");
                return;
            }
        };
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = res {
            warn!(path = %self.path.display(), error = %e, "cannot append history");
        }
    }
}

/// Keeps records in memory, for front ends that show a session history.
#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl HistoryLog for MemoryHistory {
    fn record(&self, record: &HistoryRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
