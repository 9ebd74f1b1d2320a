//! Monotonic mark/measure store.
//!
//! Times are milliseconds relative to the store's origin, the way a page's
//! performance timeline reports them.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error("No mark named '{0}' has been recorded")]
    UnknownMark(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Mark,
    Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub name: String,
    pub entry_type: EntryType,
    pub start_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone)]
pub struct Performance {
    origin: Instant,
    marks: Arc<RwLock<HashMap<String, f64>>>,
    entries: Arc<RwLock<Vec<PerformanceEntry>>>,
}

impl Performance {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            marks: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    /// Records a mark at the current time. Re-marking a name moves the
    /// reference point used by later measures.
    pub fn mark(&self, name: &str) -> PerformanceEntry {
        let start_time = self.now();
        self.marks.write().insert(name.to_string(), start_time);
        let entry = PerformanceEntry {
            name: name.to_string(),
            entry_type: EntryType::Mark,
            start_time,
            duration: 0.0,
        };
        self.entries.write().push(entry.clone());
        entry
    }

    /// Records a measure spanning from `start_mark` to now.
    pub fn measure(&self, name: &str, start_mark: &str) -> Result<PerformanceEntry, TimingError> {
        let end = self.now();
        let start_time = self
            .marks
            .read()
            .get(start_mark)
            .copied()
            .ok_or_else(|| TimingError::UnknownMark(start_mark.to_string()))?;
        let entry = PerformanceEntry {
            name: name.to_string(),
            entry_type: EntryType::Measure,
            start_time,
            duration: end - start_time,
        };
        tracing::debug!("measure '{}' took {:.3}ms", name, entry.duration);
        self.entries.write().push(entry.clone());
        Ok(entry)
    }

    pub fn entries_by_type(&self, entry_type: EntryType) -> Vec<PerformanceEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.marks.write().clear();
        self.entries.write().clear();
    }
}

impl Default for Performance {
    fn default() -> Self {
        Self::new()
    }
}
