//! JSON-lines persistence for predicates asserted during a run.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use bt_core::{PredicateRecord, PredicateSink, SinkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the predicate log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPredicate {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: PredicateRecord,
}

/// Appends every accepted predicate to a `.jsonl` file.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back the last `limit` entries. Unreadable lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<PersistedPredicate> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let mut entries: Vec<PersistedPredicate> = BufReader::new(file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if entries.len() > limit {
            entries.drain(0..entries.len() - limit);
        }
        entries
    }
}

impl PredicateSink for JsonlSink {
    fn persist(&mut self, record: &PredicateRecord) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let entry = PersistedPredicate {
            timestamp: Utc::now(),
            record: record.clone(),
        };
        let line = serde_json::to_string(&entry).map_err(|e| SinkError::Other(e.to_string()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
