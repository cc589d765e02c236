//! Fire-and-forget persistence for newly asserted predicates.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A predicate with every symbol resolved, ready to hand to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredicateRecord {
    pub key: String,
    pub signature: String,
    pub name: String,
    pub negated: bool,
    pub params: Vec<(String, String)>,
}

/// Receives every predicate the blackboard accepts. Errors are logged by the caller and
/// otherwise ignored.
pub trait PredicateSink: Send + Sync {
    fn persist(&mut self, record: &PredicateRecord) -> Result<(), SinkError>;
}

/// Keeps records in memory. Clones share the same buffer, so a handle kept outside the
/// blackboard can inspect what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<PredicateRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PredicateRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PredicateSink for MemorySink {
    fn persist(&mut self, record: &PredicateRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}
