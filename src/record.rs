//! Record types flowing between pipeline stages.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

/// One loosely-typed record as decoded from the model's JSON.
///
/// Not guaranteed to contain every schema field; may contain extraneous
/// fields; values may be strings, numbers, or null. The normaliser
/// ([`crate::pipeline::normalize`]) turns these into schema-complete records
/// before anything downstream touches them.
pub type RawRecord = Map<String, Value>;

/// One entry on the error trail: which document failed and why.
///
/// Created exactly once per document that fails after exhausting retries or
/// during normalisation/sink writes; never mixed into the tabular sink.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// Document identifier (file name).
    pub document: String,
    /// Human-readable failure description, original error text preserved.
    pub detail: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Local>,
}

impl ErrorRecord {
    pub fn new(document: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            detail: detail.into(),
            timestamp: Local::now(),
        }
    }

    /// Cells for the error sink, timestamp formatted for human readers.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.document.clone(),
            self.detail.clone(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
    }
}

/// Aggregate counters reported at the end of a batch run.
///
/// Owned and mutated only by the single-threaded batch driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Documents iterated (successes + failures).
    pub documents: usize,
    /// Documents whose pipeline completed, including zero-row documents.
    pub succeeded: usize,
    /// Documents diverted to the error trail.
    pub failed: usize,
    /// Total rows appended to the tabular sink.
    pub rows_written: usize,
}
