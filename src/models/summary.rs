use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a record was excluded from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validation,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the delivered batch
    pub position: usize,
    pub crypto_id: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Per-record result inside one batch
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Loaded {
        snapshot_id: i32,
        snapshot_time: DateTime<Utc>,
    },
    SkippedDuplicate {
        snapshot_time: DateTime<Utc>,
    },
    Rejected {
        stage: FailureStage,
        reason: String,
    },
}

/// Counts reported for one ingestion batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: i32,
    pub source: String,
    pub declared: usize,
    pub loaded: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchSummary {
    pub fn new(batch_id: i32, source: &str, declared: usize) -> Self {
        Self {
            batch_id,
            source: source.to_string(),
            declared,
            loaded: 0,
            skipped_duplicate: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, position: usize, crypto_id: &str, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Loaded { .. } => self.loaded += 1,
            RecordOutcome::SkippedDuplicate { .. } => self.skipped_duplicate += 1,
            RecordOutcome::Rejected { stage, reason } => {
                self.failed += 1;
                self.failures.push(RecordFailure {
                    position,
                    crypto_id: crypto_id.to_string(),
                    stage,
                    reason,
                });
            }
        }
    }

    /// Records that reached a final classification
    pub fn processed(&self) -> usize {
        self.loaded + self.skipped_duplicate + self.failed
    }
}
