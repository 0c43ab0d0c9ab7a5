//! Per-item reports and the end-of-pass summary.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::domain::OutcomeKind;

/// What happened to one item in a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: String,
    pub entity_name: String,
    pub kind: OutcomeKind,
    /// Whether the outcome reached the store
    pub persisted: bool,
    /// Store writes attempted for this item
    pub write_attempts: u32,
}

/// Counts for one orchestration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Items returned by the store
    pub fetched: usize,
    /// Repeated ids dropped before admission
    pub duplicates_dropped: usize,
    /// Items without a company name, never dispatched
    pub invalid_dropped: usize,
    /// Items that got a pool slot
    pub admitted: usize,
    /// Items left pending because the pass was stopped
    pub not_admitted: usize,
    pub succeeded: usize,
    pub parse_failed: usize,
    pub execution_failed: usize,
    /// Outcomes computed but never written
    pub persist_failed: usize,
    /// Item tasks that died before reporting
    pub aborted: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl PassSummary {
    pub fn record(&mut self, report: &ItemReport) {
        match report.kind {
            OutcomeKind::Success => self.succeeded += 1,
            OutcomeKind::ParseFailure => self.parse_failed += 1,
            OutcomeKind::ExecutionFailure => self.execution_failed += 1,
        }
        if !report.persisted {
            self.persist_failed += 1;
        }
    }

    /// Outcomes computed this pass.
    pub fn processed(&self) -> usize {
        self.succeeded + self.parse_failed + self.execution_failed
    }

    pub fn failed(&self) -> usize {
        self.parse_failed + self.execution_failed
    }

    /// Every admitted item produced an outcome and every outcome was written.
    pub fn is_complete(&self) -> bool {
        self.processed() == self.admitted && self.persist_failed == 0 && self.aborted == 0
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {} of {} item(s) in {:.1}s: {} succeeded, {} parse failure(s), {} execution failure(s)",
            self.processed(),
            self.fetched,
            self.elapsed.as_secs_f64(),
            self.succeeded,
            self.parse_failed,
            self.execution_failed
        )?;
        if self.persist_failed > 0 {
            write!(f, ", {} not persisted", self.persist_failed)?;
        }
        if self.not_admitted > 0 {
            write!(f, ", {} not admitted", self.not_admitted)?;
        }
        if self.duplicates_dropped > 0 {
            write!(f, ", {} duplicate(s) dropped", self.duplicates_dropped)?;
        }
        if self.invalid_dropped > 0 {
            write!(f, ", {} without a name skipped", self.invalid_dropped)?;
        }
        if self.aborted > 0 {
            write!(f, ", {} aborted", self.aborted)?;
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
