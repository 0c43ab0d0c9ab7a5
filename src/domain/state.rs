//! Per-item lifecycle within one pass.

use serde::{Deserialize, Serialize};

use crate::domain::outcome::OutcomeKind;

/// Lifecycle of a work item during a pass.
///
/// `Pending → Admitted → Running → {Succeeded | ParseFailed | ExecutionFailed} → Persisted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Fetched, waiting for a pool slot
    Pending,
    /// Holds a pool slot
    Admitted,
    /// Agent invocation in flight
    Running,
    Succeeded,
    ParseFailed,
    ExecutionFailed,
    /// Outcome write finished (written, or given up after retries)
    Persisted,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Admitted => "admitted",
            ItemState::Running => "running",
            ItemState::Succeeded => "succeeded",
            ItemState::ParseFailed => "parse_failed",
            ItemState::ExecutionFailed => "execution_failed",
            ItemState::Persisted => "persisted",
        }
    }

    /// State reached once an outcome of the given kind has been computed.
    pub fn from_outcome(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::Success => ItemState::Succeeded,
            OutcomeKind::ParseFailure => ItemState::ParseFailed,
            OutcomeKind::ExecutionFailure => ItemState::ExecutionFailed,
        }
    }

    pub fn can_transition_to(&self, next: ItemState) -> bool {
        use ItemState::*;
        matches!(
            (self, next),
            (Pending, Admitted)
                | (Admitted, Running)
                | (Running, Succeeded)
                | (Running, ParseFailed)
                | (Running, ExecutionFailed)
                | (Succeeded, Persisted)
                | (ParseFailed, Persisted)
                | (ExecutionFailed, Persisted)
        )
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
