//! Per-item outcome types.
//!
//! Every admitted work item ends a pass with exactly one `Outcome`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::record::ExtractionResult;

/// Agent returned data that does not fit the output schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ParseFailure {
    /// Payload exactly as the agent returned it
    pub raw: String,
    /// Human-readable diagnostic
    pub detail: String,
}

impl ParseFailure {
    pub fn new(raw: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            detail: detail.into(),
        }
    }
}

/// The agent invocation itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    #[error("agent timed out after {0:?}")]
    Timeout(Duration),

    #[error("agent execution failed: {0}")]
    Agent(String),

    #[error("agent panicked: {0}")]
    Panicked(String),
}

impl ExecutionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionFailure::Timeout(_))
    }
}

/// Final classification of one work item in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ExtractionResult),
    ParseFailure(ParseFailure),
    ExecutionFailure(ExecutionFailure),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::ParseFailure(_) => OutcomeKind::ParseFailure,
            Outcome::ExecutionFailure(_) => OutcomeKind::ExecutionFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The value written to the store's outcome column.
    ///
    /// Success is the serialized `ExtractionResult`; failures are diagnostics.
    pub fn payload(&self) -> serde_json::Result<String> {
        match self {
            Outcome::Success(result) => serde_json::to_string(result),
            Outcome::ParseFailure(failure) => Ok(format!("Error parsing result: {}", failure.detail)),
            Outcome::ExecutionFailure(failure) => Ok(format!("Error running agent: {}", failure)),
        }
    }

    /// Raw agent payload retained for diagnosis (parse failures only).
    pub fn raw(&self) -> Option<&str> {
        match self {
            Outcome::ParseFailure(failure) => Some(&failure.raw),
            _ => None,
        }
    }
}

impl From<ExtractionResult> for Outcome {
    fn from(result: ExtractionResult) -> Self {
        Outcome::Success(result)
    }
}

impl From<ParseFailure> for Outcome {
    fn from(failure: ParseFailure) -> Self {
        Outcome::ParseFailure(failure)
    }
}

impl From<ExecutionFailure> for Outcome {
    fn from(failure: ExecutionFailure) -> Self {
        Outcome::ExecutionFailure(failure)
    }
}

/// Outcome discriminator as stored in the `outcome_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ParseFailure,
    ExecutionFailure,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::ParseFailure => "parse_failure",
            OutcomeKind::ExecutionFailure => "execution_failure",
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, OutcomeKind::Success)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for OutcomeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(OutcomeKind::Success),
            "parse_failure" => Ok(OutcomeKind::ParseFailure),
            "execution_failure" => Ok(OutcomeKind::ExecutionFailure),
            other => Err(format!("unknown outcome kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::SubRecord;

    #[test]
    fn test_outcome_kind_round_trip() {
        for kind in [OutcomeKind::Success, OutcomeKind::ParseFailure, OutcomeKind::ExecutionFailure] {
            assert_eq!(kind.as_str().parse::<OutcomeKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<OutcomeKind>().is_err());
    }

    #[test]
    fn test_success_payload_is_serialized_result() {
        let result = ExtractionResult::new("ACME", "https://x", vec![SubRecord::new().with_amount(1.5)]);
        let outcome = Outcome::from(result.clone());

        assert_eq!(outcome.kind(), OutcomeKind::Success);
        let payload = outcome.payload().unwrap();
        let back: ExtractionResult = serde_json::from_str(&payload).unwrap();
        assert_eq!(back, result);
        assert!(outcome.raw().is_none());
    }

    #[test]
    fn test_parse_failure_keeps_raw() {
        let outcome = Outcome::from(ParseFailure::new("not json", "expected a JSON object"));
        assert_eq!(outcome.kind(), OutcomeKind::ParseFailure);
        assert_eq!(outcome.raw(), Some("not json"));
        assert_eq!(outcome.payload().unwrap(), "Error parsing result: expected a JSON object");
    }

    #[test]
    fn test_execution_failure_payload() {
        let outcome = Outcome::from(ExecutionFailure::Timeout(Duration::from_secs(5)));
        assert_eq!(outcome.kind(), OutcomeKind::ExecutionFailure);
        assert_eq!(outcome.payload().unwrap(), "Error running agent: agent timed out after 5s");
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_execution_failure_is_timeout() {
        assert!(ExecutionFailure::Timeout(Duration::from_millis(1)).is_timeout());
        assert!(!ExecutionFailure::Agent("boom".into()).is_timeout());
        assert!(!ExecutionFailure::Panicked("boom".into()).is_timeout());
    }

    #[test]
    fn test_kind_is_failure() {
        assert!(!OutcomeKind::Success.is_failure());
        assert!(OutcomeKind::ParseFailure.is_failure());
        assert!(OutcomeKind::ExecutionFailure.is_failure());
    }
}
