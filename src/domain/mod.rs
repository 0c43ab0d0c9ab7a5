//! Domain types for orderscout
//!
//! - WorkItem: one entity pending extraction
//! - SubRecord / ExtractionResult: validated extraction output
//! - Outcome: the single per-item result of a pass
//! - ItemState: per-item lifecycle inside the orchestrator

pub mod outcome;
pub mod record;
pub mod state;
pub mod work_item;

pub use outcome::{ExecutionFailure, Outcome, OutcomeKind, ParseFailure};
pub use record::{ExtractionResult, SubRecord};
pub use state::ItemState;
pub use work_item::WorkItem;
