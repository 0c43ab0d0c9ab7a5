//! Bounded-concurrency orchestration of extraction tasks.
//!
//! A pass fetches pending items, admits each one to a pool of at most
//! `concurrency` slots, runs the extraction task under a timeout, classifies
//! the result, and writes exactly one outcome per admitted item.

mod config;
mod pass;
mod retry;
mod stats;

pub use config::{OrchestratorConfig, RetryPolicy};
pub use pass::{Orchestrator, StopHandle};
pub use retry::persist_with_retry;
pub use stats::{ItemReport, PassSummary};
