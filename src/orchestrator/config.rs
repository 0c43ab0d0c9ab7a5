//! Orchestrator settings.
//!
//! Every value is supplied by the caller; nothing here has a default. The
//! config-file layer (`crate::config`) is where defaults live.

use std::time::Duration;

use crate::error::{Result, ScoutError};

/// Bounded-attempt retry for outcome writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// One attempt, no retry.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Configuration for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Concurrency ceiling K: most tasks running at once
    pub concurrency: usize,
    /// Most items fetched per pass
    pub batch_limit: usize,
    /// Ceiling on one agent invocation
    pub task_timeout: Duration,
    /// Retry policy for outcome writes
    pub store_retry: RetryPolicy,
}

impl OrchestratorConfig {
    pub fn new(concurrency: usize, batch_limit: usize, task_timeout: Duration, store_retry: RetryPolicy) -> Self {
        Self {
            concurrency,
            batch_limit,
            task_timeout,
            store_retry,
        }
    }

    /// Reject values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScoutError::Config("concurrency must be at least 1".to_string()));
        }
        if self.concurrency > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(ScoutError::Config(format!(
                "concurrency {} exceeds the maximum of {}",
                self.concurrency,
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        if self.batch_limit == 0 {
            return Err(ScoutError::Config("batch limit must be at least 1".to_string()));
        }
        if self.task_timeout.is_zero() {
            return Err(ScoutError::Config("task timeout must be greater than zero".to_string()));
        }
        if self.store_retry.attempts == 0 {
            return Err(ScoutError::Config("store write attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
