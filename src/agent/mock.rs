//! Scripted agent for tests and dry runs
//!
//! Behavior is chosen per entity by reading the `Company:` header line of the
//! instruction. Concurrency is tracked so tests can assert the pool ceiling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::agent::client::{AgentError, AutomationAgent, RawResult, SchemaDescriptor};
use crate::prompt::InstructionHeader;

/// What the mock does for one entity
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this payload
    Respond(RawResult),
    /// A valid result with an empty order history for the instructed entity
    EmptyHistory,
    /// Fail with an agent execution error
    Fail(String),
    /// Never finish (well past any sensible timeout)
    Hang,
    /// Panic inside the agent call
    Panic(String),
}

/// Decrements the in-flight counter however the call ends.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock automation agent
pub struct MockAgent {
    scripts: HashMap<String, MockBehavior>,
    default: MockBehavior,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    /// A mock that answers every entity with an empty history
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default: MockBehavior::EmptyHistory,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Script the behavior for one entity name
    pub fn with_script(mut self, entity_name: impl Into<String>, behavior: MockBehavior) -> Self {
        self.scripts.insert(entity_name.into(), behavior);
        self
    }

    /// Behavior for entities without a script
    pub fn with_default(mut self, behavior: MockBehavior) -> Self {
        self.default = behavior;
        self
    }

    /// Delay applied before every response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `execute` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls currently in progress
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, header: Option<&InstructionHeader>) -> &MockBehavior {
        header
            .and_then(|h| self.scripts.get(&h.entity_name))
            .unwrap_or(&self.default)
    }
}

#[async_trait]
impl AutomationAgent for MockAgent {
    async fn execute(&self, instruction: &str, _schema: &SchemaDescriptor) -> Result<RawResult, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let header = InstructionHeader::parse(instruction);
        let behavior = self.behavior_for(header.as_ref()).clone();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match behavior {
            MockBehavior::Respond(raw) => Ok(raw),
            MockBehavior::EmptyHistory => {
                let header = header.ok_or_else(|| AgentError::Execution("instruction has no company header".to_string()))?;
                Ok(RawResult::Structured(json!({
                    "company_name": header.entity_name,
                    "info_url": header.source_reference,
                    "order_history": []
                })))
            }
            MockBehavior::Fail(message) => Err(AgentError::Execution(message)),
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(AgentError::Execution("hang elapsed".to_string()))
            }
            MockBehavior::Panic(message) => panic!("{}", message),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
