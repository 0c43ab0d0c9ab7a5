//! Extraction task: one work item, one agent invocation.
//!
//! The task never touches the store and never retries. It returns the agent's
//! raw payload untouched, or an `ExecutionFailure` when the call errors,
//! panics, or runs past the timeout.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::agent::{AutomationAgent, RawResult, SchemaDescriptor};
use crate::domain::{ExecutionFailure, WorkItem};
use crate::prompt::build_instruction;

pub struct ExtractionTask<A: AutomationAgent + ?Sized> {
    agent: Arc<A>,
    schema: SchemaDescriptor,
    timeout: Duration,
}

impl<A: AutomationAgent + ?Sized> ExtractionTask<A> {
    pub fn new(agent: Arc<A>, timeout: Duration) -> Self {
        Self {
            agent,
            schema: SchemaDescriptor::order_history(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Invoke the agent once for `item`.
    pub async fn run(&self, item: &WorkItem) -> Result<RawResult, ExecutionFailure> {
        let instruction = build_instruction(item, &self.schema);
        log::debug!(
            "Running {} agent for company_id {} ({})",
            self.agent.name(),
            item.id,
            item.entity_name
        );

        let call = AssertUnwindSafe(self.agent.execute(&instruction, &self.schema)).catch_unwind();

        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ExecutionFailure::Timeout(self.timeout)),
            Ok(Err(panic)) => Err(ExecutionFailure::Panicked(panic_message(panic.as_ref()))),
            Ok(Ok(Err(e))) => Err(ExecutionFailure::Agent(e.to_string())),
            Ok(Ok(Ok(raw))) => Ok(raw),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
