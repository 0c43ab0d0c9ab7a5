//! One orchestration pass: fetch, admit under the pool ceiling, run, persist.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::agent::AutomationAgent;
use crate::domain::{ItemState, Outcome, WorkItem};
use crate::error::Result;
use crate::orchestrator::config::{OrchestratorConfig, RetryPolicy};
use crate::orchestrator::retry::persist_with_retry;
use crate::orchestrator::stats::{ItemReport, PassSummary};
use crate::store::RecordStore;
use crate::task::ExtractionTask;
use crate::validation::validate;

/// Cloneable handle that stops admission of new items.
///
/// Items already admitted run to completion and are persisted.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        if !self.tx.send_replace(true) {
            log::info!("Stop requested; no further items will be admitted");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Stop admission on the first interrupt and return on the second.
    ///
    /// An interrupt source that fails is treated as one that never fires.
    pub async fn stop_on_interrupts<F, Fut>(&self, mut interrupt: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::io::Result<()>>,
    {
        if let Err(e) = interrupt().await {
            log::warn!("Cannot listen for interrupts: {}", e);
            return std::future::pending().await;
        }
        self.stop();
        if interrupt().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Drives passes over a record store with a bounded worker pool.
pub struct Orchestrator<S: RecordStore + ?Sized, A: AutomationAgent + ?Sized> {
    store: Arc<S>,
    task: Arc<ExtractionTask<A>>,
    config: OrchestratorConfig,
    slots: Arc<Semaphore>,
    stop: Arc<watch::Sender<bool>>,
}

impl<S, A> Orchestrator<S, A>
where
    S: RecordStore + ?Sized + 'static,
    A: AutomationAgent + ?Sized + 'static,
{
    /// Build an orchestrator; fails on an invalid config.
    pub fn new(store: Arc<S>, agent: Arc<A>, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let (stop, _) = watch::channel(false);
        Ok(Self {
            store,
            task: Arc::new(ExtractionTask::new(agent, config.task_timeout)),
            slots: Arc::new(Semaphore::new(config.concurrency)),
            config,
            stop: Arc::new(stop),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { tx: self.stop.clone() }
    }

    /// Tasks currently holding a pool slot.
    pub fn running(&self) -> usize {
        self.config.concurrency - self.slots.available_permits()
    }

    /// Run one pass to completion.
    ///
    /// Only a failed fetch aborts the pass. Agent failures, malformed results
    /// and failed writes are per-item and show up in the summary.
    pub async fn run_pass(&self) -> Result<PassSummary> {
        let started = Instant::now();
        let fetched = self.store.fetch_pending(self.config.batch_limit).await?;

        let mut summary = PassSummary {
            fetched: fetched.len(),
            ..Default::default()
        };

        let mut seen = HashSet::new();
        let unique: Vec<WorkItem> = fetched.into_iter().filter(|item| seen.insert(item.id.clone())).collect();
        summary.duplicates_dropped = summary.fetched - unique.len();
        if summary.duplicates_dropped > 0 {
            log::warn!("Dropped {} duplicate item(s) from fetch", summary.duplicates_dropped);
        }

        let (items, invalid): (Vec<WorkItem>, Vec<WorkItem>) = unique.into_iter().partition(WorkItem::is_valid);
        summary.invalid_dropped = invalid.len();
        for item in &invalid {
            log::warn!("Skipping company_id '{}': no company name", item.id);
        }

        if items.is_empty() {
            log::info!("No pending items");
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        log::info!(
            "Processing {} item(s) with concurrency {} and timeout {:?}",
            items.len(),
            self.config.concurrency,
            self.config.task_timeout
        );

        let mut stop_rx = self.stop.subscribe();
        let mut tasks = JoinSet::new();
        let total = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let stopped = *stop_rx.borrow();
            let permit = if stopped {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = wait_stopped(&mut stop_rx) => None,
                    permit = self.slots.clone().acquire_owned() => permit.ok(),
                }
            };

            let Some(permit) = permit else {
                summary.not_admitted = total - index;
                log::info!("Pass stopped; {} item(s) left pending", summary.not_admitted);
                break;
            };

            summary.admitted += 1;
            let store = self.store.clone();
            let task = self.task.clone();
            let retry = self.config.store_retry;
            tasks.spawn(process_item(store, task, retry, item, permit));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => summary.record(&report),
                Err(e) => {
                    log::error!("Item task aborted: {}", e);
                    summary.aborted += 1;
                }
            }
        }

        summary.elapsed = started.elapsed();
        log::info!("Pass complete: {}", summary);
        Ok(summary)
    }
}

/// Resolves once the stop flag is set. Pends forever if the sender is gone.
async fn wait_stopped(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Move `state` to `next`, logging the transition.
fn advance(item: &WorkItem, state: &mut ItemState, next: ItemState) {
    if !state.can_transition_to(next) {
        log::warn!("company_id {}: unexpected transition {} -> {}", item.id, state, next);
    }
    *state = next;
    tracing::debug!(company_id = %item.id, company = %item.entity_name, state = %next, "item state");
}

/// Run, classify and persist one admitted item.
///
/// The pool slot is released as soon as the outcome is known, before the
/// store write and any retries.
async fn process_item<S, A>(
    store: Arc<S>,
    task: Arc<ExtractionTask<A>>,
    retry: RetryPolicy,
    item: WorkItem,
    permit: OwnedSemaphorePermit,
) -> ItemReport
where
    S: RecordStore + ?Sized,
    A: AutomationAgent + ?Sized,
{
    let mut state = ItemState::Pending;
    advance(&item, &mut state, ItemState::Admitted);
    advance(&item, &mut state, ItemState::Running);

    let outcome = match task.run(&item).await {
        Ok(raw) => match validate(&raw, &item.entity_name) {
            Ok(result) => Outcome::Success(result),
            Err(failure) => Outcome::ParseFailure(failure),
        },
        Err(failure) => Outcome::ExecutionFailure(failure),
    };
    drop(permit);

    let kind = outcome.kind();
    advance(&item, &mut state, ItemState::from_outcome(kind));
    match &outcome {
        Outcome::Success(result) if result.is_empty() => {
            log::info!("company_id {} ({}): no order history found", item.id, item.entity_name)
        }
        Outcome::Success(result) => log::info!(
            "company_id {} ({}): {} order record(s), {:.2} USD total",
            item.id,
            item.entity_name,
            result.records.len(),
            result.total_amount()
        ),
        Outcome::ParseFailure(failure) => {
            log::warn!("company_id {} ({}): unparseable result: {}", item.id, item.entity_name, failure)
        }
        Outcome::ExecutionFailure(failure) => {
            log::warn!("company_id {} ({}): {}", item.id, item.entity_name, failure)
        }
    }

    let (persisted, write_attempts) = match persist_with_retry(store.as_ref(), &retry, &item.id, &outcome).await {
        Ok(attempts) => (true, attempts),
        Err(e) => {
            log::error!("Outcome for company_id {} was not persisted: {}", item.id, e);
            (false, retry.attempts)
        }
    };
    advance(&item, &mut state, ItemState::Persisted);
    tracing::info!(
        company_id = %item.id,
        outcome = kind.as_str(),
        persisted,
        write_attempts,
        "item finished"
    );

    ItemReport {
        id: item.id,
        entity_name: item.entity_name,
        kind,
        persisted,
        write_attempts,
    }
}
