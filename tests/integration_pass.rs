//! Orchestration pass integration tests
//!
//! Runs full passes against the in-memory store with a scripted agent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use orderscout::agent::{MockAgent, MockBehavior, RawResult};
use orderscout::domain::{ExecutionFailure, Outcome, OutcomeKind, WorkItem};
use orderscout::error::ScoutError;
use orderscout::orchestrator::{Orchestrator, OrchestratorConfig, RetryPolicy};
use orderscout::store::{MemoryStore, RecordStore};
use serde_json::json;

/// Store that returns every pending item twice.
struct RepeatingStore {
    inner: MemoryStore,
}

#[async_trait::async_trait]
impl RecordStore for RepeatingStore {
    async fn fetch_pending(&self, limit: usize) -> orderscout::Result<Vec<WorkItem>> {
        let items = self.inner.fetch_pending(limit).await?;
        Ok(items.iter().chain(items.iter()).cloned().collect())
    }

    async fn persist_outcome(&self, id: &str, outcome: &Outcome) -> orderscout::Result<()> {
        self.inner.persist_outcome(id, outcome).await
    }
}

fn config(concurrency: usize, timeout: Duration) -> OrchestratorConfig {
    OrchestratorConfig::new(concurrency, 100, timeout, RetryPolicy::new(2, Duration::from_millis(10)))
}

fn companies(n: usize) -> Vec<WorkItem> {
    (1..=n)
        .map(|i| WorkItem::new(i.to_string(), format!("Company {}", i), format!("https://crm.example.com/d/{}", i)))
        .collect()
}

#[tokio::test]
async fn test_every_item_gets_exactly_one_outcome() {
    let store = Arc::new(MemoryStore::with_items(companies(12)));
    let agent = Arc::new(
        MockAgent::new()
            .with_script("Company 3", MockBehavior::Fail("browser crashed".into()))
            .with_script("Company 7", MockBehavior::Respond(RawResult::Text("{oops".into()))),
    );
    let orchestrator = Orchestrator::new(store.clone(), agent, config(4, Duration::from_secs(5))).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();

    assert_eq!(summary.fetched, 12);
    assert_eq!(summary.processed(), 12);
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.parse_failed, 1);
    assert_eq!(summary.execution_failed, 1);
    assert!(summary.is_complete());

    let outcomes = store.outcomes();
    assert_eq!(outcomes.len(), 12);
    for item in companies(12) {
        assert_eq!(store.write_count(&item.id), 1, "item {} written once", item.id);
    }
    assert_eq!(outcomes["3"].kind(), OutcomeKind::ExecutionFailure);
    assert_eq!(outcomes["7"].kind(), OutcomeKind::ParseFailure);
}

#[tokio::test]
async fn test_concurrency_ceiling_is_respected() {
    for k in [1, 5, 10] {
        let store = Arc::new(MemoryStore::with_items(companies(50)));
        let agent = Arc::new(MockAgent::new().with_latency(Duration::from_millis(10)));
        let orchestrator = Orchestrator::new(store.clone(), agent.clone(), config(k, Duration::from_secs(5))).unwrap();

        let summary = orchestrator.run_pass().await.unwrap();

        assert_eq!(summary.succeeded, 50);
        assert_eq!(agent.calls(), 50);
        assert!(
            agent.max_in_flight() <= k,
            "K={} but saw {} tasks at once",
            k,
            agent.max_in_flight()
        );
        assert_eq!(agent.in_flight(), 0);
        assert_eq!(store.total_writes(), 50);
    }
}

#[tokio::test]
async fn test_pool_is_filled_up_to_ceiling() {
    let store = Arc::new(MemoryStore::with_items(companies(20)));
    let agent = Arc::new(MockAgent::new().with_latency(Duration::from_millis(50)));
    let orchestrator = Orchestrator::new(store, agent.clone(), config(5, Duration::from_secs(5))).unwrap();

    orchestrator.run_pass().await.unwrap();

    assert_eq!(agent.max_in_flight(), 5);
}

#[tokio::test]
async fn test_timeout_releases_slot() {
    let store = Arc::new(MemoryStore::with_items(companies(2)));
    let agent = Arc::new(MockAgent::new().with_script("Company 1", MockBehavior::Hang));
    let orchestrator = Orchestrator::new(store.clone(), agent, config(1, Duration::from_millis(100))).unwrap();

    let started = Instant::now();
    let summary = orchestrator.run_pass().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(summary.execution_failed, 1);
    assert_eq!(summary.succeeded, 1);
    match store.outcome("1") {
        Some(Outcome::ExecutionFailure(failure)) => assert!(failure.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(store.outcome("2").unwrap().is_success());
}

#[tokio::test]
async fn test_mixed_results_end_to_end() {
    let store = Arc::new(MemoryStore::with_items([
        WorkItem::new("A", "Acme Valve Co", "https://crm.example.com/d/a"),
        WorkItem::new("B", "Bolt Works", "https://crm.example.com/d/b"),
        WorkItem::new("C", "Cobalt Pumps", "https://crm.example.com/d/c"),
    ]));
    let agent = Arc::new(
        MockAgent::new()
            .with_script(
                "Acme Valve Co",
                MockBehavior::Respond(RawResult::Structured(json!({
                    "company_name": "Acme Valve Co",
                    "info_url": "https://crm.example.com/d/a",
                    "order_history": [{
                        "arrival_time": "2019-03-16",
                        "hs_code": "84818050",
                        "product_description": "VALVE",
                        "amount_usd": 411.0
                    }]
                }))),
            )
            .with_script("Bolt Works", MockBehavior::Hang)
            .with_script(
                "Cobalt Pumps",
                MockBehavior::Respond(RawResult::Text("I could not find the table".into())),
            ),
    );
    let orchestrator = Orchestrator::new(store.clone(), agent, config(3, Duration::from_millis(200))).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.execution_failed, 1);
    assert_eq!(summary.parse_failed, 1);

    match store.outcome("A") {
        Some(Outcome::Success(result)) => {
            assert_eq!(result.entity_name, "Acme Valve Co");
            assert_eq!(result.records.len(), 1);
            let record = &result.records[0];
            assert_eq!(record.arrival_time.as_deref(), Some("2019-03-16"));
            assert_eq!(record.code.as_deref(), Some("84818050"));
            assert_eq!(record.description.as_deref(), Some("VALVE"));
            assert_eq!(record.amount, Some(411.0));
        }
        other => panic!("expected success for A, got {:?}", other),
    }

    assert!(matches!(
        store.outcome("B"),
        Some(Outcome::ExecutionFailure(ExecutionFailure::Timeout(_)))
    ));

    let c = store.outcome("C").unwrap();
    assert_eq!(c.kind(), OutcomeKind::ParseFailure);
    assert_eq!(c.raw(), Some("I could not find the table"));
}

#[tokio::test]
async fn test_store_unavailable_is_fatal() {
    let store = Arc::new(MemoryStore::with_items(companies(3)));
    store.set_unavailable(true);
    let agent = Arc::new(MockAgent::new());
    let orchestrator = Orchestrator::new(store.clone(), agent.clone(), config(2, Duration::from_secs(1))).unwrap();

    let err = orchestrator.run_pass().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(err, ScoutError::StoreUnavailable(_)));
    assert_eq!(agent.calls(), 0);
    assert_eq!(store.total_writes(), 0);
}

#[tokio::test]
async fn test_write_retry_recovers() {
    let store = Arc::new(MemoryStore::with_items(companies(3)));
    store.fail_next_writes("2", 1);
    let agent = Arc::new(MockAgent::new());
    let orchestrator = Orchestrator::new(store.clone(), agent, config(3, Duration::from_secs(1))).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(store.write_count("2"), 1);
    assert!(store.outcome("2").unwrap().is_success());
}

#[tokio::test]
async fn test_permanent_write_failure_leaves_item_pending() {
    let store = Arc::new(MemoryStore::with_items(companies(3)));
    store.fail_next_writes("2", 100);
    let agent = Arc::new(MockAgent::new());
    let orchestrator = Orchestrator::new(store.clone(), agent, config(3, Duration::from_secs(1))).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();

    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.persist_failed, 1);
    assert_eq!(store.pending_count(), 1);
    let pending = store.fetch_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "2");
}

#[tokio::test]
async fn test_stop_during_pass_leaves_rest_pending() {
    let store = Arc::new(MemoryStore::with_items(companies(10)));
    let agent = Arc::new(MockAgent::new().with_latency(Duration::from_millis(200)));
    let orchestrator = Orchestrator::new(store.clone(), agent.clone(), config(2, Duration::from_secs(5))).unwrap();

    let stop = orchestrator.stop_handle();
    let stopper = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.stop();
    };

    let (summary, ()) = tokio::join!(orchestrator.run_pass(), stopper);
    let summary = summary.unwrap();

    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.not_admitted, 8);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(agent.calls(), 2);
    assert_eq!(store.total_writes(), 2);
    assert_eq!(store.pending_count(), 8);
}

#[tokio::test]
async fn test_second_pass_finds_nothing() {
    let store = Arc::new(MemoryStore::with_items(companies(5)));
    let agent = Arc::new(MockAgent::new());
    let orchestrator = Orchestrator::new(store.clone(), agent.clone(), config(2, Duration::from_secs(1))).unwrap();

    orchestrator.run_pass().await.unwrap();
    let second = orchestrator.run_pass().await.unwrap();

    assert_eq!(second.fetched, 0);
    assert_eq!(agent.calls(), 5);
    assert_eq!(store.total_writes(), 5);
}

#[tokio::test]
async fn test_batch_limit_caps_fetch() {
    let store = Arc::new(MemoryStore::with_items(companies(10)));
    let agent = Arc::new(MockAgent::new());
    let mut cfg = config(3, Duration::from_secs(1));
    cfg.batch_limit = 4;
    let orchestrator = Orchestrator::new(store.clone(), agent, cfg).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();

    assert_eq!(summary.fetched, 4);
    assert_eq!(store.pending_count(), 6);
}

#[tokio::test]
async fn test_repeated_ids_run_once() {
    let store = Arc::new(RepeatingStore {
        inner: MemoryStore::with_items(companies(3)),
    });
    let agent = Arc::new(MockAgent::new());
    let orchestrator = Orchestrator::new(store.clone(), agent.clone(), config(3, Duration::from_secs(1))).unwrap();

    let summary = orchestrator.run_pass().await.unwrap();

    assert_eq!(summary.fetched, 6);
    assert_eq!(summary.duplicates_dropped, 3);
    assert_eq!(summary.admitted, 3);
    assert_eq!(agent.calls(), 3);
    for item in companies(3) {
        assert_eq!(store.inner.write_count(&item.id), 1);
    }
}
