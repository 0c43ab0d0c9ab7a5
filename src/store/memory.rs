//! In-process record store.
//!
//! Holds items and outcomes in memory and counts every write, so tests can
//! check the one-outcome-per-item invariant. Faults can be injected: the
//! store can be made unavailable, and writes for an id can be made to fail a
//! given number of times.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{Outcome, WorkItem};
use crate::error::{Result, ScoutError};
use crate::store::RecordStore;

#[derive(Debug, Default)]
struct Inner {
    items: Vec<WorkItem>,
    outcomes: HashMap<String, Outcome>,
    writes: HashMap<String, usize>,
    failing_writes: HashMap<String, usize>,
    unavailable: bool,
}

/// Record store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with the given items.
    pub fn with_items(items: impl IntoIterator<Item = WorkItem>) -> Self {
        let store = Self::new();
        for item in items {
            store.add(item);
        }
        store
    }

    /// A scratch copy of another store's pending items.
    ///
    /// Outcomes written to the copy never reach `source`.
    pub async fn from_pending<S: RecordStore + ?Sized>(source: &S, limit: usize) -> Result<Self> {
        Ok(Self::with_items(source.fetch_pending(limit).await?))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add an item; an item with an existing id replaces it.
    pub fn add(&self, item: WorkItem) {
        let mut inner = self.lock();
        match inner.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => inner.items.push(item),
        }
    }

    /// Make `fetch_pending` fail with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make the next `count` writes for `id` fail.
    pub fn fail_next_writes(&self, id: impl Into<String>, count: usize) {
        self.lock().failing_writes.insert(id.into(), count);
    }

    pub fn outcome(&self, id: &str) -> Option<Outcome> {
        self.lock().outcomes.get(id).cloned()
    }

    pub fn outcomes(&self) -> HashMap<String, Outcome> {
        self.lock().outcomes.clone()
    }

    /// Successful writes recorded for `id`.
    pub fn write_count(&self, id: &str) -> usize {
        self.lock().writes.get(id).copied().unwrap_or(0)
    }

    /// Successful writes across all ids.
    pub fn total_writes(&self) -> usize {
        self.lock().writes.values().sum()
    }

    pub fn pending_count(&self) -> usize {
        let inner = self.lock();
        inner.items.iter().filter(|i| !inner.outcomes.contains_key(&i.id)).count()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<WorkItem>> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(ScoutError::StoreUnavailable("memory store marked unavailable".to_string()));
        }

        let mut seen = HashSet::new();
        Ok(inner
            .items
            .iter()
            .filter(|item| !inner.outcomes.contains_key(&item.id))
            .filter(|item| seen.insert(item.id.clone()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn persist_outcome(&self, id: &str, outcome: &Outcome) -> Result<()> {
        let mut inner = self.lock();

        if let Some(remaining) = inner.failing_writes.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScoutError::store_write(id, "injected write failure"));
            }
        }

        if !inner.items.iter().any(|item| item.id == id) {
            return Err(ScoutError::store_write(id, "no such item"));
        }

        inner.outcomes.insert(id.to_string(), outcome.clone());
        *inner.writes.entry(id.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionFailure, ExtractionResult, ParseFailure};

    fn items(n: usize) -> Vec<WorkItem> {
        (0..n)
            .map(|i| WorkItem::new(i.to_string(), format!("COMPANY {}", i), format!("https://x/{}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_pending_limit() {
        let store = MemoryStore::with_items(items(5));
        assert_eq!(store.fetch_pending(3).await.unwrap().len(), 3);
        assert_eq!(store.fetch_pending(10).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_skips_items_with_outcome() {
        let store = MemoryStore::with_items(items(3));
        store
            .persist_outcome("1", &Outcome::ExecutionFailure(ExecutionFailure::Agent("x".into())))
            .await
            .unwrap();

        let ids: Vec<_> = store.fetch_pending(10).await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["0", "2"]);
        assert_eq!(store.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_add_replaces_same_id() {
        let store = MemoryStore::with_items(items(2));
        store.add(WorkItem::new("1", "RENAMED", "u"));
        let pending = store.fetch_pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].entity_name, "RENAMED");
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::with_items(items(1));
        store.set_unavailable(true);
        assert!(matches!(store.fetch_pending(1).await, Err(ScoutError::StoreUnavailable(_))));
        store.set_unavailable(false);
        assert!(store.fetch_pending(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_persist_twice_keeps_latest() {
        let store = MemoryStore::with_items(items(1));
        store
            .persist_outcome("0", &Outcome::ParseFailure(ParseFailure::new("a", "b")))
            .await
            .unwrap();
        let latest = Outcome::Success(ExtractionResult::new("COMPANY 0", "https://x/0", vec![]));
        store.persist_outcome("0", &latest).await.unwrap();

        assert_eq!(store.outcome("0"), Some(latest));
        assert_eq!(store.outcomes().len(), 1);
        assert_eq!(store.write_count("0"), 2);
    }

    #[tokio::test]
    async fn test_injected_write_failures() {
        let store = MemoryStore::with_items(items(1));
        store.fail_next_writes("0", 1);
        let outcome = Outcome::ExecutionFailure(ExecutionFailure::Agent("x".into()));

        assert!(store.persist_outcome("0", &outcome).await.is_err());
        assert!(store.persist_outcome("0", &outcome).await.is_ok());
        assert_eq!(store.write_count("0"), 1);
        assert_eq!(store.total_writes(), 1);
    }

    #[tokio::test]
    async fn test_persist_unknown_id() {
        let store = MemoryStore::new();
        let outcome = Outcome::ExecutionFailure(ExecutionFailure::Agent("x".into()));
        assert!(matches!(
            store.persist_outcome("nope", &outcome).await,
            Err(ScoutError::StoreWrite { .. })
        ));
    }
}
