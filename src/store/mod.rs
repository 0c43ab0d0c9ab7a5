//! Record store layer for orderscout.
//!
//! The orchestrator only sees the `RecordStore` trait: fetch the pending set,
//! persist one outcome per item. Two implementations:
//! - **SqliteStore**: the `company_info` table, used by the binary
//! - **MemoryStore**: in-process store with fault injection, used by tests
//!
//! # Example
//!
//! ```ignore
//! use orderscout::store::{RecordStore, SqliteStore};
//!
//! let store = SqliteStore::open(Path::new("orderscout.db"))?;
//! store.add_entity("ABID TRADING", "https://crm.example.com/d/1")?;
//! let pending = store.fetch_pending(100).await?;
//! ```

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::domain::{Outcome, WorkItem};
use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::{ImportReport, SqliteStore, StatusCounts, StoredRow};

/// Store boundary used by the orchestrator.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Items with no recorded outcome, at most `limit`, no duplicates.
    ///
    /// Fails with `ScoutError::StoreUnavailable` when the store cannot be read.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<WorkItem>>;

    /// Record the outcome for an item, replacing any earlier one.
    ///
    /// Fails with `ScoutError::StoreWrite`.
    async fn persist_outcome(&self, id: &str, outcome: &Outcome) -> Result<()>;
}
