//! Outcome writes with a bounded number of attempts.

use crate::domain::Outcome;
use crate::error::{Result, ScoutError};
use crate::orchestrator::config::RetryPolicy;
use crate::store::RecordStore;

/// Persist `outcome`, retrying failed writes with a fixed backoff.
///
/// Returns the number of attempts used, or the last write error once the
/// policy is exhausted.
pub async fn persist_with_retry<S: RecordStore + ?Sized>(
    store: &S,
    policy: &RetryPolicy,
    id: &str,
    outcome: &Outcome,
) -> Result<u32> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match store.persist_outcome(id, outcome).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt < policy.attempts => {
                log::warn!(
                    "Write for company_id {} failed (attempt {}/{}): {}; retrying in {:?}",
                    id,
                    attempt,
                    policy.attempts,
                    e,
                    policy.backoff
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => {
                log::error!(
                    "Giving up on company_id {} after {} attempt(s): {}",
                    id,
                    attempt,
                    e
                );
                return Err(match e {
                    ScoutError::StoreWrite { .. } => e,
                    other => ScoutError::store_write(id, other.to_string()),
                });
            }
        }
    }
}
