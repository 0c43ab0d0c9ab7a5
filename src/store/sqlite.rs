//! SQLite-backed record store.
//!
//! One row per company in `company_info`. A row is pending while
//! `history_order_info` is NULL or empty; persisting an outcome fills it with
//! the serialized result or a diagnostic, so the row drops out of the pending
//! set for future passes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::domain::{ExtractionResult, Outcome, OutcomeKind, WorkItem};
use crate::error::{Result, ScoutError};
use crate::store::RecordStore;

/// A full `company_info` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub id: String,
    pub company_name: String,
    pub info_url: String,
    pub outcome_kind: Option<OutcomeKind>,
    pub history_order_info: Option<String>,
    pub raw_result: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl StoredRow {
    pub fn is_pending(&self) -> bool {
        self.history_order_info.as_deref().is_none_or(str::is_empty)
    }
}

/// Row counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub success: usize,
    pub parse_failure: usize,
    pub execution_failure: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.success + self.parse_failure + self.execution_failure
    }
}

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct ImportLine {
    company_name: String,
    #[serde(default)]
    info_url: String,
}

/// Record store over a SQLite database.
///
/// `rusqlite::Connection` isn't Sync, so it lives behind a Mutex; statements
/// are short and need exclusive access anyway. The orchestrator-facing
/// methods run on the blocking pool.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::with_connection(db)
    }

    /// Private in-memory database, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        Self::init_schema(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS company_info (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_name TEXT NOT NULL,
                info_url TEXT NOT NULL DEFAULT '',
                history_order_info TEXT,
                outcome_kind TEXT,
                raw_result TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_company_info_outcome ON company_info(outcome_kind);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        lock(&self.db)
    }

    /// Insert one company; returns its id.
    pub fn add_entity(&self, company_name: &str, info_url: &str) -> Result<String> {
        if company_name.trim().is_empty() {
            return Err(ScoutError::Config("company name must not be empty".to_string()));
        }
        let db = self.conn()?;
        db.execute(
            "INSERT INTO company_info (company_name, info_url, created_at) VALUES (?1, ?2, ?3)",
            params![company_name.trim(), info_url.trim(), Utc::now().to_rfc3339()],
        )?;
        Ok(db.last_insert_rowid().to_string())
    }

    /// Bulk insert `{"company_name": ..., "info_url": ...}` JSON lines.
    ///
    /// Malformed lines and blank names are skipped with a warning.
    pub fn import_jsonl(&self, path: &Path) -> Result<ImportReport> {
        let reader = BufReader::new(File::open(path)?);
        let mut report = ImportReport::default();
        let now = Utc::now().to_rfc3339();

        let mut db = self.conn()?;
        let tx = db.transaction()?;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: ImportLine = match serde_json::from_str(&line) {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping line {} of {}: {}", idx + 1, path.display(), e);
                    report.skipped += 1;
                    continue;
                }
            };
            if row.company_name.trim().is_empty() {
                log::warn!("Skipping line {} of {}: empty company_name", idx + 1, path.display());
                report.skipped += 1;
                continue;
            }
            tx.execute(
                "INSERT INTO company_info (company_name, info_url, created_at) VALUES (?1, ?2, ?3)",
                params![row.company_name.trim(), row.info_url.trim(), now],
            )?;
            report.inserted += 1;
        }
        tx.commit()?;

        log::info!(
            "Imported {} companies from {} ({} skipped)",
            report.inserted,
            path.display(),
            report.skipped
        );
        Ok(report)
    }

    /// Get a row by id.
    pub fn get(&self, id: &str) -> Result<Option<StoredRow>> {
        let Ok(rowid) = id.parse::<i64>() else {
            return Ok(None);
        };
        let db = self.conn()?;
        let row = db
            .query_row(
                r#"
                SELECT id, company_name, info_url, outcome_kind, history_order_info,
                       raw_result, created_at, updated_at
                FROM company_info WHERE id = ?1
                "#,
                [rowid],
                |row| {
                    let kind: Option<String> = row.get(3)?;
                    Ok(StoredRow {
                        id: row.get::<_, i64>(0)?.to_string(),
                        company_name: row.get(1)?,
                        info_url: row.get(2)?,
                        outcome_kind: kind.and_then(|k| k.parse().ok()),
                        history_order_info: row.get(4)?,
                        raw_result: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Counts of pending rows and of each recorded outcome.
    pub fn status_counts(&self) -> Result<StatusCounts> {
        let db = self.conn()?;
        let mut counts = StatusCounts::default();

        let mut stmt = db.prepare(
            r#"
            SELECT CASE
                     WHEN history_order_info IS NULL OR history_order_info = '' THEN 'pending'
                     ELSE COALESCE(outcome_kind, 'success')
                   END AS state,
                   COUNT(*)
            FROM company_info
            GROUP BY state
            "#,
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        for row in rows {
            let (state, count) = row?;
            let count = usize::try_from(count).map_err(|_| ScoutError::StoreUnavailable(format!("invalid row count {}", count)))?;
            match state.as_str() {
                "pending" => counts.pending += count,
                "parse_failure" => counts.parse_failure += count,
                "execution_failure" => counts.execution_failure += count,
                _ => counts.success += count,
            }
        }
        Ok(counts)
    }

    /// Clear the outcome of one row so the next pass picks it up again.
    pub fn reset(&self, id: &str) -> Result<()> {
        let rowid = id.parse::<i64>().map_err(|_| ScoutError::ItemNotFound(id.to_string()))?;
        let db = self.conn()?;
        let changed = db.execute(
            "UPDATE company_info SET history_order_info = NULL, outcome_kind = NULL, raw_result = NULL, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), rowid],
        )?;
        if changed == 0 {
            return Err(ScoutError::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Clear every failed outcome; returns how many rows became pending.
    pub fn reset_failed(&self) -> Result<usize> {
        let db = self.conn()?;
        let changed = db.execute(
            r#"
            UPDATE company_info
            SET history_order_info = NULL, outcome_kind = NULL, raw_result = NULL, updated_at = ?1
            WHERE outcome_kind IN ('parse_failure', 'execution_failure')
            "#,
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(changed)
    }

    /// All successfully extracted results, in id order.
    pub fn successful_results(&self) -> Result<Vec<ExtractionResult>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT id, history_order_info FROM company_info WHERE outcome_kind = 'success' ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, json) = row?;
            match serde_json::from_str::<ExtractionResult>(&json) {
                Ok(result) => results.push(result),
                Err(e) => log::warn!("Row {} has an unreadable success payload: {}", id, e),
            }
        }
        Ok(results)
    }
}

fn lock(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|e| ScoutError::StoreUnavailable(format!("connection lock poisoned: {}", e)))
}

fn fetch_pending_rows(db: &Mutex<Connection>, limit: usize) -> Result<Vec<WorkItem>> {
    let limit = i64::try_from(limit).map_err(|_| ScoutError::Config(format!("batch limit {} is too large", limit)))?;
    let db = lock(db)?;
    let mut stmt = db
        .prepare(
            r#"
            SELECT id, company_name, info_url FROM company_info
            WHERE (history_order_info IS NULL OR history_order_info = '')
              AND TRIM(company_name) <> ''
            ORDER BY id
            LIMIT ?1
            "#,
        )
        .map_err(|e| ScoutError::StoreUnavailable(e.to_string()))?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(WorkItem {
                id: row.get::<_, i64>(0)?.to_string(),
                entity_name: row.get(1)?,
                source_reference: row.get(2)?,
            })
        })
        .map_err(|e| ScoutError::StoreUnavailable(e.to_string()))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ScoutError::StoreUnavailable(e.to_string()))
}

fn write_outcome(db: &Mutex<Connection>, id: &str, outcome: &Outcome) -> Result<()> {
    let rowid = id
        .parse::<i64>()
        .map_err(|_| ScoutError::store_write(id, "id is not a company_info row id"))?;
    let payload = outcome
        .payload()
        .map_err(|e| ScoutError::store_write(id, format!("cannot serialize outcome: {}", e)))?;

    let db = lock(db).map_err(|e| ScoutError::store_write(id, e.to_string()))?;
    let changed = db
        .execute(
            r#"
            UPDATE company_info
            SET history_order_info = ?1, outcome_kind = ?2, raw_result = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
            params![
                payload,
                outcome.kind().as_str(),
                outcome.raw(),
                Utc::now().to_rfc3339(),
                rowid
            ],
        )
        .map_err(|e| ScoutError::store_write(id, e.to_string()))?;

    if changed == 0 {
        return Err(ScoutError::store_write(id, "no such row"));
    }
    log::debug!("Updated company_id {} with {} outcome", id, outcome.kind());
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<WorkItem>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || fetch_pending_rows(&db, limit))
            .await
            .map_err(|e| ScoutError::StoreUnavailable(format!("fetch task failed: {}", e)))?
    }

    async fn persist_outcome(&self, id: &str, outcome: &Outcome) -> Result<()> {
        let db = self.db.clone();
        let row_id = id.to_string();
        let outcome = outcome.clone();
        tokio::task::spawn_blocking(move || write_outcome(&db, &row_id, &outcome))
            .await
            .map_err(|e| ScoutError::store_write(id, format!("write task failed: {}", e)))?
    }
}
