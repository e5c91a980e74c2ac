//! Bounded history of aggregate records backed by SQLite.
//!
//! Every operation runs while holding the store's single connection lock, and
//! an insert performs its trim inside the same immediate transaction. Readers
//! therefore never observe more than [`RETENTION_LIMIT`] records, and never a
//! new record alongside stale ones that should already have been trimmed.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, SubsecRound, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::{
    error::StoreError,
    record::{AggregateRecord, Distribution, Summary},
};

/// Number of most recent records the store keeps, and the number of records
/// history and report consumers ask for.
pub const RETENTION_LIMIT: usize = 5;

pub const IN_MEMORY_STORE: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "id, uploaded_at, source_name, total_count, avg_flow, \
     avg_pressure, avg_temperature, distribution";

pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Opens (creating if needed) the store at `path`; `:memory:` opens a
    /// private in-memory store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = if path == Path::new(IN_MEMORY_STORE) {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS aggregate_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uploaded_at TEXT NOT NULL,
                source_name TEXT NOT NULL,
                total_count INTEGER NOT NULL,
                avg_flow REAL NOT NULL,
                avg_pressure REAL NOT NULL,
                avg_temperature REAL NOT NULL,
                distribution TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Inserts `summary` and trims the store to the [`RETENTION_LIMIT`]
    /// highest ids as one atomic unit. Returns the record as stored.
    pub fn insert(&self, summary: Summary) -> Result<AggregateRecord, StoreError> {
        let distribution = serde_json::to_string(&summary.distribution).map_err(|err| {
            StoreError::Corrupt {
                id: 0,
                reason: format!("distribution not serializable: {err}"),
            }
        })?;
        let uploaded_at = Utc::now().trunc_subsecs(6);

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO aggregate_records \
             (uploaded_at, source_name, total_count, avg_flow, avg_pressure, avg_temperature, distribution) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uploaded_at.to_rfc3339(),
                summary.source_name,
                summary.total_count as i64,
                summary.avg_flow,
                summary.avg_pressure,
                summary.avg_temperature,
                distribution,
            ],
        )?;
        let id = tx.last_insert_rowid();
        let trimmed = tx.execute(
            "DELETE FROM aggregate_records WHERE id NOT IN \
             (SELECT id FROM aggregate_records ORDER BY id DESC LIMIT ?1)",
            params![RETENTION_LIMIT as i64],
        )?;
        tx.commit()?;
        debug!("Stored history record {id}; trimmed {trimmed} older record(s)");

        Ok(AggregateRecord {
            summary,
            id,
            uploaded_at,
        })
    }

    pub fn latest(&self) -> Result<Option<AggregateRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM aggregate_records ORDER BY id DESC LIMIT 1"),
                [],
                StoredRow::from_row,
            )
            .optional()?;
        raw.map(StoredRow::into_record).transpose()
    }

    /// Up to `limit` records, most recent first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<AggregateRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM aggregate_records ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredRow::into_record).collect()
    }

    /// Deletes every record; returns how many were removed.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM aggregate_records", [])?;
        Ok(removed)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM aggregate_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

struct StoredRow {
    id: i64,
    uploaded_at: String,
    source_name: String,
    total_count: i64,
    avg_flow: f64,
    avg_pressure: f64,
    avg_temperature: f64,
    distribution: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            uploaded_at: row.get(1)?,
            source_name: row.get(2)?,
            total_count: row.get(3)?,
            avg_flow: row.get(4)?,
            avg_pressure: row.get(5)?,
            avg_temperature: row.get(6)?,
            distribution: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<AggregateRecord, StoreError> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt { id, reason };
        let uploaded_at = DateTime::parse_from_rfc3339(&self.uploaded_at)
            .map_err(|err| corrupt(format!("bad timestamp '{}': {err}", self.uploaded_at)))?
            .with_timezone(&Utc);
        let distribution: Distribution = serde_json::from_str(&self.distribution)
            .map_err(|err| corrupt(format!("bad distribution: {err}")))?;
        let total_count = u64::try_from(self.total_count)
            .map_err(|_| corrupt(format!("negative total count {}", self.total_count)))?;
        Ok(AggregateRecord {
            summary: Summary {
                source_name: self.source_name,
                total_count,
                avg_flow: self.avg_flow,
                avg_pressure: self.avg_pressure,
                avg_temperature: self.avg_temperature,
                distribution,
            },
            id,
            uploaded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, sync::Arc, thread};

    fn summary(name: &str) -> Summary {
        let mut counts = HashMap::new();
        counts.insert("Pump".to_string(), 2);
        counts.insert("Valve".to_string(), 1);
        Summary {
            source_name: name.to_string(),
            total_count: 3,
            avg_flow: 7.0,
            avg_pressure: 110.0,
            avg_temperature: 0.0,
            distribution: Distribution::from_counts(counts),
        }
    }

    #[test]
    fn insert_then_latest_round_trips() {
        let store = HistoryStore::open_in_memory().expect("store");
        let stored = store.insert(summary("a.csv")).expect("insert");
        let latest = store.latest().expect("latest").expect("record");
        assert_eq!(latest, stored);
        assert_eq!(latest.summary, summary("a.csv"));
    }

    #[test]
    fn retains_only_the_five_most_recent() {
        let store = HistoryStore::open_in_memory().expect("store");
        let mut ids = Vec::new();
        for idx in 0..7 {
            ids.push(store.insert(summary(&format!("file{idx}.csv"))).expect("insert").id);
        }
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

        let recent = store.list_recent(RETENTION_LIMIT).expect("list");
        let recent_ids = recent.iter().map(|r| r.id).collect::<Vec<_>>();
        let expected = ids.iter().rev().take(5).copied().collect::<Vec<_>>();
        assert_eq!(recent_ids, expected);
        assert_eq!(store.len().expect("len"), 5);
        assert_eq!(recent[0].summary.source_name, "file6.csv");
    }

    #[test]
    fn list_recent_honours_smaller_limits() {
        let store = HistoryStore::open_in_memory().expect("store");
        for idx in 0..3 {
            store.insert(summary(&idx.to_string())).expect("insert");
        }
        let names = store
            .list_recent(2)
            .expect("list")
            .into_iter()
            .map(|r| r.summary.source_name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["2", "1"]);
    }

    #[test]
    fn clear_all_empties_the_store() {
        let store = HistoryStore::open_in_memory().expect("store");
        store.insert(summary("a.csv")).expect("insert");
        store.insert(summary("b.csv")).expect("insert");
        assert_eq!(store.clear_all().expect("clear"), 2);
        assert!(store.latest().expect("latest").is_none());
        assert!(store.list_recent(RETENTION_LIMIT).expect("list").is_empty());
        assert!(store.is_empty().expect("empty"));
    }

    #[test]
    fn ids_keep_increasing_after_clear() {
        let store = HistoryStore::open_in_memory().expect("store");
        let first = store.insert(summary("a.csv")).expect("insert").id;
        store.clear_all().expect("clear");
        let second = store.insert(summary("b.csv")).expect("insert").id;
        assert!(second > first);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("history.db");
        let stored = {
            let store = HistoryStore::open(&path).expect("open");
            store.insert(summary("persisted.csv")).expect("insert")
        };
        let reopened = HistoryStore::open(&path).expect("reopen");
        assert_eq!(reopened.latest().expect("latest"), Some(stored));
    }

    #[test]
    fn concurrent_inserts_never_expose_more_than_the_window() {
        let store = Arc::new(HistoryStore::open_in_memory().expect("store"));
        let writers = (0..4)
            .map(|writer| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for idx in 0..10 {
                        store
                            .insert(summary(&format!("w{writer}-{idx}")))
                            .expect("insert");
                    }
                })
            })
            .collect::<Vec<_>>();
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let recent = store.list_recent(100).expect("list");
                    assert!(recent.len() <= RETENTION_LIMIT);
                    assert!(recent.windows(2).all(|pair| pair[0].id == pair[1].id + 1));
                }
            })
        };
        for handle in writers {
            handle.join().expect("writer");
        }
        reader.join().expect("reader");

        let recent = store.list_recent(100).expect("list");
        assert_eq!(recent.len(), RETENTION_LIMIT);
        let max_id = recent[0].id;
        assert_eq!(
            recent.iter().map(|r| r.id).collect::<Vec<_>>(),
            (max_id - 4..=max_id).rev().collect::<Vec<_>>()
        );
    }
}
