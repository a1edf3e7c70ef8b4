//! Durable, append-only log of not-yet-propagated mutations.
//!
//! Entries live in the `pending_operations` table of the local store and stay
//! there forever: a replayed entry flips to SYNCED, an entry that keeps
//! failing stops being drained once its retry count hits the cap but is never
//! deleted. Entries are drained oldest-first, so successive mutations of the
//! same record replay remotely in creation order. There is no deduplication:
//! two updates to the same record are two entries.

use crate::error::{PackhorseError, Result};
use crate::record::Project;
use crate::store::LocalStore;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use std::sync::Arc;

/// A mutation to replay against the remote store. Closed set, each variant
/// carrying its typed payload: CREATE and UPDATE snapshot the full record at
/// enqueue time, DELETE carries only the id.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create(Project),
    Update(Project),
    Delete { id: i64 },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Create(_) => "CREATE",
            Operation::Update(_) => "UPDATE",
            Operation::Delete { .. } => "DELETE",
        }
    }

    pub fn record_id(&self) -> i64 {
        match self {
            Operation::Create(p) | Operation::Update(p) => p.id,
            Operation::Delete { id } => *id,
        }
    }

    fn payload_json(&self) -> Result<Option<String>> {
        match self {
            Operation::Create(p) | Operation::Update(p) => {
                Ok(Some(serde_json::to_string(p)?))
            }
            Operation::Delete { .. } => Ok(None),
        }
    }

    fn from_parts(kind: &str, record_id: i64, payload: Option<&str>) -> Result<Self> {
        match kind {
            "CREATE" | "UPDATE" => {
                let raw = payload.ok_or_else(|| {
                    PackhorseError::LocalStore(format!(
                        "Outbox entry for record {} has kind {} but no payload",
                        record_id, kind
                    ))
                })?;
                let project: Project = serde_json::from_str(raw)?;
                if kind == "CREATE" {
                    Ok(Operation::Create(project))
                } else {
                    Ok(Operation::Update(project))
                }
            }
            "DELETE" => Ok(Operation::Delete { id: record_id }),
            other => Err(PackhorseError::LocalStore(format!(
                "Unknown outbox operation kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Synced,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "PENDING",
            OutboxStatus::Synced => "SYNCED",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(OutboxStatus::Pending),
            "SYNCED" => Ok(OutboxStatus::Synced),
            other => Err(PackhorseError::LocalStore(format!(
                "Unknown outbox status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub op: Operation,
    pub created_at: DateTime<Utc>,
    pub status: OutboxStatus,
    pub retry_count: u32,
}

type RawEntry = (i64, String, i64, Option<String>, String, String, u32);

/// The outbox shares the local store's SQLite database, so an enqueue has no
/// failure mode separate from the local store itself.
#[derive(Clone)]
pub struct Outbox {
    store: Arc<LocalStore>,
    max_retries: u32,
}

impl Outbox {
    pub fn new(store: Arc<LocalStore>, max_retries: u32) -> Self {
        Outbox { store, max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Durably append a PENDING entry with retry_count = 0. Returns the
    /// entry id.
    pub fn enqueue(&self, op: &Operation) -> Result<i64> {
        let payload = op.payload_json()?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let entry_id = self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pending_operations (operation, record_id, payload, created_at, status, retry_count)
                 VALUES (?1, ?2, ?3, ?4, 'PENDING', 0)",
                params![op.kind(), op.record_id(), payload, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::debug!(
            "Enqueued {} for record {} as outbox entry {}",
            op.kind(),
            op.record_id(),
            entry_id
        );
        Ok(entry_id)
    }

    /// Up to `limit` PENDING entries below the retry cap, oldest first.
    pub fn next_batch(&self, limit: u32) -> Result<Vec<OutboxEntry>> {
        let rows = self.select_entries(
            "WHERE status = 'PENDING' AND retry_count < ?1
             ORDER BY created_at ASC, id ASC LIMIT ?2",
            params![self.max_retries, limit],
        )?;
        rows.into_iter().map(entry_from_raw).collect()
    }

    /// Entries past the retry cap, still PENDING. Nothing in the engine ever
    /// replays or deletes these; the query exists so abandonment stays
    /// observable.
    pub fn abandoned(&self) -> Result<Vec<OutboxEntry>> {
        let rows = self.select_entries(
            "WHERE status = 'PENDING' AND retry_count >= ?1
             ORDER BY created_at ASC, id ASC",
            params![self.max_retries],
        )?;
        rows.into_iter().map(entry_from_raw).collect()
    }

    pub fn get(&self, entry_id: i64) -> Result<Option<OutboxEntry>> {
        let mut rows = self.select_entries("WHERE id = ?1", params![entry_id])?;
        match rows.pop() {
            Some(raw) => Ok(Some(entry_from_raw(raw)?)),
            None => Ok(None),
        }
    }

    pub fn pending_count(&self) -> Result<u64> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM pending_operations WHERE status = 'PENDING'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
        })
    }

    pub fn mark_synced(&self, entry_id: i64) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE pending_operations SET status = 'SYNCED' WHERE id = ?1",
                params![entry_id],
            )?;
            Ok(())
        })
    }

    pub fn increment_retry(&self, entry_id: i64) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE pending_operations SET retry_count = retry_count + 1 WHERE id = ?1",
                params![entry_id],
            )?;
            Ok(())
        })
    }

    fn select_entries(
        &self,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<RawEntry>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, operation, record_id, payload, created_at, status, retry_count
                 FROM pending_operations {}",
                clause
            ))?;
            let rows = stmt.query_map(params, |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?;
            rows.collect()
        })
    }
}

fn entry_from_raw(raw: RawEntry) -> Result<OutboxEntry> {
    let (id, kind, record_id, payload, created_at, status, retry_count) = raw;
    let op = Operation::from_parts(&kind, record_id, payload.as_deref())?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            PackhorseError::LocalStore(format!(
                "Outbox entry {} has a corrupt created_at: {}",
                id, e
            ))
        })?;
    Ok(OutboxEntry {
        id,
        op,
        created_at,
        status: OutboxStatus::parse(&status)?,
        retry_count,
    })
}
