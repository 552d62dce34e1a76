//! Scan run history.

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::Database;

/// Recorded on runs whose process stopped sending heartbeats
const ABANDONED_MESSAGE: &str = "Abandoned: no heartbeat from the indexing process";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ScanStatus::Running),
            "completed" => Some(ScanStatus::Completed),
            "failed" => Some(ScanStatus::Failed),
            _ => None,
        }
    }
}

/// One recorded indexing run
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub id: i64,
    pub root: String,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub status: ScanStatus,
    pub photos_indexed: i64,
    pub photos_failed: i64,
    pub clusters_created: i64,
    pub error_message: Option<String>,
}

impl Database {
    /// Record a new run, unless another one holds the run token.
    ///
    /// The check and the insert share an IMMEDIATE transaction, so two
    /// processes on the same catalogue cannot both start. A `running` row
    /// whose heartbeat is older than `stale_after` is marked failed first.
    /// Returns `None` while a live run is in progress.
    pub fn begin_scan(&self, root: &Path, stale_after: Duration) -> Result<Option<i64>> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let abandoned = tx.execute(
            r#"
            UPDATE scans
            SET status = ?, completed_at = CURRENT_TIMESTAMP, error_message = ?
            WHERE status = ? AND heartbeat_at < datetime('now', ?)
            "#,
            rusqlite::params![
                ScanStatus::Failed.as_str(),
                ABANDONED_MESSAGE,
                ScanStatus::Running.as_str(),
                format!("-{} seconds", stale_after.as_secs()),
            ],
        )?;
        if abandoned > 0 {
            warn!("Marked {} abandoned scan run(s) as failed", abandoned);
        }

        let active: Option<i64> = tx
            .query_row(
                "SELECT id FROM scans WHERE status = ? ORDER BY id LIMIT 1",
                [ScanStatus::Running.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(active) = active {
            tx.commit()?;
            debug!("Scan {} is still running", active);
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO scans (root, status) VALUES (?, ?)",
            rusqlite::params![root.to_string_lossy().as_ref(), ScanStatus::Running.as_str()],
        )?;
        let scan_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Some(scan_id))
    }

    /// Mark a running scan as alive
    pub fn touch_scan(&self, scan_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE scans SET heartbeat_at = CURRENT_TIMESTAMP WHERE id = ? AND status = ?",
            rusqlite::params![scan_id, ScanStatus::Running.as_str()],
        )?;
        Ok(())
    }

    pub fn complete_scan(
        &self,
        scan_id: i64,
        photos_indexed: usize,
        photos_failed: usize,
        clusters_created: usize,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE scans
            SET status = ?, completed_at = CURRENT_TIMESTAMP,
                photos_indexed = ?, photos_failed = ?, clusters_created = ?
            WHERE id = ?
            "#,
            rusqlite::params![
                ScanStatus::Completed.as_str(),
                photos_indexed as i64,
                photos_failed as i64,
                clusters_created as i64,
                scan_id,
            ],
        )?;
        Ok(())
    }

    pub fn fail_scan(&self, scan_id: i64, error_message: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE scans SET status = ?, completed_at = CURRENT_TIMESTAMP, error_message = ? WHERE id = ?",
            rusqlite::params![ScanStatus::Failed.as_str(), error_message, scan_id],
        )?;
        Ok(())
    }

    /// Most recent runs first
    pub fn get_recent_scans(&self, limit: usize) -> Result<Vec<ScanRun>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, root, started_at, completed_at, status,
                   photos_indexed, photos_failed, clusters_created, error_message
            FROM scans
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;
        let runs = stmt
            .query_map([limit as i64], |row| {
                let status: String = row.get(4)?;
                Ok(ScanRun {
                    id: row.get(0)?,
                    root: row.get(1)?,
                    started_at: row.get(2)?,
                    completed_at: row.get(3)?,
                    status: ScanStatus::from_str(&status).unwrap_or(ScanStatus::Failed),
                    photos_indexed: row.get(5)?,
                    photos_failed: row.get(6)?,
                    clusters_created: row.get(7)?,
                    error_message: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }
}
