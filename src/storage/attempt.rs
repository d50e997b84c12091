//! Attempt storage: create, finalize, and read back queue attempts.

use jiff::Timestamp;
use rusqlite::{Row, params};

use crate::model::{AttemptHandle, AttemptStatus, QueueAttempt};

use super::{QueueStore, Result, SqliteQueue, StorageError};

/// Column values of one `queue_attempt` row, before parsing.
type RawAttempt = (i64, String, String, String, Option<String>);

impl QueueStore for SqliteQueue {
    fn create(&mut self, reference: &str) -> Result<AttemptHandle> {
        self.create_at(reference, Timestamp::now())
    }

    fn finalize(
        &mut self,
        handle: AttemptHandle,
        status: AttemptStatus,
        message: &str,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE queue_attempt
             SET status = ?1, message = ?2, finalized_at = ?3
             WHERE id = ?4 AND queue_name = ?5 AND status = ?6",
            params![
                status.as_str(),
                message,
                Timestamp::now().to_string(),
                handle.0,
                &self.queue_name,
                AttemptStatus::InProgress.as_str(),
            ],
        )?;
        if rows == 0 {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM queue_attempt WHERE id = ?1 AND queue_name = ?2)",
                params![handle.0, &self.queue_name],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StorageError::AlreadyFinalized(handle)
            } else {
                StorageError::AttemptNotFound(handle)
            });
        }
        Ok(())
    }

    fn history(&mut self, reference: &str) -> Result<Vec<QueueAttempt>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reference, status, created_at, message FROM queue_attempt
             WHERE queue_name = ?1 AND reference = ?2
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![&self.queue_name, reference], raw_attempt)?;
        let attempts = rows
            .map(|row| parse_attempt(row?))
            .collect::<Result<Vec<_>>>()?;
        Ok(attempts)
    }
}

impl SqliteQueue {
    /// Records an in-progress attempt with an explicit creation time.
    pub fn create_at(&mut self, reference: &str, created_at: Timestamp) -> Result<AttemptHandle> {
        self.conn.execute(
            "INSERT INTO queue_attempt (queue_name, reference, status, created_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.queue_name,
                reference,
                AttemptStatus::InProgress.as_str(),
                created_at.to_string(),
                self.run_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(AttemptHandle(self.conn.last_insert_rowid()))
    }

    /// The most recent attempts in this queue, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<QueueAttempt>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, reference, status, created_at, message FROM queue_attempt
             WHERE queue_name = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![&self.queue_name, limit], raw_attempt)?;
        let attempts = rows
            .map(|row| parse_attempt(row?))
            .collect::<Result<Vec<_>>>()?;
        Ok(attempts)
    }
}

fn raw_attempt(row: &Row<'_>) -> rusqlite::Result<RawAttempt> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parse_attempt(raw: RawAttempt) -> Result<QueueAttempt> {
    let (id, reference, status_str, created_at_str, message) = raw;

    let status = status_str
        .parse::<AttemptStatus>()
        .map_err(StorageError::Corrupt)?;
    let created_at = created_at_str
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid created_at: {e}")))?;

    Ok(QueueAttempt {
        id,
        reference,
        status,
        created_at,
        message,
    })
}
