//! Queue persistence: the attempt history behind the retry policy.
//!
//! All attempts live in one `SQLite` file, scoped by queue name:
//!
//! ```text
//! <root>/queue.sqlite
//!   queue_attempt  # one row per attempt: reference, status, timestamps, message
//! ```

mod attempt;
mod rehearsal;

use std::{
    fs,
    path::{Path, PathBuf},
};

use rusqlite::Connection;
use uuid::Uuid;

use crate::model::{AttemptHandle, AttemptStatus, QueueAttempt};

pub use rehearsal::Rehearsal;

/// Errors that can occur during queue operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("attempt not found: {0}")]
    AttemptNotFound(AttemptHandle),

    #[error("attempt already finalized: {0}")]
    AlreadyFinalized(AttemptHandle),

    #[error("corrupt queue data: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Persistent store of attempts, keyed by case reference.
pub trait QueueStore {
    /// Records a new in-progress attempt for `reference`.
    fn create(&mut self, reference: &str) -> Result<AttemptHandle>;

    /// Moves an in-progress attempt to its final status.
    fn finalize(
        &mut self,
        handle: AttemptHandle,
        status: AttemptStatus,
        message: &str,
    ) -> Result<()>;

    /// Every attempt recorded for `reference`, oldest first.
    fn history(&mut self, reference: &str) -> Result<Vec<QueueAttempt>>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS queue_attempt (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        queue_name   TEXT NOT NULL,
        reference    TEXT NOT NULL,
        status       TEXT NOT NULL,
        created_at   TEXT NOT NULL,
        finalized_at TEXT,
        message      TEXT,
        run_id       TEXT
    );
    CREATE INDEX IF NOT EXISTS queue_attempt_reference
        ON queue_attempt (queue_name, reference);
";

/// `SQLite`-backed queue store for one named queue.
pub struct SqliteQueue {
    conn: Connection,
    queue_name: String,
    run_id: Option<Uuid>,
}

impl SqliteQueue {
    /// Opens (or creates) the queue database at `path`.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: &Path, queue_name: impl Into<String>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::bootstrap(Connection::open(path)?, queue_name.into())
    }

    /// Opens a private in-memory queue.
    pub fn in_memory(queue_name: impl Into<String>) -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?, queue_name.into())
    }

    /// Returns the default database path: `~/.afklar/queue.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".afklar").join("queue.sqlite"))
    }

    /// Tags attempts created from now on with the given run.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    fn bootstrap(conn: Connection, queue_name: String) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            queue_name,
            run_id: None,
        })
    }
}
