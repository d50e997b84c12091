//! Worklist sources: where cases and ledgers come from.
//!
//! The processor only sees the [`WorklistSource`] trait. A UI-automation
//! backend, the JSON [`SnapshotSource`], or a test double all fit behind it.

mod snapshot;

use std::io;

use crate::model::{Case, LedgerRow};

pub use snapshot::SnapshotSource;

/// Errors raised while reading the worklist or a ledger.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no ledger for partner {0}")]
    LedgerNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Enumerates candidate cases and exposes each partner's ledger.
pub trait WorklistSource {
    /// The run's candidate cases, in worklist order.
    fn list_candidates(&mut self) -> Result<Vec<Case>, SourceError>;

    /// Every open-item row for one partner, in ledger order.
    fn ledger_for(&mut self, partner_id: &str) -> Result<Vec<LedgerRow>, SourceError>;
}
