//! Agreement actions: attaching a document to a collectable-debt agreement.
//!
//! The processor only sees the [`AgreementAction`] trait. An action may
//! decline to attach (returning `Ok(false)`); an `Err` means the attempt
//! itself failed.

mod journal;

use std::io;

use tracing::info;

use crate::model::LedgerRow;

pub use journal::{JournalAction, JournalEntry};

/// Errors raised while attaching a document.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

/// Attaches a document to the agreement found in its partner's ledger.
pub trait AgreementAction {
    /// Returns `true` when the document was attached.
    fn attach(&mut self, agreement: &LedgerRow, document_id: &str) -> Result<bool, ActionError>;
}

/// Logs what would be attached and attaches nothing.
#[derive(Debug, Default)]
pub struct DryRun;

impl AgreementAction for DryRun {
    fn attach(&mut self, agreement: &LedgerRow, document_id: &str) -> Result<bool, ActionError> {
        info!(
            agreement = %agreement.document_id,
            document = document_id,
            "dry run: would attach"
        );
        Ok(false)
    }
}
