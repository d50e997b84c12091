//! Ledger types: rows of a partner's open-item list and the match result.

use serde::{Deserialize, Serialize};

/// One line of a business partner's open-item ledger (postliste).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRow {
    /// The document (bilag) this row describes.
    pub document_id: String,

    /// Document category, e.g. `FK` or `FE` for principal (hovedstol) rows.
    pub document_type: String,

    /// Agreement category; `FP` marks a collectable-debt agreement.
    #[serde(default)]
    pub agreement_type: String,

    /// Traffic-light eligibility flag (lyssignal).
    #[serde(default)]
    pub signal: String,

    /// User that created the agreement this row belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Why the matcher found nothing to attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// The document is eligible but no agreement row exists.
    NoAgreement,

    /// The document's signal is not open-and-due.
    DocumentIneligible,

    /// The document does not appear in its own ledger.
    DocumentMissing,
}

/// Result of scanning a ledger for an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementMatch {
    /// An agreement row was found at this index into the scanned rows.
    Found { row: usize },

    /// Nothing to attach to.
    NotFound(Miss),
}

impl AgreementMatch {
    pub fn found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Index of the agreement row, when one was found.
    pub fn agreement_row(&self) -> Option<usize> {
        match self {
            Self::Found { row } => Some(*row),
            Self::NotFound(_) => None,
        }
    }
}
