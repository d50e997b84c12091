//! Ledger matching: find the agreement a document should be attached to.
//!
//! One pass over a partner's ledger rows. The document under review must be
//! open and due; the agreement is the last principal row marked as a
//! collectable-debt agreement.

use serde::{Deserialize, Serialize};

use crate::model::{AgreementMatch, LedgerRow, Miss};

/// The codes that decide eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MatchRules {
    /// Signal value meaning "receivable open and due".
    pub open_due_signal: String,

    /// Document types of principal (hovedstol) rows.
    pub principal_types: Vec<String>,

    /// Agreement type of a collectable-debt agreement.
    pub agreement_type: String,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            open_due_signal: r"@0A\QTilgodehavende åbent og forfaldent@".to_string(),
            principal_types: vec!["FK".to_string(), "FE".to_string()],
            agreement_type: "FP".to_string(),
        }
    }
}

impl MatchRules {
    fn is_agreement(&self, row: &LedgerRow) -> bool {
        row.agreement_type == self.agreement_type
            && self.principal_types.iter().any(|t| *t == row.document_type)
    }
}

/// Scans `rows` for an agreement that `document_id` can be attached to.
///
/// Stops as soon as a row for the document carries any signal other than
/// open-and-due. A document absent from the rows is reported as
/// [`Miss::DocumentMissing`].
pub fn find_agreement(rows: &[LedgerRow], document_id: &str, rules: &MatchRules) -> AgreementMatch {
    let mut document_seen = false;
    let mut agreement = None;

    for (index, row) in rows.iter().enumerate() {
        if row.document_id == document_id {
            document_seen = true;
            if row.signal != rules.open_due_signal {
                return AgreementMatch::NotFound(Miss::DocumentIneligible);
            }
        }

        if rules.is_agreement(row) {
            agreement = Some(index);
        }
    }

    if !document_seen {
        return AgreementMatch::NotFound(Miss::DocumentMissing);
    }

    match agreement {
        Some(row) => AgreementMatch::Found { row },
        None => AgreementMatch::NotFound(Miss::NoAgreement),
    }
}
