//! Cases: one partner/document pair to reconcile.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of work: a document (bilag) under review for a business partner.
///
/// Materialized fresh each run from the worklist. Only its [`reference`]
/// outlives the run, as the key of its queue attempts.
///
/// [`reference`]: Case::reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub partner_id: String,
    pub document_id: String,
}

impl Case {
    pub fn new(partner_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            partner_id: partner_id.into(),
            document_id: document_id.into(),
        }
    }

    /// The stable key identifying this case across runs: `partner:document`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.partner_id, self.document_id)
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bilag {} for partner {}", self.document_id, self.partner_id)
    }
}
