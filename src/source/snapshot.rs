//! Snapshot source: a worklist exported to a JSON file.
//!
//! ```text
//! {
//!   "cases":   [{ "partnerId": "P1", "documentId": "D1" }],
//!   "ledgers": { "P1": [{ "documentId": "D1", "documentType": "AB", ... }] }
//! }
//! ```

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::model::{Case, LedgerRow};

use super::{SourceError, WorklistSource};

/// A worklist and its ledgers, loaded once.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotSource {
    #[serde(default)]
    cases: Vec<Case>,

    #[serde(default)]
    ledgers: HashMap<String, Vec<LedgerRow>>,
}

impl SnapshotSource {
    /// Reads a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl WorklistSource for SnapshotSource {
    fn list_candidates(&mut self) -> Result<Vec<Case>, SourceError> {
        Ok(self.cases.clone())
    }

    fn ledger_for(&mut self, partner_id: &str) -> Result<Vec<LedgerRow>, SourceError> {
        self.ledgers
            .get(partner_id)
            .cloned()
            .ok_or_else(|| SourceError::LedgerNotFound(partner_id.to_string()))
    }
}
