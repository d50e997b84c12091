//! Journal action: record attachments in an append-only JSONL file.
//!
//! Each attachment is one line, picked up by whatever applies them to the
//! ledger system. Agreements created by the excluded service user are never
//! touched.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::LedgerRow;

use super::{ActionError, AgreementAction};

/// One recorded attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Document id of the agreement's principal row.
    pub agreement: String,
    pub document_id: String,
    pub attached_at: Timestamp,
}

/// Appends attachments to a journal file.
pub struct JournalAction {
    path: PathBuf,
    excluded_creator: Option<String>,
}

impl JournalAction {
    /// Creates an action writing to `path`; the file is created on first use.
    pub fn new(path: impl Into<PathBuf>, excluded_creator: Option<String>) -> Self {
        Self {
            path: path.into(),
            excluded_creator,
        }
    }

    /// Loads all recorded attachments.
    ///
    /// Returns an empty vec if the journal doesn't exist yet.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, ActionError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line?;
            if !line.is_empty() {
                entries.push(serde_json::from_str(&line)?);
            }
        }
        Ok(entries)
    }

    fn is_excluded(&self, agreement: &LedgerRow) -> bool {
        match (&self.excluded_creator, &agreement.created_by) {
            (Some(excluded), Some(creator)) => excluded == creator,
            _ => false,
        }
    }
}

impl AgreementAction for JournalAction {
    fn attach(&mut self, agreement: &LedgerRow, document_id: &str) -> Result<bool, ActionError> {
        if self.is_excluded(agreement) {
            return Ok(false);
        }

        let entry = JournalEntry {
            agreement: agreement.document_id.clone(),
            document_id: document_id.to_string(),
            attached_at: Timestamp::now(),
        };
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(true)
    }
}
