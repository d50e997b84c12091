//! Queue attempts: the persisted trace of each case a run acted on.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Where an attempt stands.
///
/// An attempt left `InProgress` after its run is a failure: the run died
/// between recording and finalizing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    InProgress,
    Done,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown attempt status: {other}")),
        }
    }
}

/// Opaque handle to an attempt created in the queue store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptHandle(pub i64);

impl fmt::Display for AttemptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One tracked attempt at a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAttempt {
    pub id: i64,
    pub reference: String,
    pub status: AttemptStatus,
    pub created_at: Timestamp,
    pub message: Option<String>,
}
