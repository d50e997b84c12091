//! Retry policy: decide from queue history whether a case runs this time.
//!
//! A case handled successfully within the window is not touched again, and a
//! case that has failed more often than the allowance within the window is
//! left alone until the failures age out. The check only reads history.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::{AttemptStatus, QueueAttempt};

const SECONDS_PER_DAY: i64 = 86_400;

/// Why a case is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A `done` attempt exists within the window.
    HandledRecently,

    /// Too many unfinished attempts within the window.
    FailedRepeatedly { failures: usize },
}

/// Outcome of evaluating the policy for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Process,
    Skip(SkipReason),
}

/// Bounds how often a case is reprocessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Age in whole days up to which an attempt counts as recent (inclusive).
    pub window_days: i64,

    /// Recent failures tolerated before the case is skipped.
    pub max_failures: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            window_days: 7,
            max_failures: 1,
        }
    }
}

impl RetryPolicy {
    /// Evaluates the policy against every attempt recorded for one reference.
    pub fn evaluate(&self, history: &[QueueAttempt], now: Timestamp) -> Decision {
        let recent = |attempt: &&QueueAttempt| self.is_recent(attempt.created_at, now);

        if history
            .iter()
            .filter(recent)
            .any(|a| a.status == AttemptStatus::Done)
        {
            return Decision::Skip(SkipReason::HandledRecently);
        }

        let failures = history
            .iter()
            .filter(recent)
            .filter(|a| a.status == AttemptStatus::InProgress)
            .count();
        if failures > self.max_failures {
            return Decision::Skip(SkipReason::FailedRepeatedly { failures });
        }

        Decision::Process
    }

    pub fn should_process(&self, history: &[QueueAttempt], now: Timestamp) -> bool {
        self.evaluate(history, now) == Decision::Process
    }

    /// Whole elapsed days, rounded down, compared inclusively to the window.
    /// Timestamps in the future count as recent.
    fn is_recent(&self, created_at: Timestamp, now: Timestamp) -> bool {
        let elapsed = now.duration_since(created_at).as_secs();
        elapsed.div_euclid(SECONDS_PER_DAY) <= self.window_days
    }
}
