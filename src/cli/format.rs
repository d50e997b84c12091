//! Output formatting for CLI display.

use afklar::{
    model::QueueAttempt,
    process::RunSummary,
    retry::{Decision, SkipReason},
};

/// Format one attempt as a single line.
pub(super) fn format_attempt(attempt: &QueueAttempt) -> String {
    let created = attempt.created_at.strftime("%Y-%m-%d %H:%M");
    let message = attempt.message.as_deref().unwrap_or("-");
    format!(
        "#{:<6} {created}  {:<11}  {}  {message}",
        attempt.id, attempt.status, attempt.reference
    )
}

/// Describe what the retry policy would do with a case.
pub(super) fn format_decision(decision: &Decision) -> String {
    match decision {
        Decision::Process => "process".to_string(),
        Decision::Skip(SkipReason::HandledRecently) => {
            "skip (handled within the retry window)".to_string()
        }
        Decision::Skip(SkipReason::FailedRepeatedly { failures }) => {
            format!("skip ({failures} failures within the retry window)")
        }
    }
}

/// One-line tally of a run.
pub(super) fn format_summary(summary: &RunSummary) -> String {
    format!(
        "{} case(s): {} attached, {} not attached, {} skipped, {} failed",
        summary.total(),
        summary.attached,
        summary.not_attached,
        summary.skipped,
        summary.failed
    )
}
