//! The `run` command: one pass over a worklist snapshot.

use std::path::{Path, PathBuf};

use tracing::info_span;
use uuid::Uuid;

use afklar::{
    action::{AgreementAction, DryRun, JournalAction},
    config::Config,
    process::{CaseProcessor, RunSummary},
    source::SnapshotSource,
    storage::{QueueStore, Rehearsal, SqliteQueue},
};

use super::format::format_summary;

pub(super) fn cmd_run(
    config: &Config,
    database: &Path,
    worklist: &Path,
    journal: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), String> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("run", %run_id, dry_run).entered();

    let mut source = SnapshotSource::load(worklist)
        .map_err(|e| format!("failed to load worklist {}: {e}", worklist.display()))?;
    let mut queue = SqliteQueue::open(database, config.queue_name.as_str())
        .map_err(|e| format!("failed to open queue {}: {e}", database.display()))?
        .with_run_id(run_id);

    let summary = if dry_run {
        let mut rehearsal = Rehearsal::new(&mut queue);
        process(config, &mut source, &mut DryRun, &mut rehearsal)?
    } else {
        let journal = journal.unwrap_or_else(|| database.with_file_name("journal.jsonl"));
        let mut action = JournalAction::new(journal, config.excluded_creator.clone());
        process(config, &mut source, &mut action, &mut queue)?
    };

    println!("{}", format_summary(&summary));
    Ok(())
}

fn process<A, Q>(
    config: &Config,
    source: &mut SnapshotSource,
    action: &mut A,
    queue: &mut Q,
) -> Result<RunSummary, String>
where
    A: AgreementAction,
    Q: QueueStore,
{
    CaseProcessor::new(source, action, queue)
        .with_policy(config.retry)
        .with_rules(config.rules.clone())
        .run()
        .map_err(|e| format!("run aborted: {e}"))
}
