//! Queue inspection commands: list, show.

use std::path::Path;

use clap::Subcommand;
use jiff::Timestamp;

use afklar::{
    config::Config,
    storage::{QueueStore, SqliteQueue},
};

use super::format::{format_attempt, format_decision};

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// List the most recent attempts, newest first.
    List {
        /// How many attempts to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show every attempt for one case and whether the next run would take it.
    Show {
        /// Case reference: `partner:document`.
        reference: String,
    },
}

pub(super) fn cmd_list(config: &Config, database: &Path, limit: usize) -> Result<(), String> {
    let queue = open(config, database)?;
    let attempts = queue
        .list(limit)
        .map_err(|e| format!("failed to list attempts: {e}"))?;

    if attempts.is_empty() {
        println!("No attempts");
        return Ok(());
    }

    for attempt in &attempts {
        println!("{}", format_attempt(attempt));
    }

    Ok(())
}

pub(super) fn cmd_show(config: &Config, database: &Path, reference: &str) -> Result<(), String> {
    let mut queue = open(config, database)?;
    let history = queue
        .history(reference)
        .map_err(|e| format!("failed to load history: {e}"))?;

    if history.is_empty() {
        println!("No attempts for {reference}");
    }
    for attempt in &history {
        println!("{}", format_attempt(attempt));
    }

    let decision = config.retry.evaluate(&history, Timestamp::now());
    println!("Next run: {}", format_decision(&decision));

    Ok(())
}

fn open(config: &Config, database: &Path) -> Result<SqliteQueue, String> {
    SqliteQueue::open(database, config.queue_name.as_str())
        .map_err(|e| format!("failed to open queue {}: {e}", database.display()))
}
