//! CLI interface for afklar.
//!
//! - `afklar run --worklist <file>`: one pass over an exported worklist.
//! - `afklar queue list|show`: inspect recorded attempts.
//!
//! `--config` and `--database` apply to every command.

mod format;
mod queue;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use afklar::{config::Config, storage::SqliteQueue};

use queue::QueueCommand;

/// afklar: attach bilag to FP-aftaler.
#[derive(Debug, Parser)]
#[command(name = "afklar", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file (default: `~/.afklar/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Queue database (overrides the configured path).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow:
  1. Export the worklist and ledgers to worklist.json
  2. afklar run --worklist worklist.json --dry-run
     → logs each case and what would be attached
  3. afklar run --worklist worklist.json
     → appends attachments to ~/.afklar/journal.jsonl
  4. afklar queue show 1000123:2000456

Logging is controlled with RUST_LOG (e.g. RUST_LOG=debug).";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every case in a worklist once.
    ///
    /// Cases handled within the retry window, or failed too often within
    /// it, are skipped. Each processed case is recorded in the queue.
    Run {
        /// Worklist snapshot (JSON with `cases` and `ledgers`).
        #[arg(long)]
        worklist: PathBuf,

        /// Attachment journal (default: `journal.jsonl` next to the database).
        #[arg(long)]
        journal: Option<PathBuf>,

        /// Evaluate every case without attaching or recording anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect the attempt queue.
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let database = cli
        .database
        .or_else(|| config.database.clone())
        .or_else(SqliteQueue::default_path)
        .ok_or("could not determine home directory; pass --database")?;

    match cli.command {
        Command::Run {
            worklist,
            journal,
            dry_run,
        } => run::cmd_run(&config, &database, &worklist, journal, dry_run),
        Command::Queue { command } => match command {
            QueueCommand::List { limit } => queue::cmd_list(&config, &database, limit),
            QueueCommand::Show { reference } => queue::cmd_show(&config, &database, &reference),
        },
    }
}
