//! afklar configuration.
//!
//! Loaded from `~/.afklar/config.toml` unless `--config` names another file.
//! Every key is optional; a missing default file means all defaults.
//!
//! ```toml
//! queue-name = "ryk-afklar-fp-aftale"
//! database = "/var/lib/afklar/queue.sqlite"
//! excluded-creator = "ZDKD_WS1_751"
//!
//! [retry]
//! window-days = 7
//! max-failures = 1
//!
//! [rules]
//! open-due-signal = '@0A\QTilgodehavende åbent og forfaldent@'
//! principal-types = ["FK", "FE"]
//! agreement-type = "FP"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{matcher::MatchRules, retry::RetryPolicy};

/// afklar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Queue that attempts are recorded in.
    pub queue_name: String,

    /// Queue database path. Defaults to `~/.afklar/queue.sqlite`.
    pub database: Option<PathBuf>,

    /// Agreements created by this user are never attached to.
    pub excluded_creator: Option<String>,

    pub retry: RetryPolicy,

    pub rules: MatchRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_name: "ryk-afklar-fp-aftale".to_string(),
            database: None,
            excluded_creator: Some("ZDKD_WS1_751".to_string()),
            retry: RetryPolicy::default(),
            rules: MatchRules::default(),
        }
    }
}

impl Config {
    /// Load config from `path`, or from `~/.afklar/config.toml` when `None`.
    ///
    /// An explicitly named file must exist; the default file may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// Parse config from TOML text and validate it.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;

        if config.queue_name.is_empty() {
            return Err("queue-name is empty".to_string());
        }
        if config.retry.window_days < 0 {
            return Err("retry.window-days must not be negative".to_string());
        }
        if config.rules.principal_types.is_empty() {
            return Err("rules.principal-types is empty".to_string());
        }

        Ok(config)
    }

    /// The config file path: `~/.afklar/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".afklar").join("config.toml"))
    }
}
