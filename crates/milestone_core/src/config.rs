//! Runtime configuration resolved from the process environment.
//!
//! # Responsibility
//! - Resolve database location and logging settings in one place.
//!
//! # Invariants
//! - Blank variables behave exactly like unset ones.
//! - Resolution never fails; validation happens where values are used
//!   (`open_db`, `init_logging`).

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "MILESTONE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MILESTONE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MILESTONE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "milestone_ledger.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl LedgerConfig {
    /// Reads `MILESTONE_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}
