//! Core domain logic for the milestone ledger.
//! This crate is the single source of truth for ledger invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::LedgerConfig;
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::milestone::{
    CallContext, Identity, MilestoneInspection, MilestoneRecord, MilestoneValidationError,
    PriorityLevel, TemporalBoundary, MAX_DESCRIPTION_LEN,
};
pub use repo::milestone_repo::{
    MilestoneRepository, RepoError, RepoResult, SqliteMilestoneRepository,
};
pub use service::ledger_service::{LedgerError, LedgerResult, MilestoneLedger};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
