//! `milestone` command-line front end.
//!
//! # Responsibility
//! - Map each ledger operation to one subcommand.
//! - Supply the ambient caller identity and height explicitly via flags.
//!
//! # Invariants
//! - Read subcommands print JSON; write subcommands print the confirmation.
//! - Ledger errors exit with status 1 and a `code: message` line on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use milestone_core::db::open_db;
use milestone_core::{
    init_from_config, CallContext, Identity, LedgerConfig, LedgerError, MilestoneLedger,
    SqliteMilestoneRepository, TemporalBoundary,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Personal milestone ledger.
#[derive(Parser, Debug)]
#[command(name = "milestone")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Identity performing the call
    #[arg(long, env = "MILESTONE_CALLER")]
    caller: String,

    /// Current height counter supplied by the runtime
    #[arg(long, default_value_t = 0)]
    height: u64,

    /// Ledger database path (overrides MILESTONE_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log directory (overrides MILESTONE_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (overrides MILESTONE_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register the caller's milestone
    Register { description: String },

    /// Create a milestone for another identity
    Transfer { target: String, description: String },

    /// Overwrite the caller's description and completion flag
    Modify {
        description: String,
        #[arg(long)]
        completed: bool,
    },

    /// Delete the caller's milestone
    Delete,

    /// Set the caller's priority level (1-3)
    SetPriority { level: u32 },

    /// Set the caller's deadline OFFSET heights from now
    SetDeadline { offset: u64 },

    /// Show the milestone of an identity (defaults to the caller)
    Get { identity: Option<String> },

    /// Show whether an identity's milestone is completed
    IsCompleted { identity: Option<String> },

    /// Summarize the caller's milestone, even when absent
    Inspect,

    /// Show the stored priority of an identity
    Priority { identity: Option<String> },

    /// Show the stored deadline of an identity
    Deadline { identity: Option<String> },
}

/// Stored deadline plus whether the caller's height has reached it.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct DeadlineView {
    target_height: u64,
    alerted: bool,
    reached: bool,
}

impl DeadlineView {
    fn at_height(boundary: TemporalBoundary, height: u64) -> Self {
        Self {
            target_height: boundary.target_height,
            alerted: boundary.alerted,
            reached: boundary.is_reached_at(height),
        }
    }
}

enum Outcome {
    Message(&'static str),
    Json(serde_json::Value),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(Outcome::Message(message)) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Json(value)) => {
            println!("{value:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<LedgerError>() {
                Some(ledger_err) => eprintln!("{}: {ledger_err}", ledger_err.code()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let config = resolve_config(&cli);
    init_from_config(&config).context("failed to initialize logging")?;

    let ctx = CallContext::new(Identity::new(cli.caller.as_str())?, cli.height);
    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open ledger at {}", config.db_path.display()))?;
    let repo = SqliteMilestoneRepository::try_new(&mut conn)?;
    let mut ledger = MilestoneLedger::new(repo);

    let target = |identity: Option<String>| -> Result<Identity> {
        Ok(match identity {
            Some(value) => Identity::new(value)?,
            None => ctx.caller.clone(),
        })
    };

    let outcome = match cli.command {
        Commands::Register { description } => {
            Outcome::Message(ledger.register(&ctx, &description)?)
        }
        Commands::Transfer {
            target: recipient,
            description,
        } => Outcome::Message(ledger.transfer(&ctx, &Identity::new(recipient)?, &description)?),
        Commands::Modify {
            description,
            completed,
        } => Outcome::Message(ledger.modify(&ctx, &description, completed)?),
        Commands::Delete => Outcome::Message(ledger.delete(&ctx)?),
        Commands::SetPriority { level } => Outcome::Message(ledger.set_priority(&ctx, level)?),
        Commands::SetDeadline { offset } => Outcome::Message(ledger.set_deadline(&ctx, offset)?),
        Commands::Get { identity } => json(ledger.get(&target(identity)?)?)?,
        Commands::IsCompleted { identity } => json(ledger.is_completed(&target(identity)?)?)?,
        Commands::Inspect => json(ledger.inspect(&ctx)?)?,
        Commands::Priority { identity } => json(ledger.priority_of(&target(identity)?)?)?,
        Commands::Deadline { identity } => {
            let boundary = ledger.deadline_of(&target(identity)?)?;
            json(boundary.map(|boundary| DeadlineView::at_height(boundary, ctx.current_height)))?
        }
    };

    Ok(outcome)
}

fn resolve_config(cli: &Cli) -> LedgerConfig {
    let mut config = LedgerConfig::from_env();
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config
}

fn json(value: impl Serialize) -> Result<Outcome> {
    Ok(Outcome::Json(serde_json::to_value(value)?))
}
