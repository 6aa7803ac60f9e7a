//! Milestone ledger use-case service.
//!
//! # Responsibility
//! - Expose the public ledger operations keyed by caller or target identity.
//! - Order precondition checks and map storage outcomes to ledger errors.
//!
//! # Invariants
//! - Validation precedes mutation; a rejected call leaves every store as-is.
//! - Presence checks run before field validation, so a missing or duplicate
//!   record is reported even when the input is also invalid.
//! - `transfer` performs no ownership check on the caller.
//! - `delete` never cascades to priority or deadline entries.

use crate::model::milestone::{
    CallContext, Identity, MilestoneInspection, MilestoneRecord, MilestoneValidationError,
    PriorityLevel, TemporalBoundary,
};
use crate::repo::milestone_repo::{MilestoneRepository, RepoError};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MSG_REGISTERED: &str = "Milestone registered successfully";
pub const MSG_TRANSFERRED: &str = "Milestone objective transferred successfully";
pub const MSG_MODIFIED: &str = "Milestone updated successfully";
pub const MSG_DELETED: &str = "Milestone deleted successfully";
pub const MSG_PRIORITY_SET: &str = "Priority level set successfully";
pub const MSG_DEADLINE_SET: &str = "Deadline set successfully";

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level failure for one call.
#[derive(Debug)]
pub enum LedgerError {
    /// The addressed identity holds no milestone.
    ObjectiveNotFound(Identity),
    /// Creation attempted where a milestone already exists.
    DuplicateMilestone(Identity),
    /// An input failed field-level validation.
    ParameterViolation(MilestoneValidationError),
    /// Persistence-layer failure.
    Storage(RepoError),
}

impl LedgerError {
    /// Stable result tag for callers that do not match on the enum.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ObjectiveNotFound(_) => "objective_not_found",
            Self::DuplicateMilestone(_) => "duplicate_milestone",
            Self::ParameterViolation(_) => "parameter_violation",
            Self::Storage(_) => "storage",
        }
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ObjectiveNotFound(owner) => write!(f, "no milestone found for {owner}"),
            Self::DuplicateMilestone(owner) => {
                write!(f, "milestone already registered for {owner}")
            }
            Self::ParameterViolation(err) => write!(f, "parameter violation: {err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ParameterViolation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MilestoneValidationError> for LedgerError {
    fn from(value: MilestoneValidationError) -> Self {
        Self::ParameterViolation(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(owner) => Self::ObjectiveNotFound(owner),
            RepoError::AlreadyExists(owner) => Self::DuplicateMilestone(owner),
            RepoError::Validation(err) => Self::ParameterViolation(err),
            other => Self::Storage(other),
        }
    }
}

/// The milestone ledger: one record, priority and deadline per identity.
pub struct MilestoneLedger<R: MilestoneRepository> {
    repo: R,
}

impl<R: MilestoneRepository> MilestoneLedger<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers the caller's milestone.
    ///
    /// # Errors
    /// - `DuplicateMilestone` when the caller already holds one.
    /// - `ParameterViolation` when `description` is invalid.
    pub fn register(
        &mut self,
        ctx: &CallContext,
        description: &str,
    ) -> LedgerResult<&'static str> {
        let result = self.create_for(&ctx.caller, description);
        log_outcome("milestone_register", description.len(), &result);
        result.map(|()| MSG_REGISTERED)
    }

    /// Creates a milestone keyed by `target` on anyone's behalf.
    ///
    /// Any caller may fill any unoccupied identity, including its own. The
    /// created record belongs to `target` from then on.
    ///
    /// # Errors
    /// - `DuplicateMilestone` when `target` already holds one.
    /// - `ParameterViolation` when `description` is invalid.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        target: &Identity,
        description: &str,
    ) -> LedgerResult<&'static str> {
        let result = self.create_for(target, description);
        log_outcome("milestone_transfer", description.len(), &result);
        if result.is_ok() {
            debug!(
                "event=milestone_transfer module=service on_behalf={}",
                ctx.caller != *target
            );
        }
        result.map(|()| MSG_TRANSFERRED)
    }

    /// Overwrites the caller's description and completion flag.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when the caller holds no milestone.
    /// - `ParameterViolation` when `description` is invalid.
    pub fn modify(
        &mut self,
        ctx: &CallContext,
        description: &str,
        completed: bool,
    ) -> LedgerResult<&'static str> {
        let result = self.require_record(&ctx.caller).and_then(|_| {
            let record = MilestoneRecord {
                description: description.to_string(),
                completed,
            };
            record.validate()?;
            self.repo.update_milestone(&ctx.caller, &record)?;
            Ok(())
        });
        log_outcome("milestone_modify", description.len(), &result);
        result.map(|()| MSG_MODIFIED)
    }

    /// Removes the caller's milestone. Priority and deadline entries survive.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when the caller holds no milestone.
    pub fn delete(&mut self, ctx: &CallContext) -> LedgerResult<&'static str> {
        let result = self
            .repo
            .delete_milestone(&ctx.caller)
            .map_err(LedgerError::from);
        log_outcome("milestone_delete", 0, &result);
        result.map(|()| MSG_DELETED)
    }

    /// Sets or replaces the caller's priority level.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when the caller holds no milestone.
    /// - `ParameterViolation` when `level` is outside `1..=3`.
    pub fn set_priority(&mut self, ctx: &CallContext, level: u32) -> LedgerResult<&'static str> {
        let result = self.require_record(&ctx.caller).and_then(|_| {
            let level = PriorityLevel::try_from(level)?;
            self.repo.upsert_priority(&ctx.caller, level)?;
            Ok(())
        });
        log_outcome("priority_set", 0, &result);
        result.map(|()| MSG_PRIORITY_SET)
    }

    /// Sets or replaces the caller's deadline at `current_height + offset`.
    ///
    /// The new entry always starts with `alerted = false`.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when the caller holds no milestone.
    /// - `ParameterViolation` when `offset` is zero or the target overflows.
    pub fn set_deadline(&mut self, ctx: &CallContext, offset: u64) -> LedgerResult<&'static str> {
        let result = self.require_record(&ctx.caller).and_then(|_| {
            let boundary = TemporalBoundary::schedule(ctx.current_height, offset)?;
            self.repo.upsert_deadline(&ctx.caller, &boundary)?;
            Ok(())
        });
        log_outcome("deadline_set", 0, &result);
        result.map(|()| MSG_DEADLINE_SET)
    }

    /// Reads the milestone held by `identity`.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when `identity` holds no milestone.
    pub fn get(&self, identity: &Identity) -> LedgerResult<MilestoneRecord> {
        self.require_record(identity)
    }

    /// Reads the completion flag of `identity`'s milestone.
    ///
    /// # Errors
    /// - `ObjectiveNotFound` when `identity` holds no milestone.
    pub fn is_completed(&self, identity: &Identity) -> LedgerResult<bool> {
        self.require_record(identity).map(|record| record.completed)
    }

    /// Summarizes the caller's milestone, reporting absence as data.
    ///
    /// Only storage failures surface as errors.
    pub fn inspect(&self, ctx: &CallContext) -> LedgerResult<MilestoneInspection> {
        let record = self.repo.get_milestone(&ctx.caller)?;
        Ok(MilestoneInspection::from(record.as_ref()))
    }

    /// Reads the priority entry of `identity`, orphaned or not.
    pub fn priority_of(&self, identity: &Identity) -> LedgerResult<Option<PriorityLevel>> {
        Ok(self.repo.get_priority(identity)?)
    }

    /// Reads the deadline entry of `identity`, orphaned or not.
    pub fn deadline_of(&self, identity: &Identity) -> LedgerResult<Option<TemporalBoundary>> {
        Ok(self.repo.get_deadline(identity)?)
    }

    // Early check only orders DuplicateMilestone before ParameterViolation;
    // `insert_milestone` re-checks presence inside its write transaction.
    fn create_for(&mut self, owner: &Identity, description: &str) -> LedgerResult<()> {
        if self.repo.get_milestone(owner)?.is_some() {
            return Err(LedgerError::DuplicateMilestone(owner.clone()));
        }
        let record = MilestoneRecord::new(description)?;
        self.repo.insert_milestone(owner, &record)?;
        Ok(())
    }

    fn require_record(&self, owner: &Identity) -> LedgerResult<MilestoneRecord> {
        self.repo
            .get_milestone(owner)?
            .ok_or_else(|| LedgerError::ObjectiveNotFound(owner.clone()))
    }
}

fn log_outcome<T>(event: &str, description_len: usize, result: &LedgerResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok description_len={description_len}"
        ),
        Err(LedgerError::Storage(err)) => error!(
            "event={event} module=service status=error error_code=storage error={err}"
        ),
        Err(err) => warn!(
            "event={event} module=service status=rejected error_code={}",
            err.code()
        ),
    }
}
