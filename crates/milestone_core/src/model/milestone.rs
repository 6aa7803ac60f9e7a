//! Milestone domain model.
//!
//! # Responsibility
//! - Define the per-identity milestone record and its two attribute entries.
//! - Own every field-level validation rule used by write paths.
//!
//! # Invariants
//! - `description` is 1..=100 bytes of ASCII.
//! - `PriorityLevel` is always within `1..=3`.
//! - `TemporalBoundary::target_height` is absolute and fits SQLite `INTEGER`.
//! - `TemporalBoundary::alerted` starts as `false`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum description size in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 100;
pub const MIN_PRIORITY_LEVEL: u32 = 1;
pub const MAX_PRIORITY_LEVEL: u32 = 3;

/// Highest target height that storage can represent.
const MAX_TARGET_HEIGHT: u64 = i64::MAX as u64;

/// Field-level validation failure for milestone inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneValidationError {
    EmptyIdentity,
    EmptyDescription,
    DescriptionTooLong { len: usize },
    NonAsciiDescription,
    PriorityOutOfRange { level: u32 },
    ZeroDeadlineOffset,
    DeadlineOverflow { current_height: u64, offset: u64 },
}

impl Display for MilestoneValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyIdentity => write!(f, "identity cannot be empty"),
            Self::EmptyDescription => write!(f, "description cannot be empty"),
            Self::DescriptionTooLong { len } => write!(
                f,
                "description is {len} bytes; maximum is {MAX_DESCRIPTION_LEN}"
            ),
            Self::NonAsciiDescription => write!(f, "description must be ASCII"),
            Self::PriorityOutOfRange { level } => write!(
                f,
                "priority level {level} outside {MIN_PRIORITY_LEVEL}..={MAX_PRIORITY_LEVEL}"
            ),
            Self::ZeroDeadlineOffset => write!(f, "deadline offset must be greater than zero"),
            Self::DeadlineOverflow {
                current_height,
                offset,
            } => write!(
                f,
                "deadline offset {offset} from height {current_height} exceeds storable range"
            ),
        }
    }
}

impl Error for MilestoneValidationError {}

/// Opaque principal that keys every ledger store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Wraps a principal string byte-for-byte; only the empty string is refused.
    pub fn new(value: impl Into<String>) -> Result<Self, MilestoneValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(MilestoneValidationError::EmptyIdentity);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = MilestoneValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ambient inputs supplied by the runtime for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Authenticated principal performing the call.
    pub caller: Identity,
    /// Monotonically non-decreasing height counter at call time.
    pub current_height: u64,
}

impl CallContext {
    pub fn new(caller: Identity, current_height: u64) -> Self {
        Self {
            caller,
            current_height,
        }
    }
}

/// The primary tracked entity: one objective per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub description: String,
    pub completed: bool,
}

impl MilestoneRecord {
    /// Creates an open (not completed) milestone after validating `description`.
    pub fn new(description: impl Into<String>) -> Result<Self, MilestoneValidationError> {
        let record = Self {
            description: description.into(),
            completed: false,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks field invariants. Write paths must call this before persistence.
    pub fn validate(&self) -> Result<(), MilestoneValidationError> {
        validate_description(&self.description)
    }
}

/// Validates a milestone description.
///
/// Emptiness is reported before size and charset so that `""` always maps to
/// `EmptyDescription`.
pub fn validate_description(description: &str) -> Result<(), MilestoneValidationError> {
    if description.is_empty() {
        return Err(MilestoneValidationError::EmptyDescription);
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(MilestoneValidationError::DescriptionTooLong {
            len: description.len(),
        });
    }
    if !description.is_ascii() {
        return Err(MilestoneValidationError::NonAsciiDescription);
    }
    Ok(())
}

/// Priority classification attached to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PriorityLevel(u8);

impl PriorityLevel {
    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl TryFrom<u32> for PriorityLevel {
    type Error = MilestoneValidationError;

    fn try_from(level: u32) -> Result<Self, Self::Error> {
        if !(MIN_PRIORITY_LEVEL..=MAX_PRIORITY_LEVEL).contains(&level) {
            return Err(MilestoneValidationError::PriorityOutOfRange { level });
        }
        // Range check above keeps this lossless.
        Ok(Self(level as u8))
    }
}

impl From<PriorityLevel> for u32 {
    fn from(value: PriorityLevel) -> Self {
        value.get()
    }
}

impl Display for PriorityLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Height-based deadline attached to an identity.
///
/// Stored only; nothing in the ledger acts on it when the height is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalBoundary {
    pub target_height: u64,
    pub alerted: bool,
}

impl TemporalBoundary {
    /// Computes an absolute boundary `offset` heights after `current_height`.
    pub fn schedule(current_height: u64, offset: u64) -> Result<Self, MilestoneValidationError> {
        if offset == 0 {
            return Err(MilestoneValidationError::ZeroDeadlineOffset);
        }
        let target_height = current_height
            .checked_add(offset)
            .filter(|height| *height <= MAX_TARGET_HEIGHT)
            .ok_or(MilestoneValidationError::DeadlineOverflow {
                current_height,
                offset,
            })?;
        Ok(Self {
            target_height,
            alerted: false,
        })
    }

    /// Whether `height` has reached this boundary.
    pub fn is_reached_at(&self, height: u64) -> bool {
        height >= self.target_height
    }
}

/// Caller-facing summary that reports absence as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneInspection {
    pub exists: bool,
    pub content_length: usize,
    pub is_finished: bool,
}

impl MilestoneInspection {
    pub fn absent() -> Self {
        Self {
            exists: false,
            content_length: 0,
            is_finished: false,
        }
    }

    pub fn of(record: &MilestoneRecord) -> Self {
        Self {
            exists: true,
            content_length: record.description.len(),
            is_finished: record.completed,
        }
    }
}

impl From<Option<&MilestoneRecord>> for MilestoneInspection {
    fn from(value: Option<&MilestoneRecord>) -> Self {
        value.map_or_else(Self::absent, Self::of)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_description, Identity, MilestoneValidationError, MAX_DESCRIPTION_LEN};

    #[test]
    fn description_at_max_length_is_accepted() {
        let description = "a".repeat(MAX_DESCRIPTION_LEN);
        assert!(validate_description(&description).is_ok());
    }

    #[test]
    fn empty_description_wins_over_other_rules() {
        assert_eq!(
            validate_description(""),
            Err(MilestoneValidationError::EmptyDescription)
        );
    }

    #[test]
    fn identity_keeps_key_verbatim() {
        let identity = Identity::new("  SP2J6ZY48GV1  ").unwrap();
        assert_eq!(identity.as_str(), "  SP2J6ZY48GV1  ");
        assert_ne!(identity, Identity::new("SP2J6ZY48GV1").unwrap());
        assert_eq!(Identity::new("   ").unwrap().as_str(), "   ");
        assert_eq!(
            Identity::new("").unwrap_err(),
            MilestoneValidationError::EmptyIdentity
        );
    }
}
