//! Milestone repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the three per-identity stores: `milestones`, `priorities`, `deadlines`.
//! - Make every write a single read-check-write transaction.
//!
//! # Invariants
//! - Write paths validate models before SQL mutations.
//! - Priority/deadline upserts require a live milestone inside the same
//!   transaction; deleting a milestone never touches the other stores.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::milestone::{
    Identity, MilestoneRecord, MilestoneValidationError, PriorityLevel, TemporalBoundary,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REQUIRED_TABLES: [&str; 3] = ["milestones", "priorities", "deadlines"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for ledger persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MilestoneValidationError),
    Db(DbError),
    /// No live milestone for the owner.
    NotFound(Identity),
    /// Owner already holds a milestone.
    AlreadyExists(Identity),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(owner) => write!(f, "milestone not found for {owner}"),
            Self::AlreadyExists(owner) => write!(f, "milestone already exists for {owner}"),
            Self::InvalidData(message) => write!(f, "invalid persisted ledger data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "ledger database is missing table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MilestoneValidationError> for RepoError {
    fn from(value: MilestoneValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for the ledger's three keyed stores.
pub trait MilestoneRepository {
    /// Inserts a new milestone; `AlreadyExists` when the owner holds one.
    fn insert_milestone(&mut self, owner: &Identity, record: &MilestoneRecord) -> RepoResult<()>;
    /// Overwrites an existing milestone; `NotFound` when absent.
    fn update_milestone(&mut self, owner: &Identity, record: &MilestoneRecord) -> RepoResult<()>;
    /// Removes the milestone only; `NotFound` when absent.
    fn delete_milestone(&mut self, owner: &Identity) -> RepoResult<()>;
    fn get_milestone(&self, owner: &Identity) -> RepoResult<Option<MilestoneRecord>>;
    /// Upserts the priority entry; `NotFound` without a live milestone.
    fn upsert_priority(&mut self, owner: &Identity, level: PriorityLevel) -> RepoResult<()>;
    fn get_priority(&self, owner: &Identity) -> RepoResult<Option<PriorityLevel>>;
    /// Upserts the deadline entry; `NotFound` without a live milestone.
    fn upsert_deadline(&mut self, owner: &Identity, boundary: &TemporalBoundary)
        -> RepoResult<()>;
    fn get_deadline(&self, owner: &Identity) -> RepoResult<Option<TemporalBoundary>>;
}

/// SQLite-backed ledger repository.
pub struct SqliteMilestoneRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMilestoneRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails with `MissingRequiredTable` when migrations were not applied.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    fn write_tx(&mut self) -> RepoResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

impl MilestoneRepository for SqliteMilestoneRepository<'_> {
    fn insert_milestone(&mut self, owner: &Identity, record: &MilestoneRecord) -> RepoResult<()> {
        record.validate()?;

        let tx = self.write_tx()?;
        if milestone_exists_in_tx(&tx, owner)? {
            return Err(RepoError::AlreadyExists(owner.clone()));
        }
        tx.execute(
            "INSERT INTO milestones (owner, description, completed) VALUES (?1, ?2, ?3);",
            params![
                owner.as_str(),
                record.description.as_str(),
                bool_to_int(record.completed)
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_milestone(&mut self, owner: &Identity, record: &MilestoneRecord) -> RepoResult<()> {
        record.validate()?;

        let changed = self.conn.execute(
            "UPDATE milestones
             SET
                description = ?2,
                completed = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE owner = ?1;",
            params![
                owner.as_str(),
                record.description.as_str(),
                bool_to_int(record.completed)
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(owner.clone()));
        }
        Ok(())
    }

    fn delete_milestone(&mut self, owner: &Identity) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM milestones WHERE owner = ?1;",
            [owner.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(owner.clone()));
        }
        Ok(())
    }

    fn get_milestone(&self, owner: &Identity) -> RepoResult<Option<MilestoneRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT description, completed FROM milestones WHERE owner = ?1;",
                [owner.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((description, completed)) = row else {
            return Ok(None);
        };
        let record = MilestoneRecord {
            description,
            completed: int_to_bool(completed, "milestones.completed")?,
        };
        record.validate().map_err(|err| {
            RepoError::InvalidData(format!("milestones.description for {owner}: {err}"))
        })?;
        Ok(Some(record))
    }

    fn upsert_priority(&mut self, owner: &Identity, level: PriorityLevel) -> RepoResult<()> {
        let tx = self.write_tx()?;
        if !milestone_exists_in_tx(&tx, owner)? {
            return Err(RepoError::NotFound(owner.clone()));
        }
        tx.execute(
            "INSERT INTO priorities (owner, level) VALUES (?1, ?2)
             ON CONFLICT(owner) DO UPDATE SET
                level = excluded.level,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![owner.as_str(), level.get()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_priority(&self, owner: &Identity) -> RepoResult<Option<PriorityLevel>> {
        let level = self
            .conn
            .query_row(
                "SELECT level FROM priorities WHERE owner = ?1;",
                [owner.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        level
            .map(|value| {
                u32::try_from(value)
                    .ok()
                    .and_then(|value| PriorityLevel::try_from(value).ok())
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "invalid priority level `{value}` in priorities.level"
                        ))
                    })
            })
            .transpose()
    }

    fn upsert_deadline(
        &mut self,
        owner: &Identity,
        boundary: &TemporalBoundary,
    ) -> RepoResult<()> {
        let target_height = i64::try_from(boundary.target_height).map_err(|_| {
            RepoError::InvalidData(format!(
                "target height {} exceeds storable range",
                boundary.target_height
            ))
        })?;

        let tx = self.write_tx()?;
        if !milestone_exists_in_tx(&tx, owner)? {
            return Err(RepoError::NotFound(owner.clone()));
        }
        tx.execute(
            "INSERT INTO deadlines (owner, target_height, alerted) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner) DO UPDATE SET
                target_height = excluded.target_height,
                alerted = excluded.alerted,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![owner.as_str(), target_height, bool_to_int(boundary.alerted)],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_deadline(&self, owner: &Identity) -> RepoResult<Option<TemporalBoundary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT target_height, alerted FROM deadlines WHERE owner = ?1;")?;
        let mut rows = stmt.query([owner.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_deadline_row(row)?));
        }
        Ok(None)
    }
}

fn parse_deadline_row(row: &Row<'_>) -> RepoResult<TemporalBoundary> {
    let raw_height: i64 = row.get("target_height")?;
    let target_height = u64::try_from(raw_height).map_err(|_| {
        RepoError::InvalidData(format!(
            "negative target height `{raw_height}` in deadlines.target_height"
        ))
    })?;
    Ok(TemporalBoundary {
        target_height,
        alerted: int_to_bool(row.get("alerted")?, "deadlines.alerted")?,
    })
}

fn milestone_exists_in_tx(tx: &Transaction<'_>, owner: &Identity) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM milestones WHERE owner = ?1);",
        [owner.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}
