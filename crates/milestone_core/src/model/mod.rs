//! Domain model for the milestone ledger.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep validation next to the data it protects.
//!
//! # Invariants
//! - Every store entry is keyed by exactly one `Identity`.
//! - Priority and deadline entries have lifecycles independent of the record.

pub mod milestone;
