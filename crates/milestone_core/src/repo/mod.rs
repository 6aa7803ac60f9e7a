//! Repository layer for the ledger stores.
//!
//! # Responsibility
//! - Define the storage contract the ledger service depends on.
//! - Isolate SQLite query details from ledger rules.
//!
//! # Invariants
//! - Repository writes validate models before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`) in
//!   addition to DB transport errors.

pub mod milestone_repo;
