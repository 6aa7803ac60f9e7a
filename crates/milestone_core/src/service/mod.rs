//! Core use-case services.
//!
//! # Responsibility
//! - Turn ledger calls into ordered checks plus one repository write.
//! - Keep CLI and other callers decoupled from storage details.

pub mod ledger_service;
