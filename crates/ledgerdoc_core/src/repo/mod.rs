//! Repository layer over ledger tables.
//!
//! # Responsibility
//! - Expose use-case oriented CRUD contracts for one table at a time.
//! - Keep statement text and native values away from callers.
//!
//! # Invariants
//! - Every operation runs on a caller-supplied transaction.
//! - Driver failures are returned unchanged inside `RepoError::Driver`.

pub mod ledger_repo;

pub use ledger_repo::{LedgerRepository, RepoError, RepoResult, UpsertOutcome, DEFAULT_ID_FIELD};
