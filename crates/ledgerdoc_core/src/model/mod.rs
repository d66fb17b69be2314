//! Document-level policies shared by repository operations.
//!
//! # Responsibility
//! - Own the created/updated timestamp rules applied before writes.
//!
//! # Invariants
//! - Policies operate on copies; caller documents stay untouched.

pub mod timestamps;
