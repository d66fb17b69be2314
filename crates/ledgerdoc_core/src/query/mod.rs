//! Query construction for ledger tables.
//!
//! # Responsibility
//! - Turn filters and documents into tagged clauses and parallel value lists.
//! - Render parameterized statement text.
//!
//! # Invariants
//! - Statement text never embeds a caller value.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod predicate;
pub mod split;
pub mod statement;

pub use predicate::{Clause, Operator, Predicate};
pub use split::{split_clauses, split_fields, ClauseShape, SplitClauses, SplitFields};
pub use statement::{escape_field, is_identifier, Statement, StatementBuilder};

pub type StatementResult<T> = Result<T, StatementError>;

/// Statement assembly failures. Raised before anything is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    InvalidIdentifier { kind: &'static str, value: String },
    InvalidField(String),
    EmptyPredicate { operation: &'static str },
    EmptyAssignment,
}

impl Display for StatementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier { kind, value } => {
                write!(f, "invalid {kind} name `{value}`")
            }
            Self::InvalidField(field) => write!(f, "invalid field path `{field}`"),
            Self::EmptyPredicate { operation } => {
                write!(f, "{operation} requires at least one predicate field")
            }
            Self::EmptyAssignment => write!(f, "update requires at least one field to set"),
        }
    }
}

impl Error for StatementError {}
