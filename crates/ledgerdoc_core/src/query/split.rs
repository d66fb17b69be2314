//! Field/value splitting.
//!
//! # Invariants
//! - `fields[i]` always binds `values[i]`; order follows the input mapping.

use super::predicate::{Operator, Predicate};
use crate::ion::{IonStruct, IonValue};

/// Parallel field names and values of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitFields {
    pub fields: Vec<String>,
    pub values: Vec<IonValue>,
}

/// Field name plus operator of one predicate clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseShape {
    pub field: String,
    pub operator: Operator,
}

/// Parallel clause shapes and values of a predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitClauses {
    pub clauses: Vec<ClauseShape>,
    pub values: Vec<IonValue>,
}

pub fn split_fields(document: &IonStruct) -> SplitFields {
    let (fields, values) = document
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .unzip();
    SplitFields { fields, values }
}

pub fn split_clauses(predicate: &Predicate) -> SplitClauses {
    let (clauses, values) = predicate
        .clauses()
        .iter()
        .map(|clause| {
            (
                ClauseShape {
                    field: clause.field.clone(),
                    operator: clause.operator,
                },
                clause.value.clone(),
            )
        })
        .unzip();
    SplitClauses { clauses, values }
}
