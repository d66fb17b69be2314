//! Parameterized statement assembly.
//!
//! # Responsibility
//! - Render select/insert/insert-into/update/delete text for one table.
//! - Collect bound parameters in placeholder order.
//!
//! # Invariants
//! - Only names are interpolated; values are always `?` parameters.
//! - Table and id-field names are plain identifiers; field paths are quoted
//!   per segment.
//! - Every statement ends with `;`.

use super::predicate::Predicate;
use super::split::{split_clauses, split_fields, ClauseShape};
use super::{StatementError, StatementResult};
use crate::ion::{IonStruct, IonValue};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Alias bound to the target row in insert-into statements.
const ROW_ALIAS: &str = "t";

/// Rendered statement text plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<IonValue>,
}

/// Renders statements against one table keyed by one id field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementBuilder {
    table: String,
    id_field: String,
}

impl StatementBuilder {
    /// Creates a builder after validating both identifiers.
    ///
    /// # Errors
    /// - `StatementError::InvalidIdentifier` for names outside `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn new(table: impl Into<String>, id_field: impl Into<String>) -> StatementResult<Self> {
        let table = table.into();
        let id_field = id_field.into();
        validate_identifier("table", &table)?;
        validate_identifier("id field", &id_field)?;
        Ok(Self { table, id_field })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn select_all(&self) -> Statement {
        Statement {
            text: format!("SELECT * FROM {} BY {};", self.table, self.id_field),
            params: Vec::new(),
        }
    }

    /// Selects rows matching every clause. An empty predicate matches all rows.
    pub fn select_by(&self, predicate: &Predicate) -> StatementResult<Statement> {
        if predicate.is_empty() {
            return Ok(self.select_all());
        }

        let split = split_clauses(predicate);
        let conditions = join_conditions(&split.clauses)?;
        Ok(Statement {
            text: format!(
                "SELECT * FROM {} BY {} WHERE {conditions};",
                self.table, self.id_field
            ),
            params: split.values,
        })
    }

    pub fn insert(&self, document: IonStruct) -> Statement {
        Statement {
            text: format!("INSERT INTO {} VALUE ?;", self.table),
            params: vec![IonValue::Struct(document)],
        }
    }

    /// Appends `value` into the nested `field` of rows matching `predicate`.
    ///
    /// Predicate values bind first, the appended value binds last.
    pub fn insert_into(
        &self,
        field: &str,
        value: IonValue,
        predicate: &Predicate,
    ) -> StatementResult<Statement> {
        require_predicate("insert_into", predicate)?;
        let target = escape_field(field)?;
        let split = split_clauses(predicate);
        let conditions = join_conditions(&split.clauses)?;

        let mut params = split.values;
        params.push(value);
        Ok(Statement {
            text: format!(
                "FROM {} AS {ROW_ALIAS} BY {} WHERE {conditions} INSERT INTO {ROW_ALIAS}.{target} VALUE ?;",
                self.table, self.id_field
            ),
            params,
        })
    }

    /// Sets every document field on rows matching `predicate`.
    ///
    /// Assignment values bind before predicate values.
    pub fn update(
        &self,
        document: &IonStruct,
        predicate: &Predicate,
    ) -> StatementResult<Statement> {
        require_predicate("update", predicate)?;
        if document.is_empty() {
            return Err(StatementError::EmptyAssignment);
        }

        let assignments = split_fields(document);
        let clauses = split_clauses(predicate);
        let set_list = assignments
            .fields
            .iter()
            .map(|field| escape_field(field).map(|escaped| format!("{escaped} = ?")))
            .collect::<StatementResult<Vec<_>>>()?
            .join(", ");
        let conditions = join_conditions(&clauses.clauses)?;

        let mut params = assignments.values;
        params.extend(clauses.values);
        Ok(Statement {
            text: format!(
                "UPDATE {} BY {} SET {set_list} WHERE {conditions};",
                self.table, self.id_field
            ),
            params,
        })
    }

    pub fn delete(&self, predicate: &Predicate) -> StatementResult<Statement> {
        require_predicate("delete", predicate)?;
        let split = split_clauses(predicate);
        let conditions = join_conditions(&split.clauses)?;
        Ok(Statement {
            text: format!(
                "DELETE FROM {} BY {} WHERE {conditions};",
                self.table, self.id_field
            ),
            params: split.values,
        })
    }
}

/// Quotes each `.`-separated segment of a field path.
///
/// `a.b` renders as `"a"."b"`; embedded quotes are doubled.
pub fn escape_field(field: &str) -> StatementResult<String> {
    field
        .split('.')
        .map(|segment| {
            if segment.is_empty() {
                Err(StatementError::InvalidField(field.to_string()))
            } else {
                Ok(format!("\"{}\"", segment.replace('"', "\"\"")))
            }
        })
        .collect::<StatementResult<Vec<_>>>()
        .map(|segments| segments.join("."))
}

pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

fn validate_identifier(kind: &'static str, value: &str) -> StatementResult<()> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(StatementError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

fn require_predicate(operation: &'static str, predicate: &Predicate) -> StatementResult<()> {
    if predicate.is_empty() {
        return Err(StatementError::EmptyPredicate { operation });
    }
    Ok(())
}

fn join_conditions(clauses: &[ClauseShape]) -> StatementResult<String> {
    clauses
        .iter()
        .map(|clause| {
            escape_field(&clause.field)
                .map(|escaped| format!("{escaped} {} ?", clause.operator.as_sql()))
        })
        .collect::<StatementResult<Vec<_>>>()
        .map(|conditions| conditions.join(" AND "))
}
