//! Tagged predicate clauses.
//!
//! A predicate is converted once, at the boundary, into clauses that carry
//! their comparison operator. Renderers never inspect value shapes again.

use crate::ion::{normalize, IonStruct, IonValue};
use std::fmt::{Display, Formatter};

/// Comparison used by one predicate clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    In,
}

impl Operator {
    /// Lists select membership; every other value selects equality.
    pub fn for_value(value: &IonValue) -> Self {
        match value {
            IonValue::List(_) => Self::In,
            _ => Self::Equals,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::In => "IN",
        }
    }
}

/// One `field <operator> ?` condition and its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub operator: Operator,
    pub value: IonValue,
}

impl Clause {
    pub fn new(field: impl Into<String>, value: impl Into<IonValue>) -> Self {
        let value = value.into();
        Self {
            field: field.into(),
            operator: Operator::for_value(&value),
            value,
        }
    }
}

/// AND-conjunction of clauses in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds clauses from a filter mapping, keeping its field order.
    pub fn from_struct(filter: &IonStruct) -> Self {
        filter
            .iter()
            .map(|(field, value)| Clause::new(field, value.clone()))
            .collect()
    }

    /// Single equality clause on the id field.
    pub fn by_id(id_field: &str, id: impl Into<String>) -> Self {
        Self::new().and(id_field, IonValue::String(id.into()))
    }

    /// Appends one clause; the operator follows the value shape.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<IonValue>) -> Self {
        self.clauses.push(Clause::new(field, value));
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Equality clauses only, in order.
    pub fn equalities(&self) -> impl Iterator<Item = &Clause> {
        self.clauses
            .iter()
            .filter(|clause| clause.operator == Operator::Equals)
    }
}

impl FromIterator<Clause> for Predicate {
    fn from_iter<T: IntoIterator<Item = Clause>>(iter: T) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}

impl From<IonStruct> for Predicate {
    fn from(value: IonStruct) -> Self {
        Self::from_struct(&value)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{} {} {}",
                clause.field,
                clause.operator.as_sql(),
                normalize(&clause.value)
            )?;
        }
        f.write_str("}")
    }
}
