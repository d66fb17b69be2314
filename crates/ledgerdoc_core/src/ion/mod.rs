//! Native ledger value model.
//!
//! # Responsibility
//! - Represent the self-describing typed values the ledger returns and binds.
//! - Keep struct field order exactly as produced by the ledger or caller.
//!
//! # Invariants
//! - `IonStruct` iterates in insertion order; repeated names are allowed.
//! - Typed nulls keep their declared type (`null.string`, `null.struct`, ...).
//!
//! # See also
//! - `codec` for conversion to and from plain JSON.

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::{Display, Formatter};

pub mod codec;

pub use codec::{from_json, normalize, normalize_all, struct_from_json};

/// Type tag of a native value, also carried by typed nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IonType {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Timestamp,
    Symbol,
    String,
    Clob,
    Blob,
    List,
    SExp,
    Struct,
}

impl IonType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Timestamp => "timestamp",
            Self::Symbol => "symbol",
            Self::String => "string",
            Self::Clob => "clob",
            Self::Blob => "blob",
            Self::List => "list",
            Self::SExp => "sexp",
            Self::Struct => "struct",
        }
    }
}

impl Display for IonType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arbitrary-precision decimal reduced to `coefficient * 10^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IonDecimal {
    coefficient: i64,
    exponent: i32,
}

impl IonDecimal {
    pub fn new(coefficient: i64, exponent: i32) -> Self {
        Self {
            coefficient,
            exponent,
        }
    }

    pub fn coefficient(&self) -> i64 {
        self.coefficient
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Lossy conversion used by normalization.
    pub fn to_f64(&self) -> f64 {
        self.coefficient as f64 * 10f64.powi(self.exponent)
    }
}

/// One native value as exchanged with the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum IonValue {
    Null(IonType),
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(IonDecimal),
    Timestamp(DateTime<FixedOffset>),
    String(String),
    Symbol(String),
    Blob(Vec<u8>),
    Clob(Vec<u8>),
    List(Vec<IonValue>),
    SExp(Vec<IonValue>),
    Struct(IonStruct),
}

impl IonValue {
    /// Untyped `null`.
    pub fn null() -> Self {
        Self::Null(IonType::Null)
    }

    pub fn ion_type(&self) -> IonType {
        match self {
            Self::Null(kind) => *kind,
            Self::Bool(_) => IonType::Bool,
            Self::Int(_) => IonType::Int,
            Self::Float(_) => IonType::Float,
            Self::Decimal(_) => IonType::Decimal,
            Self::Timestamp(_) => IonType::Timestamp,
            Self::String(_) => IonType::String,
            Self::Symbol(_) => IonType::Symbol,
            Self::Blob(_) => IonType::Blob,
            Self::Clob(_) => IonType::Clob,
            Self::List(_) => IonType::List,
            Self::SExp(_) => IonType::SExp,
            Self::Struct(_) => IonType::Struct,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Returns text content of string and symbol values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::Symbol(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&IonStruct> {
        match self {
            Self::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Field lookup on struct values; `None` for every other type.
    pub fn get(&self, field: &str) -> Option<&IonValue> {
        self.as_struct().and_then(|value| value.get(field))
    }
}

impl From<&str> for IonValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for IonValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for IonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for IonValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for IonValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for IonValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<DateTime<Utc>> for IonValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value.fixed_offset())
    }
}

impl From<Vec<IonValue>> for IonValue {
    fn from(value: Vec<IonValue>) -> Self {
        Self::List(value)
    }
}

impl From<IonStruct> for IonValue {
    fn from(value: IonStruct) -> Self {
        Self::Struct(value)
    }
}

/// Ordered field list of a struct value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IonStruct {
    fields: Vec<(String, IonValue)>,
}

impl IonStruct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, see [`IonStruct::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<IonValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the last value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&IonValue> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    /// Replaces the field named `name` that [`IonStruct::get`] reads (the last
    /// one) in place, or appends it.
    ///
    /// Returns the replaced value when the field already existed.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<IonValue>,
    ) -> Option<IonValue> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().rev().find(|(field, _)| *field == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Appends without checking for an existing field of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<IonValue>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IonValue)> {
        self.fields
            .iter()
            .map(|(field, value)| (field.as_str(), value))
    }

    pub fn fields(&self) -> &[(String, IonValue)] {
        &self.fields
    }
}

impl<K: Into<String>> FromIterator<(K, IonValue)> for IonStruct {
    fn from_iter<T: IntoIterator<Item = (K, IonValue)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value))
                .collect(),
        }
    }
}

impl IntoIterator for IonStruct {
    type Item = (String, IonValue);
    type IntoIter = std::vec::IntoIter<(String, IonValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
