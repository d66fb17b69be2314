//! Per-call payloads accepted from the host.
//!
//! Field names follow the host's camelCase JSON; `where` is a keyword in
//! Rust and is exposed as `predicate`. Every payload may name a table that
//! overrides the configured default.

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;

pub type JsonObject = Map<String, JsonValue>;

/// `create`: document to insert.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayload {
    pub json: JsonObject,
    #[serde(default)]
    pub table: Option<String>,
}

/// `read` and `delete`: equality/membership filter.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterPayload {
    #[serde(default)]
    pub json: JsonObject,
    #[serde(default)]
    pub table: Option<String>,
}

/// `readById` and `deleteById`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdPayload {
    pub id: String,
    #[serde(default)]
    pub table: Option<String>,
}

/// `update` and `upsert`.
#[derive(Debug, Clone, Deserialize)]
pub struct WherePayload {
    pub document: JsonObject,
    #[serde(rename = "where")]
    pub predicate: JsonObject,
    #[serde(default)]
    pub table: Option<String>,
}

/// `updateById`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentByIdPayload {
    pub document: JsonObject,
    pub id: String,
    #[serde(default)]
    pub table: Option<String>,
}

/// `insertInto`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertIntoPayload {
    pub field: String,
    pub document: JsonValue,
    #[serde(rename = "where")]
    pub predicate: JsonObject,
    #[serde(default)]
    pub table: Option<String>,
}

/// `insertIntoById`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertIntoByIdPayload {
    pub field: String,
    pub document: JsonValue,
    pub id: String,
    #[serde(default)]
    pub table: Option<String>,
}

/// Host-visible operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    ReadById,
    Update,
    UpdateById,
    Upsert,
    InsertInto,
    InsertIntoById,
    Delete,
    DeleteById,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Create,
        Operation::Read,
        Operation::ReadById,
        Operation::Update,
        Operation::UpdateById,
        Operation::Upsert,
        Operation::InsertInto,
        Operation::InsertIntoById,
        Operation::Delete,
        Operation::DeleteById,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::ReadById => "readById",
            Self::Update => "update",
            Self::UpdateById => "updateById",
            Self::Upsert => "upsert",
            Self::InsertInto => "insertInto",
            Self::InsertIntoById => "insertIntoById",
            Self::Delete => "delete",
            Self::DeleteById => "deleteById",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == value)
            .ok_or_else(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{InsertIntoPayload, Operation, WherePayload};
    use serde_json::json;

    #[test]
    fn operation_names_round_trip() {
        for operation in Operation::ALL {
            assert_eq!(operation.as_str().parse::<Operation>(), Ok(operation));
        }
        assert_eq!("read_by_id".parse::<Operation>(), Err("read_by_id".to_string()));
    }

    #[test]
    fn where_key_maps_to_predicate() {
        let payload: WherePayload = serde_json::from_value(json!({
            "document": {"name": "Ann"},
            "where": {"email": "ann@example.com"}
        }))
        .unwrap();
        assert_eq!(payload.predicate["email"], json!("ann@example.com"));
        assert_eq!(payload.table, None);
    }

    #[test]
    fn insert_into_accepts_any_document_shape() {
        let payload: InsertIntoPayload = serde_json::from_value(json!({
            "field": "tags",
            "document": "vip",
            "where": {"documentId": "doc-1"},
            "table": "people"
        }))
        .unwrap();
        assert_eq!(payload.document, json!("vip"));
        assert_eq!(payload.table.as_deref(), Some("people"));
    }
}
