//! Conversion between native ledger values and plain JSON.
//!
//! # Responsibility
//! - Normalize result rows into JSON-safe trees for callers.
//! - Lift caller-supplied JSON into native values for parameter binding.
//!
//! # Invariants
//! - Field names and field order survive normalization.
//! - `normalize(from_json(normalize(x))) == normalize(x)`.
//! - Types JSON cannot carry are flattened: timestamps become RFC 3339
//!   strings, symbols become strings, lobs become base64 strings, decimals
//!   and floats become f64 numbers, non-finite numbers become `null`.

use super::{IonStruct, IonValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Number, Value as JsonValue};

/// Converts one native value into plain JSON.
pub fn normalize(value: &IonValue) -> JsonValue {
    match value {
        IonValue::Null(_) => JsonValue::Null,
        IonValue::Bool(value) => JsonValue::Bool(*value),
        IonValue::Int(value) => JsonValue::from(*value),
        IonValue::Float(value) => float_to_json(*value),
        IonValue::Decimal(value) => float_to_json(value.to_f64()),
        IonValue::Timestamp(value) => JsonValue::String(
            value
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        IonValue::String(value) | IonValue::Symbol(value) => JsonValue::String(value.clone()),
        IonValue::Blob(bytes) | IonValue::Clob(bytes) => JsonValue::String(STANDARD.encode(bytes)),
        IonValue::List(items) | IonValue::SExp(items) => {
            JsonValue::Array(items.iter().map(normalize).collect())
        }
        IonValue::Struct(fields) => JsonValue::Object(struct_to_json(fields)),
    }
}

/// Converts a list of result rows.
pub fn normalize_all(values: &[IonValue]) -> Vec<JsonValue> {
    values.iter().map(normalize).collect()
}

/// Lifts plain JSON into a native value for binding as a parameter.
pub fn from_json(value: &JsonValue) -> IonValue {
    match value {
        JsonValue::Null => IonValue::null(),
        JsonValue::Bool(value) => IonValue::Bool(*value),
        JsonValue::Number(number) => match number.as_i64() {
            Some(integer) => IonValue::Int(integer),
            None => IonValue::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(value) => IonValue::String(value.clone()),
        JsonValue::Array(items) => IonValue::List(items.iter().map(from_json).collect()),
        JsonValue::Object(map) => IonValue::Struct(struct_from_json(map)),
    }
}

/// Lifts a JSON object into a struct, keeping key order.
pub fn struct_from_json(map: &Map<String, JsonValue>) -> IonStruct {
    map.iter()
        .map(|(name, value)| (name.clone(), from_json(value)))
        .collect()
}

fn struct_to_json(fields: &IonStruct) -> Map<String, JsonValue> {
    let mut map = Map::with_capacity(fields.len());
    for (name, value) in fields.iter() {
        // Repeated names collapse onto the first key position, last value wins.
        map.insert(name.to_string(), normalize(value));
    }
    map
}

fn float_to_json(value: f64) -> JsonValue {
    Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::{from_json, normalize, normalize_all};
    use crate::ion::{IonDecimal, IonStruct, IonType, IonValue};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn normalize_converts_nested_structs_and_lists() {
        let row = IonStruct::new()
            .with("name", "Ann")
            .with("age", 41)
            .with("active", true)
            .with(
                "emails",
                vec![IonValue::Struct(IonStruct::new().with("email", "a@x.io"))],
            )
            .with("nickname", IonValue::Null(IonType::String));

        assert_eq!(
            normalize(&IonValue::Struct(row)),
            json!({
                "name": "Ann",
                "age": 41,
                "active": true,
                "emails": [{"email": "a@x.io"}],
                "nickname": null
            })
        );
    }

    #[test]
    fn normalize_preserves_field_order() {
        let row = IonStruct::new().with("z", 1).with("a", 2).with("m", 3);
        let normalized = normalize(&IonValue::Struct(row));
        let keys = normalized
            .as_object()
            .expect("struct normalizes to object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn timestamps_render_as_utc_millisecond_strings() {
        let instant: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            normalize(&IonValue::from(instant)),
            json!("2024-03-09T14:05:07.000Z")
        );

        let offset = DateTime::parse_from_rfc3339("2024-03-09T16:05:07.250+02:00").unwrap();
        assert_eq!(
            normalize(&IonValue::Timestamp(offset)),
            json!("2024-03-09T14:05:07.250Z")
        );
    }

    #[test]
    fn lossy_types_flatten_to_json_primitives() {
        assert_eq!(normalize(&IonValue::Symbol("active".into())), json!("active"));
        assert_eq!(normalize(&IonValue::Blob(vec![1, 2, 3])), json!("AQID"));
        assert_eq!(
            normalize(&IonValue::Decimal(IonDecimal::new(1250, -2))),
            json!(12.5)
        );
        assert_eq!(normalize(&IonValue::Float(f64::NAN)), json!(null));
        assert_eq!(normalize(&IonValue::Float(f64::INFINITY)), json!(null));
        assert_eq!(
            normalize(&IonValue::SExp(vec![IonValue::Int(1), IonValue::from("x")])),
            json!([1, "x"])
        );
    }

    #[test]
    fn repeated_field_keeps_last_value() {
        let mut row = IonStruct::new();
        row.push("status", "draft");
        row.push("status", "final");
        assert_eq!(normalize(&IonValue::Struct(row)), json!({"status": "final"}));
    }

    #[test]
    fn from_json_distinguishes_integers_from_floats() {
        assert_eq!(from_json(&json!(7)), IonValue::Int(7));
        assert_eq!(from_json(&json!(7.5)), IonValue::Float(7.5));
        assert_eq!(from_json(&json!(null)), IonValue::null());
        assert_eq!(
            from_json(&json!({"b": 1, "a": [true]})),
            IonValue::Struct(
                IonStruct::new()
                    .with("b", 1)
                    .with("a", vec![IonValue::Bool(true)])
            )
        );
    }

    #[test]
    fn normalization_is_idempotent_for_json_trees() {
        let samples = vec![
            json!(null),
            json!(true),
            json!(-3),
            json!(2.75),
            json!("text"),
            json!([1, "two", [3.5, null], {"k": false}]),
            json!({"outer": {"inner": [{"deep": "x"}], "n": 0}, "list": []}),
        ];

        for sample in samples {
            let once = normalize(&from_json(&sample));
            let twice = normalize(&from_json(&once));
            assert_eq!(once, sample);
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn normalize_all_maps_each_row() {
        let rows = vec![
            IonValue::Struct(IonStruct::new().with("documentId", "a")),
            IonValue::Struct(IonStruct::new().with("documentId", "b")),
        ];
        assert_eq!(
            normalize_all(&rows),
            vec![json!({"documentId": "a"}), json!({"documentId": "b"})]
        );
    }
}
