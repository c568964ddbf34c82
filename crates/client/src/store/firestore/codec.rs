//! Conversion between plain JSON and Firestore typed values.
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"stringValue": "Soup"}`, `{"mapValue": {"fields": {...}}}`).
//! Documents travel through the rest of the crate as plain JSON; this module
//! is the only place that knows the wire shape.

use serde_json::{Map, Number, Value, json};

use super::super::{Document, FieldPath, StoreError};

/// Encode a JSON value as a Firestore `Value`.
pub(super) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => encode_number(n),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_number(n: &Number) -> Value {
    // Integers travel as decimal strings (int64 in proto JSON).
    n.as_i64().map_or_else(
        || json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        |i| json!({ "integerValue": i.to_string() }),
    )
}

/// Encode every field of a document.
pub(super) fn encode_fields(doc: &Document) -> Map<String, Value> {
    doc.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Decode a Firestore `Value` into plain JSON.
///
/// Timestamps, references, and bytes become their string form; geo points
/// become `{"latitude", "longitude"}` objects.
pub(super) fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::Codec(format!("not a typed value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(kind, inner)),
        "integerValue" => decode_integer(inner).ok_or_else(|| mismatch(kind, inner)),
        "doubleValue" => Ok(decode_double(inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or_else(|| mismatch(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(other) => return Err(mismatch(kind, other)),
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                Some(other) => return Err(mismatch(kind, other)),
                None => Map::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(StoreError::Codec(format!("unsupported value type '{other}'"))),
    }
}

fn decode_integer(inner: &Value) -> Option<Value> {
    match inner {
        Value::String(s) => s.parse::<i64>().ok().map(Value::from),
        Value::Number(n) => n.as_i64().map(Value::from),
        _ => None,
    }
}

fn decode_double(inner: &Value) -> Value {
    // "NaN" and "Infinity" arrive as strings and have no JSON form.
    inner
        .as_f64()
        .and_then(Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn mismatch(kind: &str, inner: &Value) -> StoreError {
    StoreError::Codec(format!("malformed {kind}: {inner}"))
}

/// Decode the `fields` object of a Firestore document.
pub(super) fn decode_fields(fields: &Map<String, Value>) -> Result<Document, StoreError> {
    fields
        .iter()
        .map(|(key, value)| decode_value(value).map(|decoded| (key.clone(), decoded)))
        .collect()
}

/// Render a field path in Firestore syntax.
///
/// Segments that are not plain identifiers are wrapped in backticks with
/// `` ` `` and `\` escaped.
pub(super) fn encode_field_path(path: &FieldPath) -> String {
    path.segments()
        .iter()
        .map(|segment| {
            if is_simple_segment(segment) {
                segment.clone()
            } else {
                let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
                format!("`{escaped}`")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
