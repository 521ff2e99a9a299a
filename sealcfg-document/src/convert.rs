//! Conversions between the model and `serde_json::Value`.

use crate::error::{DocumentError, DocumentResult};
use crate::format::FormatTag;
use crate::model::{Item, Scalar, Value};
use serde_json::{Map, Number};

/// Converts a model value to JSON. Encrypted leaves become their `ENC[...]` string.
pub fn value_to_json(value: &Value) -> DocumentResult<serde_json::Value> {
    Ok(match value {
        Value::Scalar(scalar) => scalar_to_json(scalar)?,
        Value::Encrypted(enc) => serde_json::Value::String(enc.to_envelope_string()),
        Value::Sequence(values) => serde_json::Value::Array(
            values.iter().map(value_to_json).collect::<DocumentResult<_>>()?,
        ),
        Value::Mapping(items) => serde_json::Value::Object(items_to_json(items)?),
    })
}

pub(crate) fn items_to_json(items: &[Item]) -> DocumentResult<Map<String, serde_json::Value>> {
    let mut map = Map::with_capacity(items.len());
    for item in items {
        map.insert(item.key.clone(), value_to_json(&item.value)?);
    }
    Ok(map)
}

fn scalar_to_json(scalar: &Scalar) -> DocumentResult<serde_json::Value> {
    Ok(match scalar {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Integer(n) => serde_json::Value::Number((*n).into()),
        Scalar::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| DocumentError::serialize(FormatTag::Json, format!("non-finite float {f}")))?,
        Scalar::String(s) => serde_json::Value::String(s.clone()),
        Scalar::Bytes(_) => {
            return Err(DocumentError::serialize(
                FormatTag::Json,
                "raw bytes have no JSON representation",
            ));
        }
    })
}

/// Converts JSON into a model value. Strings stay plain strings.
pub fn json_to_value(json: serde_json::Value) -> DocumentResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::null(),
        serde_json::Value::Bool(b) => Value::from(b),
        serde_json::Value::Number(n) => Value::Scalar(number_to_scalar(&n)?),
        serde_json::Value::String(s) => Value::from(s),
        serde_json::Value::Array(values) => Value::Sequence(
            values.into_iter().map(json_to_value).collect::<DocumentResult<_>>()?,
        ),
        serde_json::Value::Object(map) => Value::Mapping(json_to_items(map)?),
    })
}

pub(crate) fn json_to_items(map: Map<String, serde_json::Value>) -> DocumentResult<Vec<Item>> {
    map.into_iter()
        .map(|(key, value)| Ok(Item::new(key, json_to_value(value)?)))
        .collect()
}

fn number_to_scalar(n: &Number) -> DocumentResult<Scalar> {
    if let Some(i) = n.as_i64() {
        Ok(Scalar::Integer(i))
    } else if n.is_u64() {
        Err(DocumentError::parse(FormatTag::Json, format!("integer {n} out of range")))
    } else {
        n.as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| DocumentError::parse(FormatTag::Json, format!("unsupported number {n}")))
    }
}
