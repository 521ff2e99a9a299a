//! YAML adapter, including multi-document streams.

use super::{FormatAdapter, FormatTag};
use crate::error::{DocumentError, DocumentResult};
use crate::model::{Branch, Item, KeyKind, Scalar, Value};
use serde::Deserialize;
use serde_yaml::{Mapping, Number};

/// YAML documents. JSON content is accepted since YAML is a superset.
///
/// Number, boolean and null keys are held as strings and written back with
/// their original kind, so `1: one` stays an integer key.
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlAdapter;

impl FormatAdapter for YamlAdapter {
    fn tag(&self) -> FormatTag {
        FormatTag::Yaml
    }

    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>> {
        let mut branches = Vec::new();
        for document in serde_yaml::Deserializer::from_slice(bytes) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| DocumentError::parse(FormatTag::Yaml, e))?;
            match untag(value) {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Mapping(map) => branches.push(Branch::new(mapping_to_items(map)?)),
                other => {
                    return Err(DocumentError::parse(
                        FormatTag::Yaml,
                        format!("top-level document must be a mapping, found {}", kind(&other)),
                    ));
                }
            }
        }
        Ok(branches)
    }

    fn serialize(&self, branches: &[Branch]) -> DocumentResult<Vec<u8>> {
        let mut documents = Vec::with_capacity(branches.len());
        for branch in branches {
            let mapping = items_to_mapping(&branch.items)?;
            let text = serde_yaml::to_string(&serde_yaml::Value::Mapping(mapping))
                .map_err(|e| DocumentError::serialize(FormatTag::Yaml, e))?;
            documents.push(text);
        }
        Ok(documents.join("---\n").into_bytes())
    }
}

fn untag(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn mapping_to_items(map: Mapping) -> DocumentResult<Vec<Item>> {
    map.into_iter()
        .map(|(key, value)| {
            let (key, kind) = key_to_string(key)?;
            Ok(Item::new(key, yaml_to_value(value)?).with_key_kind(kind))
        })
        .collect()
}

fn key_to_string(key: serde_yaml::Value) -> DocumentResult<(String, KeyKind)> {
    match untag(key) {
        serde_yaml::Value::String(s) => Ok((s, KeyKind::String)),
        serde_yaml::Value::Number(n) => Ok((n.to_string(), KeyKind::Number)),
        serde_yaml::Value::Bool(b) => Ok((b.to_string(), KeyKind::Bool)),
        serde_yaml::Value::Null => Ok(("null".to_string(), KeyKind::Null)),
        other => Err(DocumentError::parse(
            FormatTag::Yaml,
            format!("mapping keys must be scalars, found {}", kind(&other)),
        )),
    }
}

fn yaml_to_value(value: serde_yaml::Value) -> DocumentResult<Value> {
    Ok(match untag(value) {
        serde_yaml::Value::Null => Value::null(),
        serde_yaml::Value::Bool(b) => Value::from(b),
        serde_yaml::Value::Number(n) => Value::Scalar(number_to_scalar(&n)?),
        serde_yaml::Value::String(s) => Value::from(s),
        serde_yaml::Value::Sequence(values) => Value::Sequence(
            values.into_iter().map(yaml_to_value).collect::<DocumentResult<_>>()?,
        ),
        serde_yaml::Value::Mapping(map) => Value::Mapping(mapping_to_items(map)?),
        serde_yaml::Value::Tagged(_) => {
            return Err(DocumentError::parse(FormatTag::Yaml, "nested tag"));
        }
    })
}

fn number_to_scalar(n: &Number) -> DocumentResult<Scalar> {
    if let Some(i) = n.as_i64() {
        Ok(Scalar::Integer(i))
    } else if n.is_u64() {
        Err(DocumentError::parse(FormatTag::Yaml, format!("integer {n} out of range")))
    } else {
        n.as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| DocumentError::parse(FormatTag::Yaml, format!("unsupported number {n}")))
    }
}

fn items_to_mapping(items: &[Item]) -> DocumentResult<Mapping> {
    let mut map = Mapping::with_capacity(items.len());
    for item in items {
        map.insert(key_to_yaml(item), value_to_yaml(&item.value)?);
    }
    Ok(map)
}

/// Falls back to a string key when the text no longer reads as its kind.
fn key_to_yaml(item: &Item) -> serde_yaml::Value {
    let key = item.key.as_str();
    let typed = match item.key_kind {
        KeyKind::String => None,
        KeyKind::Number => key
            .parse::<i64>()
            .map(Number::from)
            .or_else(|_| key.parse::<u64>().map(Number::from))
            .or_else(|_| key.parse::<f64>().map(Number::from))
            .ok()
            .map(serde_yaml::Value::Number),
        KeyKind::Bool => key.parse::<bool>().ok().map(serde_yaml::Value::Bool),
        KeyKind::Null => (key == "null").then_some(serde_yaml::Value::Null),
    };
    typed.unwrap_or_else(|| serde_yaml::Value::String(item.key.clone()))
}

fn value_to_yaml(value: &Value) -> DocumentResult<serde_yaml::Value> {
    Ok(match value {
        Value::Scalar(Scalar::Null) => serde_yaml::Value::Null,
        Value::Scalar(Scalar::Bool(b)) => serde_yaml::Value::Bool(*b),
        Value::Scalar(Scalar::Integer(n)) => serde_yaml::Value::Number(Number::from(*n)),
        Value::Scalar(Scalar::Float(f)) => serde_yaml::Value::Number(Number::from(*f)),
        Value::Scalar(Scalar::String(s)) => serde_yaml::Value::String(s.clone()),
        Value::Scalar(Scalar::Bytes(_)) => {
            return Err(DocumentError::serialize(
                FormatTag::Yaml,
                "raw bytes have no YAML representation",
            ));
        }
        Value::Encrypted(enc) => serde_yaml::Value::String(enc.to_envelope_string()),
        Value::Sequence(values) => serde_yaml::Value::Sequence(
            values.iter().map(value_to_yaml).collect::<DocumentResult<_>>()?,
        ),
        Value::Mapping(items) => serde_yaml::Value::Mapping(items_to_mapping(items)?),
    })
}
