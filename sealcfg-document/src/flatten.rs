//! Flattening of nested metadata for line-oriented formats.
//!
//! dotenv and INI cannot hold nested values, so the metadata block is
//! stored as flat keys: `key_groups__list_0__map_age__list_0__map_enc`.

use crate::error::{DocumentError, DocumentResult};
use serde_json::{Map, Value as Json};

const LIST_MARKER: &str = "__list_";
const MAP_MARKER: &str = "__map_";

/// Flattens a JSON object into `(key, value)` string pairs.
pub fn flatten(object: &Map<String, Json>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in object {
        flatten_into(key.clone(), value, &mut out);
    }
    out
}

fn flatten_into(prefix: String, value: &Json, out: &mut Vec<(String, String)>) {
    match value {
        Json::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{prefix}{MAP_MARKER}{key}"), child, out);
            }
        }
        Json::Array(values) => {
            for (index, child) in values.iter().enumerate() {
                flatten_into(format!("{prefix}{LIST_MARKER}{index}"), child, out);
            }
        }
        Json::String(s) => out.push((prefix, s.clone())),
        Json::Null => out.push((prefix, String::new())),
        other => out.push((prefix, other.to_string())),
    }
}

/// Rebuilds a JSON object from flattened pairs. Every leaf is a string.
pub fn unflatten<I, K, V>(pairs: I) -> DocumentResult<Json>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut root = Json::Object(Map::new());
    for (key, value) in pairs {
        let key = key.as_ref();
        let path = parse_path(key)
            .ok_or_else(|| DocumentError::Metadata(format!("bad flattened key {key:?}")))?;
        insert(&mut root, &path, value.into(), key)?;
    }
    Ok(root)
}

enum Segment {
    Key(String),
    Index(usize),
}

fn split_marker(s: &str) -> (&str, &str) {
    let next = [s.find(LIST_MARKER), s.find(MAP_MARKER)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(s.len());
    s.split_at(next)
}

fn parse_path(key: &str) -> Option<Vec<Segment>> {
    let (head, mut rest) = split_marker(key);
    if head.is_empty() {
        return None;
    }
    let mut path = vec![Segment::Key(head.to_string())];
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix(LIST_MARKER) {
            let (index, next) = split_marker(tail);
            path.push(Segment::Index(index.parse().ok()?));
            rest = next;
        } else if let Some(tail) = rest.strip_prefix(MAP_MARKER) {
            let (name, next) = split_marker(tail);
            path.push(Segment::Key(name.to_string()));
            rest = next;
        } else {
            return None;
        }
    }
    Some(path)
}

fn insert(node: &mut Json, path: &[Segment], leaf: String, key: &str) -> DocumentResult<()> {
    let Some((first, rest)) = path.split_first() else {
        *node = Json::String(leaf);
        return Ok(());
    };
    let conflict = || DocumentError::Metadata(format!("conflicting flattened key {key:?}"));
    match first {
        Segment::Key(name) => {
            if node.is_null() {
                *node = Json::Object(Map::new());
            }
            let map = node.as_object_mut().ok_or_else(conflict)?;
            let child = map.entry(name.clone()).or_insert(Json::Null);
            insert(child, rest, leaf, key)
        }
        Segment::Index(index) => {
            if node.is_null() {
                *node = Json::Array(Vec::new());
            }
            let values = node.as_array_mut().ok_or_else(conflict)?;
            // Indices must be dense, as `flatten` emits them.
            if *index == values.len() {
                values.push(Json::Null);
            }
            let child = values.get_mut(*index).ok_or_else(|| {
                DocumentError::Metadata(format!("list index out of order in flattened key {key:?}"))
            })?;
            insert(child, rest, leaf, key)
        }
    }
}
