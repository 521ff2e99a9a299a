//! INI adapter. Sections become mapping items; keys before the first
//! section are top-level items.

use super::{FormatAdapter, FormatTag};
use crate::convert::{json_to_value, value_to_json};
use crate::error::{DocumentError, DocumentResult};
use crate::flatten::{flatten, unflatten};
use crate::model::{Branch, Item, METADATA_KEY, Scalar, Value};

#[derive(Clone, Copy, Debug, Default)]
pub struct IniAdapter;

struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl FormatAdapter for IniAdapter {
    fn tag(&self) -> FormatTag {
        FormatTag::Ini
    }

    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>> {
        let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::parse(FormatTag::Ini, e))?;

        let mut top_level = Vec::new();
        let mut sections: Vec<Section> = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                sections.push(Section {
                    name: name.trim().to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                DocumentError::parse(FormatTag::Ini, format!("line {}: expected key = value", number + 1))
            })?;
            let entry = (key.trim().to_string(), value.trim().replace("\\n", "\n"));
            match sections.last_mut() {
                Some(section) => section.entries.push(entry),
                None => top_level.push(entry),
            }
        }

        let mut items: Vec<Item> = top_level
            .into_iter()
            .map(|(key, value)| Item::new(key, Value::from(value)))
            .collect();
        for section in sections {
            let value = if section.name == METADATA_KEY {
                json_to_value(unflatten(section.entries)?)?
            } else {
                Value::Mapping(
                    section
                        .entries
                        .into_iter()
                        .map(|(key, value)| Item::new(key, Value::from(value)))
                        .collect(),
                )
            };
            items.push(Item::new(section.name, value));
        }

        if items.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Branch::new(items)])
    }

    fn serialize(&self, branches: &[Branch]) -> DocumentResult<Vec<u8>> {
        let branch = match branches {
            [] => return Ok(Vec::new()),
            [branch] => branch,
            _ => {
                return Err(DocumentError::serialize(
                    FormatTag::Ini,
                    "INI files hold a single document",
                ));
            }
        };

        let mut out = String::new();
        for item in branch.iter().filter(|i| !matches!(i.value, Value::Mapping(_))) {
            push_entry(&mut out, &item.key, &render(&item.key, &item.value)?);
        }

        for item in branch {
            let Value::Mapping(entries) = &item.value else {
                continue;
            };
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", item.key));
            if item.key == METADATA_KEY {
                if let serde_json::Value::Object(map) = value_to_json(&item.value)? {
                    for (key, value) in flatten(&map) {
                        push_entry(&mut out, &key, &value);
                    }
                }
                continue;
            }
            for entry in entries {
                push_entry(&mut out, &entry.key, &render(&entry.key, &entry.value)?);
            }
        }
        Ok(out.into_bytes())
    }
}

fn push_entry(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(" = ");
    out.push_str(&value.replace('\n', "\\n"));
    out.push('\n');
}

fn render(key: &str, value: &Value) -> DocumentResult<String> {
    match value {
        Value::Scalar(Scalar::String(s)) => Ok(s.clone()),
        Value::Scalar(Scalar::Null) => Ok(String::new()),
        Value::Scalar(Scalar::Bool(b)) => Ok(b.to_string()),
        Value::Scalar(Scalar::Integer(n)) => Ok(n.to_string()),
        Value::Scalar(Scalar::Float(f)) => Ok(f.to_string()),
        Value::Encrypted(enc) => Ok(enc.to_envelope_string()),
        Value::Scalar(Scalar::Bytes(_)) | Value::Sequence(_) | Value::Mapping(_) => Err(
            DocumentError::serialize(FormatTag::Ini, format!("value of {key:?} is not a flat scalar")),
        ),
    }
}
