//! dotenv adapter: `KEY=VALUE` lines.

use super::{FormatAdapter, FormatTag};
use crate::convert::{json_to_value, value_to_json};
use crate::error::{DocumentError, DocumentResult};
use crate::flatten::{flatten, unflatten};
use crate::model::{Branch, Item, METADATA_KEY, Scalar, Value};

const METADATA_PREFIX: &str = "sops_";

#[derive(Clone, Copy, Debug, Default)]
pub struct DotenvAdapter;

impl FormatAdapter for DotenvAdapter {
    fn tag(&self) -> FormatTag {
        FormatTag::Dotenv
    }

    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>> {
        let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::parse(FormatTag::Dotenv, e))?;

        let mut items = Vec::new();
        let mut metadata = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| {
                DocumentError::parse(FormatTag::Dotenv, format!("line {}: missing '='", number + 1))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DocumentError::parse(
                    FormatTag::Dotenv,
                    format!("line {}: empty key", number + 1),
                ));
            }
            let value = value.replace("\\n", "\n");
            match key.strip_prefix(METADATA_PREFIX) {
                Some(meta_key) => metadata.push((meta_key.to_string(), value)),
                None => items.push(Item::new(key, Value::from(value))),
            }
        }

        if !metadata.is_empty() {
            items.push(Item::new(METADATA_KEY, json_to_value(unflatten(metadata)?)?));
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
                    FormatTag::Dotenv,
                    "dotenv files hold a single document",
                ));
            }
        };

        let mut out = String::new();
        for item in branch {
            if item.key == METADATA_KEY {
                if let serde_json::Value::Object(map) = value_to_json(&item.value)? {
                    for (key, value) in flatten(&map) {
                        push_line(&mut out, &format!("{METADATA_PREFIX}{key}"), &value);
                    }
                    continue;
                }
            }
            push_line(&mut out, &item.key, &render(&item.key, &item.value)?);
        }
        Ok(out.into_bytes())
    }
}

fn push_line(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
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
        Value::Scalar(Scalar::Bytes(_)) | Value::Sequence(_) | Value::Mapping(_) => {
            Err(DocumentError::serialize(
                FormatTag::Dotenv,
                format!("value of {key:?} is not a flat scalar"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_comments() {
        let branches = DotenvAdapter
            .parse(b"# comment\nA=1\n\nB=multi\\nline\nC=a=b\n")
            .unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].get("A"), Some(&Value::from("1")));
        assert_eq!(branches[0].get("B"), Some(&Value::from("multi\nline")));
        assert_eq!(branches[0].get("C"), Some(&Value::from("a=b")));
    }

    #[test]
    fn folds_metadata_keys() {
        let branches = DotenvAdapter
            .parse(b"A=1\nsops_mac=abc\nsops_key_groups__list_0__map_age__list_0__map_enc=x\n")
            .unwrap();
        let Some(Value::Mapping(meta)) = branches[0].get(METADATA_KEY) else {
            panic!("metadata not folded");
        };
        assert_eq!(meta[0].key, "mac");
        assert_eq!(meta[1].key, "key_groups");
    }

    #[test]
    fn serialize_escapes_newlines() {
        let branch = Branch::new(vec![Item::new("A", Value::from("x\ny"))]);
        let out = DotenvAdapter.serialize(&[branch]).unwrap();
        assert_eq!(out, b"A=x\\ny\n");
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(DotenvAdapter.parse(b"JUSTAKEY\n").is_err());
    }

    #[test]
    fn rejects_nested_values() {
        let branch = Branch::new(vec![Item::new("A", Value::Sequence(vec![]))]);
        assert!(DotenvAdapter.serialize(&[branch]).is_err());
    }
}
