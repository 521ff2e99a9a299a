//! JSON adapter. Key order is preserved through `serde_json/preserve_order`.

use super::{FormatAdapter, FormatTag, YamlAdapter};
use crate::convert::{items_to_json, json_to_items};
use crate::error::{DocumentError, DocumentResult};
use crate::model::Branch;

/// A single JSON object per file.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonAdapter;

impl FormatAdapter for JsonAdapter {
    fn tag(&self) -> FormatTag {
        FormatTag::Json
    }

    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let json: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(json) => json,
            Err(err) => {
                // YAML saved under a JSON name must not be coerced.
                if YamlAdapter.parse(bytes).is_ok_and(|branches| !branches.is_empty()) {
                    return Err(DocumentError::FormatMismatch {
                        declared: FormatTag::Json,
                        found: FormatTag::Yaml,
                    });
                }
                return Err(DocumentError::parse(FormatTag::Json, err));
            }
        };

        match json {
            serde_json::Value::Object(map) => Ok(vec![Branch::new(json_to_items(map)?)]),
            _ => Err(DocumentError::parse(
                FormatTag::Json,
                "top-level value must be an object",
            )),
        }
    }

    fn serialize(&self, branches: &[Branch]) -> DocumentResult<Vec<u8>> {
        let branch = match branches {
            [] => return Ok(Vec::new()),
            [branch] => branch,
            _ => {
                return Err(DocumentError::serialize(
                    FormatTag::Json,
                    format!("cannot store {} documents in one JSON file", branches.len()),
                ));
            }
        };
        let object = serde_json::Value::Object(items_to_json(&branch.items)?);
        let mut out = serde_json::to_vec_pretty(&object)?;
        out.push(b'\n');
        Ok(out)
    }
}
