//! Binary adapter: the whole file is one `data` leaf.
//!
//! The encrypted form is stored as JSON because raw bytes have nowhere to
//! hold the metadata block.

use super::{FormatAdapter, FormatTag, JsonAdapter, split_metadata};
use crate::error::{DocumentError, DocumentResult};
use crate::model::{Branch, Document, Item, METADATA_KEY, Scalar, Value};

/// Key of the single item holding the file contents.
pub const DATA_KEY: &str = "data";

#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryAdapter;

impl FormatAdapter for BinaryAdapter {
    fn tag(&self) -> FormatTag {
        FormatTag::Binary
    }

    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let scalar = match std::str::from_utf8(bytes) {
            Ok(text) => Scalar::String(text.to_string()),
            Err(_) => Scalar::Bytes(bytes.to_vec()),
        };
        Ok(vec![Branch::new(vec![Item::new(DATA_KEY, Value::Scalar(scalar))])])
    }

    fn serialize(&self, branches: &[Branch]) -> DocumentResult<Vec<u8>> {
        let Some(branch) = branches.first() else {
            return Ok(Vec::new());
        };
        match branch.get(DATA_KEY) {
            Some(Value::Scalar(Scalar::String(text))) => Ok(text.clone().into_bytes()),
            Some(Value::Scalar(Scalar::Bytes(bytes))) => Ok(bytes.clone()),
            Some(Value::Scalar(Scalar::Null)) | None => Ok(Vec::new()),
            Some(_) => Err(DocumentError::serialize(
                FormatTag::Binary,
                "data item is not a plain string",
            )),
        }
    }

    fn load_plain(&self, bytes: &[u8], file_path: &str) -> DocumentResult<Document> {
        // Encrypted binary files are JSON; expose their tree so the
        // already-encrypted check sees the metadata key.
        if let Ok(branches) = JsonAdapter.parse(bytes) {
            if branches.iter().any(|b| b.contains_key(METADATA_KEY)) {
                return Ok(Document::new(file_path, branches));
            }
        }
        Ok(Document::new(file_path, self.parse(bytes)?))
    }

    fn load_encrypted(&self, bytes: &[u8], file_path: &str) -> DocumentResult<Document> {
        match JsonAdapter.parse(bytes) {
            Ok(branches) if branches.iter().any(|b| b.contains_key(METADATA_KEY)) => {
                split_metadata(file_path, branches)
            }
            _ => Ok(Document::new(file_path, self.parse(bytes)?)),
        }
    }

    fn emit_encrypted(&self, document: &Document) -> DocumentResult<Vec<u8>> {
        JsonAdapter.emit_encrypted(document)
    }
}
