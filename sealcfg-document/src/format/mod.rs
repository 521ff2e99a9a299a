//! Format adapters.
//!
//! Each supported file format implements [`FormatAdapter`]. The engine never
//! looks at format specifics: it asks a [`FormatRegistry`] for the adapter of
//! a [`FormatTag`] and works on the resulting [`Document`].

mod binary;
mod dotenv;
mod ini;
mod json;
mod yaml;

pub use binary::{BinaryAdapter, DATA_KEY as BINARY_DATA_KEY};
pub use dotenv::DotenvAdapter;
pub use ini::IniAdapter;
pub use json::JsonAdapter;
pub use yaml::YamlAdapter;

use crate::encrypted::EncryptedScalar;
use crate::error::{DocumentError, DocumentResult};
use crate::metadata::Metadata;
use crate::model::{Branch, Document, METADATA_KEY, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

/// Supported file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Yaml,
    Json,
    Ini,
    Dotenv,
    Binary,
}

impl FormatTag {
    /// Detects the format from a file name or path by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.file_name().is_some_and(|name| name == ".env") {
            return Self::Dotenv;
        }
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            Some("json") => Self::Json,
            Some("ini") => Self::Ini,
            Some("env") => Self::Dotenv,
            _ => Self::Binary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Ini => "ini",
            Self::Dotenv => "dotenv",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "ini" => Ok(Self::Ini),
            "dotenv" | "env" => Ok(Self::Dotenv),
            "binary" => Ok(Self::Binary),
            other => Err(format!("unknown format {other:?}")),
        }
    }
}

/// Parse/serialize capability for one file format.
///
/// Implementors provide [`parse`](Self::parse) and
/// [`serialize`](Self::serialize); the metadata-aware load/emit methods have
/// defaults that store the metadata block under the reserved key of every
/// branch.
pub trait FormatAdapter: Send + Sync {
    /// The format this adapter handles.
    fn tag(&self) -> FormatTag;

    /// Parses raw bytes into branches.
    fn parse(&self, bytes: &[u8]) -> DocumentResult<Vec<Branch>>;

    /// Serializes branches into raw bytes.
    fn serialize(&self, branches: &[Branch]) -> DocumentResult<Vec<u8>>;

    /// Loads a document that is expected to be plaintext.
    fn load_plain(&self, bytes: &[u8], file_path: &str) -> DocumentResult<Document> {
        Ok(Document::new(file_path, self.parse(bytes)?))
    }

    /// Loads a document and splits off its metadata block, if any.
    fn load_encrypted(&self, bytes: &[u8], file_path: &str) -> DocumentResult<Document> {
        split_metadata(file_path, self.parse(bytes)?)
    }

    /// Emits the branches of a plaintext document.
    fn emit_plain(&self, document: &Document) -> DocumentResult<Vec<u8>> {
        self.serialize(&document.branches)
    }

    /// Emits an encrypted document with its metadata block attached.
    fn emit_encrypted(&self, document: &Document) -> DocumentResult<Vec<u8>> {
        self.serialize(&attach_metadata(document)?)
    }
}

/// Removes the metadata item from every branch and decodes `ENC[...]` leaves.
///
/// Documents without metadata are returned as plaintext.
pub fn split_metadata(file_path: &str, mut branches: Vec<Branch>) -> DocumentResult<Document> {
    let mut metadata = None;
    for branch in &mut branches {
        if let Some(value) = branch.remove(METADATA_KEY) {
            if metadata.is_none() {
                metadata = Some(Metadata::from_value(&value)?);
            }
        }
    }

    if metadata.is_some() {
        for branch in &mut branches {
            for item in &mut branch.items {
                decode_envelopes(&mut item.value)?;
            }
        }
    }

    trace!(file = %file_path, encrypted = metadata.is_some(), "split metadata");
    Ok(Document {
        branches,
        metadata,
        file_path: file_path.to_string(),
    })
}

/// Returns the branches with the metadata block appended to each one.
pub fn attach_metadata(document: &Document) -> DocumentResult<Vec<Branch>> {
    let metadata = document
        .metadata
        .as_ref()
        .ok_or_else(|| DocumentError::Metadata("document carries no metadata".into()))?;
    let value = metadata.to_value()?;
    Ok(document
        .branches
        .iter()
        .cloned()
        .map(|mut branch| {
            branch.push(METADATA_KEY, value.clone());
            branch
        })
        .collect())
}

fn decode_envelopes(value: &mut Value) -> DocumentResult<()> {
    match value {
        Value::Scalar(_) => {
            if let Some(text) = value.as_str().filter(|s| EncryptedScalar::is_envelope(s)) {
                *value = Value::Encrypted(EncryptedScalar::parse(text)?);
            }
        }
        Value::Sequence(values) => {
            for child in values {
                decode_envelopes(child)?;
            }
        }
        Value::Mapping(items) => {
            for item in items {
                decode_envelopes(&mut item.value)?;
            }
        }
        Value::Encrypted(_) => {}
    }
    Ok(())
}

/// Adapter lookup by format tag.
///
/// Built-in adapters are always available; [`register`](Self::register)
/// replaces the adapter for a tag.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    overrides: HashMap<FormatTag, Arc<dyn FormatAdapter>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the adapter for the adapter's own tag.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) -> &mut Self {
        self.overrides.insert(adapter.tag(), adapter);
        self
    }

    /// Returns the adapter for a tag.
    pub fn get(&self, tag: FormatTag) -> Arc<dyn FormatAdapter> {
        if let Some(adapter) = self.overrides.get(&tag) {
            return Arc::clone(adapter);
        }
        match tag {
            FormatTag::Yaml => Arc::new(YamlAdapter),
            FormatTag::Json => Arc::new(JsonAdapter),
            FormatTag::Ini => Arc::new(IniAdapter),
            FormatTag::Dotenv => Arc::new(DotenvAdapter),
            FormatTag::Binary => Arc::new(BinaryAdapter),
        }
    }

    /// Returns the adapter for a file, detected by extension.
    pub fn for_path(&self, path: impl AsRef<Path>) -> Arc<dyn FormatAdapter> {
        self.get(FormatTag::from_path(path))
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats() {
        assert_eq!(FormatTag::from_path("a/b.yaml"), FormatTag::Yaml);
        assert_eq!(FormatTag::from_path("b.YML"), FormatTag::Yaml);
        assert_eq!(FormatTag::from_path("c.json"), FormatTag::Json);
        assert_eq!(FormatTag::from_path("d.ini"), FormatTag::Ini);
        assert_eq!(FormatTag::from_path("prod.env"), FormatTag::Dotenv);
        assert_eq!(FormatTag::from_path("dir/.env"), FormatTag::Dotenv);
        assert_eq!(FormatTag::from_path("key.pem"), FormatTag::Binary);
        assert_eq!(FormatTag::from_path("Makefile"), FormatTag::Binary);
    }

    #[test]
    fn format_tag_from_str() {
        assert_eq!("YAML".parse::<FormatTag>(), Ok(FormatTag::Yaml));
        assert_eq!("env".parse::<FormatTag>(), Ok(FormatTag::Dotenv));
        assert!("toml".parse::<FormatTag>().is_err());
    }

    #[test]
    fn registry_override_wins() {
        let mut registry = FormatRegistry::new();
        registry.register(Arc::new(YamlAdapter));
        assert_eq!(registry.get(FormatTag::Yaml).tag(), FormatTag::Yaml);
        assert_eq!(registry.for_path("x.json").tag(), FormatTag::Json);
    }
}
