//! The `sops` metadata block attached to encrypted documents.

use crate::convert::{json_to_value, value_to_json};
use crate::error::{DocumentError, DocumentResult};
use crate::model::Value;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Envelope metadata persisted under the reserved top-level key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Wrapped data key (or share) per group, in group order.
    #[serde(default)]
    pub key_groups: Vec<KeyGroupRecord>,
    /// Number of groups needed to rebuild the data key.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_usize"
    )]
    pub shamir_threshold: Option<usize>,
    /// Scope expression used when the document was encrypted.
    #[serde(flatten)]
    pub scope: ScopeRecord,
    /// RFC 3339 UTC timestamp of the last encryption.
    pub lastmodified: String,
    /// Base64 integrity tag over every encrypted leaf.
    pub mac: String,
    /// Version of the tool that produced the envelope.
    pub version: String,
}

/// One key group: scheme name to the wrapped keys of that scheme.
pub type KeyGroupRecord = BTreeMap<String, Vec<WrappedKeyRecord>>;

/// A data key (or share) wrapped for one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyRecord {
    pub recipient: String,
    pub enc: String,
}

/// The scope expression. At most one field is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unencrypted_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unencrypted_suffix: Option<String>,
}

impl ScopeRecord {
    /// Canonical `name=pattern` form, authenticated by the integrity tag.
    pub fn canonical(&self) -> String {
        let fields = [
            ("encrypted_regex", &self.encrypted_regex),
            ("unencrypted_regex", &self.unencrypted_regex),
            ("encrypted_suffix", &self.encrypted_suffix),
            ("unencrypted_suffix", &self.unencrypted_suffix),
        ];
        fields
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}={v}")))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Metadata {
    /// Converts the metadata into a model value for emission.
    pub fn to_value(&self) -> DocumentResult<Value> {
        json_to_value(serde_json::to_value(self)?)
    }

    /// Reads metadata back from a model value.
    pub fn from_value(value: &Value) -> DocumentResult<Self> {
        let json = value_to_json(value)?;
        serde_json::from_value(json).map_err(|e| DocumentError::Metadata(e.to_string()))
    }

    /// Total number of wrapped keys across all groups.
    pub fn recipient_count(&self) -> usize {
        self.key_groups
            .iter()
            .flat_map(|group| group.values())
            .map(Vec::len)
            .sum()
    }
}

/// Flattened formats store every scalar as a string.
fn lenient_usize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid shamir_threshold {s:?}"))),
    }
}
