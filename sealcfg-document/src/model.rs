//! Ordered tree model shared by every format adapter.
//!
//! A [`Document`] is a list of [`Branch`]es (one per document in a
//! multi-document stream). Each branch is an ordered list of [`Item`]s and
//! every value is a [`Value`]: a typed scalar, a sequence, a mapping, or an
//! [`EncryptedScalar`] that replaced a scalar during encryption.

use crate::encrypted::EncryptedScalar;
use crate::error::{DocumentError, DocumentResult};
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved top-level key that carries the envelope metadata.
pub const METADATA_KEY: &str = "sops";

/// One structured file held in memory for a single encrypt or decrypt pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Top-level branches, in file order.
    pub branches: Vec<Branch>,
    /// Envelope metadata, present only on encrypted documents.
    pub metadata: Option<Metadata>,
    /// Identifier used to pick format adapters. Never persisted.
    pub file_path: String,
}

impl Document {
    /// Creates a plaintext document.
    pub fn new(file_path: impl Into<String>, branches: Vec<Branch>) -> Self {
        Self {
            branches,
            metadata: None,
            file_path: file_path.into(),
        }
    }

    /// Returns true if the document has no branches at all.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Returns true if an envelope metadata block is attached.
    pub fn is_encrypted(&self) -> bool {
        self.metadata.is_some()
    }
}

/// One logical document or record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Branch {
    pub items: Vec<Item>,
}

impl Branch {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Looks up the first item with the given key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.iter().find(|i| i.key == key).map(|i| &i.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|i| i.key == key)
    }

    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.items.push(Item::new(key, value));
    }

    /// Removes every item with the given key and returns the first one.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let position = self.items.iter().position(|i| i.key == key)?;
        let removed = self.items.remove(position);
        self.items.retain(|i| i.key != key);
        Some(removed.value)
    }
}

impl From<Vec<Item>> for Branch {
    fn from(items: Vec<Item>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a Branch {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// How a key was written in the source document. Keys are always held as
/// strings; formats with typed keys use this to write them back unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyKind {
    #[default]
    String,
    Number,
    Bool,
    Null,
}

/// A key/value pair inside a branch or mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub key: String,
    pub key_kind: KeyKind,
    pub value: Value,
}

impl Item {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            key_kind: KeyKind::String,
            value,
        }
    }

    pub fn with_key_kind(mut self, kind: KeyKind) -> Self {
        self.key_kind = kind;
        self
    }
}

/// Recursive value type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Encrypted(EncryptedScalar),
    Sequence(Vec<Value>),
    Mapping(Vec<Item>),
}

impl Value {
    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    pub fn mapping(items: Vec<Item>) -> Self {
        Self::Mapping(items)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Scalar(Scalar::Integer(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Scalar(Scalar::Float(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

/// Typed leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Raw bytes, only produced by the binary format for non UTF-8 input.
    Bytes(Vec<u8>),
}

impl Scalar {
    pub fn value_type(&self) -> ScalarType {
        match self {
            Self::Null => ScalarType::Null,
            Self::Bool(_) => ScalarType::Bool,
            Self::Integer(_) => ScalarType::Int,
            Self::Float(_) => ScalarType::Float,
            Self::String(_) => ScalarType::Str,
            Self::Bytes(_) => ScalarType::Bytes,
        }
    }

    /// Encodes the scalar as the plaintext that gets encrypted.
    pub fn to_plaintext(&self) -> Vec<u8> {
        match self {
            Self::Null => Vec::new(),
            Self::Bool(b) => b.to_string().into_bytes(),
            Self::Integer(n) => n.to_string().into_bytes(),
            Self::Float(f) => f.to_string().into_bytes(),
            Self::String(s) => s.as_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }

    /// Rebuilds a scalar of the given type from decrypted plaintext.
    pub fn from_plaintext(value_type: ScalarType, plaintext: Vec<u8>) -> DocumentResult<Self> {
        if value_type == ScalarType::Bytes {
            return Ok(Self::Bytes(plaintext));
        }
        let text = String::from_utf8(plaintext)
            .map_err(|e| DocumentError::MalformedEnvelope(format!("invalid UTF-8: {e}")))?;
        let bad = |what: &str| DocumentError::MalformedEnvelope(format!("plaintext is not a valid {what}"));
        match value_type {
            ScalarType::Null => Ok(Self::Null),
            ScalarType::Str => Ok(Self::String(text)),
            ScalarType::Int => text.parse().map(Self::Integer).map_err(|_| bad("int")),
            ScalarType::Float => text.parse().map(Self::Float).map_err(|_| bad("float")),
            ScalarType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(bad("bool")),
            },
            ScalarType::Bytes => Ok(Self::Bytes(text.into_bytes())),
        }
    }
}

/// Original type of an encrypted scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Str,
    Int,
    Float,
    Bool,
    Null,
    Bytes,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Bytes => "bytes",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "null" => Some(Self::Null),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
