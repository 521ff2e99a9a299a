//! Ordered document model for sealcfg.
//!
//! This crate turns structured configuration files into a tree of
//! [`Branch`]es and back, without losing key order or scalar types:
//! - YAML (including multi-document streams), JSON, INI, dotenv and binary
//!   adapters behind the [`FormatAdapter`] trait
//! - The `ENC[...]` representation of encrypted leaves ([`EncryptedScalar`])
//! - The `sops` metadata block ([`Metadata`]) and its flattened form for
//!   line-oriented formats
//!
//! It performs no cryptography.

mod convert;
mod encrypted;
mod error;
mod flatten;
mod metadata;
mod model;

pub mod format;

pub use convert::{json_to_value, value_to_json};
pub use encrypted::EncryptedScalar;
pub use error::{DocumentError, DocumentResult};
pub use flatten::{flatten, unflatten};
pub use format::{FormatAdapter, FormatRegistry, FormatTag};
pub use metadata::{KeyGroupRecord, Metadata, ScopeRecord, WrappedKeyRecord};
pub use model::{Branch, Document, Item, KeyKind, METADATA_KEY, Scalar, ScalarType, Value};
