//! Encryption engine.
//!
//! `parse → classify → key up → encrypt leaves → wrap + tag → serialize`.
//! Any failure aborts the pass; partial output is never returned.

use crate::codec::Encoder;
use crate::error::{EngineError, EngineResult, Operation};
use crate::records::to_records;
use crate::scope::{Scope, ScopeMatcher};
use crate::tree::{self, LeafPath};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{SecondsFormat, Utc};
use sealcfg_crypto::{
    effective_threshold, encrypt_leaf, generate_data_key, wrap_data_key, CipherSuite, DataKey,
    IntegrityHasher, KeyGroup, Keyring,
};
use sealcfg_document::{
    Document, EncryptedScalar, FormatRegistry, FormatTag, Metadata, Value, METADATA_KEY,
};
use tracing::{debug, info};
use zeroize::Zeroizing;

const OP: Operation = Operation::Encode;

/// Encrypts in-scope leaves of structured documents.
///
/// Holds no mutable state; share it across threads freely.
#[derive(Debug)]
pub struct EnvelopeEncoder {
    key_groups: Vec<KeyGroup>,
    threshold: Option<usize>,
    scope: Scope,
    matcher: ScopeMatcher,
    cipher: CipherSuite,
    input_format: Option<FormatTag>,
    output_format: Option<FormatTag>,
    formats: FormatRegistry,
}

impl EnvelopeEncoder {
    pub fn builder() -> EncoderBuilder {
        EncoderBuilder::default()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn cipher(&self) -> CipherSuite {
        self.cipher
    }

    /// Encrypts one document.
    pub fn encrypt(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        let input_tag = self.input_format.unwrap_or_else(|| FormatTag::from_path(file_name));
        let output_tag = self.output_format.unwrap_or(input_tag);

        let mut document = self
            .formats
            .get(input_tag)
            .load_plain(data, file_name)
            .map_err(|e| EngineError::load(OP, file_name, e))?;

        if document.is_empty() {
            debug!(file = %file_name, "empty document, nothing to encrypt");
            return Ok(data.to_vec());
        }

        let total = document.branches.len();
        if let Some(index) = document
            .branches
            .iter()
            .position(|branch| branch.contains_key(METADATA_KEY))
        {
            return Err(EngineError::AlreadyEncrypted {
                op: OP,
                file: file_name.to_string(),
                branch: index + 1,
                total,
            });
        }

        let data_key = generate_data_key();
        let last_modified = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let version = env!("CARGO_PKG_VERSION");
        let scope = self.scope.to_record();

        let mut hasher = IntegrityHasher::new(&data_key, version, &last_modified, &scope.canonical())
            .map_err(|source| EngineError::Integrity {
                op: OP,
                file: file_name.to_string(),
                source,
            })?;
        // A binary file is a single opaque leaf; scope rules do not apply.
        let whole_file = input_tag == FormatTag::Binary;
        let encrypted = self.encrypt_leaves(&mut document, &data_key, &mut hasher, whole_file)?;

        let wrapped = wrap_data_key(&data_key, &self.key_groups, self.threshold)
            .map_err(|source| EngineError::KeyResolution { op: OP, source })?;

        document.metadata = Some(Metadata {
            key_groups: to_records(&wrapped.groups),
            shamir_threshold: wrapped.threshold,
            scope,
            lastmodified: last_modified,
            mac: STANDARD.encode(hasher.finalize()),
            version: version.to_string(),
        });

        let output = self
            .formats
            .get(output_tag)
            .emit_encrypted(&document)
            .map_err(|e| EngineError::serialize(OP, file_name, e))?;

        info!(
            file = %file_name,
            branches = total,
            leaves = encrypted,
            groups = self.key_groups.len(),
            "encrypted document"
        );
        Ok(output)
    }

    /// Replaces every in-scope scalar with its encrypted form, or every
    /// scalar when `whole_file` is set.
    fn encrypt_leaves(
        &self,
        document: &mut Document,
        data_key: &DataKey,
        hasher: &mut IntegrityHasher,
        whole_file: bool,
    ) -> EngineResult<usize> {
        let mut count = 0usize;
        let file = document.file_path.clone();

        tree::walk_mut(&mut document.branches, &mut |path: &LeafPath, value: &mut Value| -> EngineResult<()> {
            let Value::Scalar(scalar) = value else {
                return Ok(());
            };
            if !whole_file && !path.local_key().is_some_and(|key| self.matcher.matches(key)) {
                return Ok(());
            }

            let aad = path.aad();
            let plaintext = Zeroizing::new(scalar.to_plaintext());
            let sealed = encrypt_leaf(self.cipher, data_key, &plaintext, aad.as_bytes()).map_err(|source| {
                EngineError::Auth {
                    op: OP,
                    file: file.clone(),
                    path: aad.clone(),
                    source: Box::new(source),
                }
            })?;

            let encrypted = EncryptedScalar {
                algorithm: self.cipher.identifier().to_string(),
                data: sealed.ciphertext,
                iv: sealed.nonce.to_vec(),
                tag: sealed.tag.to_vec(),
                value_type: scalar.value_type(),
            };
            hasher.update_leaf(
                aad.as_bytes(),
                encrypted.value_type.as_str(),
                &encrypted.iv,
                &encrypted.data,
                &encrypted.tag,
            );
            *value = Value::Encrypted(encrypted);
            count += 1;
            Ok(())
        })?;

        debug!(file = %file, leaves = count, "encrypted leaves");
        Ok(count)
    }
}

impl Encoder for EnvelopeEncoder {
    fn encode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        self.encrypt(file_name, data)
    }
}

/// Configuration for [`EnvelopeEncoder`].
#[derive(Debug, Default)]
pub struct EncoderBuilder {
    keyring: Option<Keyring>,
    recipient_groups: Vec<Vec<String>>,
    key_groups: Vec<KeyGroup>,
    threshold: Option<usize>,
    scope: Scope,
    cipher: CipherSuite,
    input_format: Option<FormatTag>,
    output_format: Option<FormatTag>,
    formats: FormatRegistry,
}

impl EncoderBuilder {
    /// Keyring used to resolve recipient strings. Defaults to the built-in
    /// age and box providers.
    pub fn keyring(mut self, keyring: Keyring) -> Self {
        self.keyring = Some(keyring);
        self
    }

    /// Adds one key group made of recipient strings.
    pub fn recipients<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipient_groups.push(group.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one already resolved key group. Resolved groups come after
    /// recipient groups.
    pub fn key_group(mut self, group: KeyGroup) -> Self {
        self.key_groups.push(group);
        self
    }

    /// Number of groups needed to recover the data key.
    pub fn shamir_threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn cipher(mut self, cipher: CipherSuite) -> Self {
        self.cipher = cipher;
        self
    }

    /// Overrides extension-based detection of the input format.
    pub fn input_format(mut self, format: FormatTag) -> Self {
        self.input_format = Some(format);
        self
    }

    /// Emits in this format instead of the input format.
    pub fn output_format(mut self, format: FormatTag) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn build(self) -> EngineResult<EnvelopeEncoder> {
        let keyring = self.keyring.unwrap_or_else(Keyring::with_default_providers);

        let mut key_groups = if self.recipient_groups.is_empty() {
            Vec::new()
        } else {
            keyring
                .resolve_groups(&self.recipient_groups)
                .map_err(|source| EngineError::KeyResolution { op: OP, source })?
        };
        key_groups.extend(self.key_groups);

        if key_groups.is_empty() {
            return Err(EngineError::config(OP, "at least one key group is required"));
        }
        if key_groups.iter().any(KeyGroup::is_empty) {
            return Err(EngineError::config(OP, "key groups must not be empty"));
        }
        effective_threshold(key_groups.len(), self.threshold).map_err(|e| EngineError::config(OP, e))?;

        let matcher = self.scope.compile()?;
        debug!(
            groups = key_groups.len(),
            threshold = ?self.threshold,
            cipher = %self.cipher,
            "built encoder"
        );
        Ok(EnvelopeEncoder {
            key_groups,
            threshold: self.threshold,
            scope: self.scope,
            matcher,
            cipher: self.cipher,
            input_format: self.input_format,
            output_format: self.output_format,
            formats: self.formats,
        })
    }
}
