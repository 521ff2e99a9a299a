//! Decryption engine.
//!
//! `parse → unwrap data key → verify tag → decrypt leaves → serialize`.
//! The integrity tag is checked before any leaf is decrypted.

use crate::codec::Decoder;
use crate::error::{BoxError, EngineError, EngineResult, Operation};
use crate::records::from_records;
use crate::tree::{self, LeafPath};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sealcfg_crypto::{
    decrypt_leaf, unwrap_data_key, CipherSuite, CryptoError, DataKey, IntegrityHasher, Keyring,
    SealedLeaf,
};
use sealcfg_document::{
    Document, EncryptedScalar, FormatRegistry, FormatTag, Metadata, Scalar, Value,
};
use tracing::{debug, info};

const OP: Operation = Operation::Decode;

/// What to do with input that carries no envelope metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotEncryptedPolicy {
    /// Fail with `NotEncrypted`.
    #[default]
    Fail,
    /// Return the input unchanged.
    PassThrough,
}

/// Restores plaintext documents.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    keyring: Keyring,
    not_encrypted: NotEncryptedPolicy,
    input_format: Option<FormatTag>,
    output_format: Option<FormatTag>,
    formats: FormatRegistry,
}

impl EnvelopeDecoder {
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder::default()
    }

    /// Decrypts one document.
    pub fn decrypt(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        let input_tag = self.input_format.unwrap_or_else(|| FormatTag::from_path(file_name));
        let output_tag = self.output_format.unwrap_or(input_tag);

        let mut document = self
            .formats
            .get(input_tag)
            .load_encrypted(data, file_name)
            .map_err(|e| EngineError::load(OP, file_name, e))?;

        let Some(metadata) = document.metadata.take() else {
            return match self.not_encrypted {
                NotEncryptedPolicy::Fail => Err(EngineError::NotEncrypted {
                    op: OP,
                    file: file_name.to_string(),
                }),
                NotEncryptedPolicy::PassThrough => {
                    debug!(file = %file_name, "not encrypted, passing through");
                    Ok(data.to_vec())
                }
            };
        };

        let groups = from_records(&metadata.key_groups);
        let data_key = unwrap_data_key(&groups, metadata.shamir_threshold, &self.keyring).map_err(
            |source| match source {
                CryptoError::KeyResolution(_) => EngineError::KeyResolution { op: OP, source },
                source => EngineError::KeyUnavailable {
                    op: OP,
                    file: file_name.to_string(),
                    source,
                },
            },
        )?;

        let leaves = verify_integrity(&document, &metadata, &data_key).map_err(|source| {
            EngineError::Integrity {
                op: OP,
                file: file_name.to_string(),
                source,
            }
        })?;

        decrypt_leaves(&mut document, &data_key)?;

        let output = self
            .formats
            .get(output_tag)
            .emit_plain(&document)
            .map_err(|e| EngineError::serialize(OP, file_name, e))?;

        info!(
            file = %file_name,
            branches = document.branches.len(),
            leaves,
            "decrypted document"
        );
        Ok(output)
    }
}

impl Decoder for EnvelopeDecoder {
    fn decode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        self.decrypt(file_name, data)
    }
}

/// Recomputes the tag over every encrypted leaf and compares it with the
/// stored one. Returns the number of encrypted leaves.
fn verify_integrity(document: &Document, metadata: &Metadata, data_key: &DataKey) -> Result<usize, CryptoError> {
    let expected = STANDARD
        .decode(metadata.mac.trim())
        .map_err(|_| CryptoError::Integrity("stored tag is not valid base64".into()))?;

    let mut hasher = IntegrityHasher::new(
        data_key,
        &metadata.version,
        &metadata.lastmodified,
        &metadata.scope.canonical(),
    )?;
    tree::walk(&document.branches, &mut |path: &LeafPath, value: &Value| -> Result<(), CryptoError> {
        if let Value::Encrypted(enc) = value {
            hasher.update_leaf(
                path.aad().as_bytes(),
                enc.value_type.as_str(),
                &enc.iv,
                &enc.data,
                &enc.tag,
            );
        }
        Ok(())
    })?;

    let leaves = hasher.leaf_count();
    hasher.verify(&expected)?;
    debug!(file = %document.file_path, leaves, "integrity tag verified");
    Ok(leaves)
}

fn decrypt_leaves(document: &mut Document, data_key: &DataKey) -> EngineResult<()> {
    let file = document.file_path.clone();
    tree::walk_mut(&mut document.branches, &mut |path: &LeafPath, value: &mut Value| -> EngineResult<()> {
        let Value::Encrypted(enc) = value else {
            return Ok(());
        };
        let aad = path.aad();
        let scalar = open_scalar(enc, data_key, &aad).map_err(|source| EngineError::Auth {
            op: OP,
            file: file.clone(),
            path: aad.clone(),
            source,
        })?;
        *value = Value::Scalar(scalar);
        Ok(())
    })
}

fn open_scalar(enc: &EncryptedScalar, data_key: &DataKey, aad: &str) -> Result<Scalar, BoxError> {
    let suite = CipherSuite::from_identifier(&enc.algorithm)?;
    let sealed = SealedLeaf::from_parts(&enc.iv, enc.data.clone(), &enc.tag)?;
    let plaintext = decrypt_leaf(suite, data_key, &sealed, aad.as_bytes())?;
    Ok(Scalar::from_plaintext(enc.value_type, plaintext)?)
}

/// Configuration for [`EnvelopeDecoder`].
#[derive(Debug, Default)]
pub struct DecoderBuilder {
    keyring: Option<Keyring>,
    not_encrypted: NotEncryptedPolicy,
    input_format: Option<FormatTag>,
    output_format: Option<FormatTag>,
    formats: FormatRegistry,
}

impl DecoderBuilder {
    /// Keyring holding the private credentials used for unwrapping.
    pub fn keyring(mut self, keyring: Keyring) -> Self {
        self.keyring = Some(keyring);
        self
    }

    pub fn not_encrypted(mut self, policy: NotEncryptedPolicy) -> Self {
        self.not_encrypted = policy;
        self
    }

    pub fn input_format(mut self, format: FormatTag) -> Self {
        self.input_format = Some(format);
        self
    }

    pub fn output_format(mut self, format: FormatTag) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    pub fn build(self) -> EnvelopeDecoder {
        EnvelopeDecoder {
            keyring: self.keyring.unwrap_or_else(Keyring::with_default_providers),
            not_encrypted: self.not_encrypted,
            input_format: self.input_format,
            output_format: self.output_format,
            formats: self.formats,
        }
    }
}
