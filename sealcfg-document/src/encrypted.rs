//! On-disk representation of encrypted leaves.
//!
//! Every encrypted scalar is stored as a string in the host format:
//! `ENC[AES256_GCM,data:<b64>,iv:<b64>,tag:<b64>,type:<type>]`.

use crate::error::{DocumentError, DocumentResult};
use crate::model::ScalarType;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

const PREFIX: &str = "ENC[";
const SUFFIX: char = ']';

/// An encrypted scalar, replacing a plaintext leaf.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedScalar {
    /// AEAD identifier, e.g. `AES256_GCM`.
    pub algorithm: String,
    /// Ciphertext without the authentication tag.
    pub data: Vec<u8>,
    /// Nonce.
    pub iv: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
    /// Type of the plaintext scalar.
    pub value_type: ScalarType,
}

impl EncryptedScalar {
    /// Returns true if the string looks like an encrypted value.
    pub fn is_envelope(s: &str) -> bool {
        s.starts_with(PREFIX) && s.ends_with(SUFFIX)
    }

    /// Parses an `ENC[...]` string.
    pub fn parse(s: &str) -> DocumentResult<Self> {
        let inner = s
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .ok_or_else(|| DocumentError::MalformedEnvelope("missing ENC[...] wrapper".into()))?;

        let mut parts = inner.split(',');
        let algorithm = parts
            .next()
            .filter(|a| !a.is_empty() && !a.contains(':'))
            .ok_or_else(|| DocumentError::MalformedEnvelope("missing algorithm".into()))?
            .to_string();

        let (mut data, mut iv, mut tag, mut value_type) = (None, None, None, None);
        for part in parts {
            let (name, raw) = part
                .split_once(':')
                .ok_or_else(|| DocumentError::MalformedEnvelope(format!("bad field {part:?}")))?;
            match name {
                "data" => data = Some(decode_field(name, raw)?),
                "iv" => iv = Some(decode_field(name, raw)?),
                "tag" => tag = Some(decode_field(name, raw)?),
                "type" => {
                    value_type = Some(ScalarType::from_tag(raw).ok_or_else(|| {
                        DocumentError::MalformedEnvelope(format!("unknown type {raw:?}"))
                    })?)
                }
                other => {
                    return Err(DocumentError::MalformedEnvelope(format!(
                        "unknown field {other:?}"
                    )));
                }
            }
        }

        let missing = |f: &str| DocumentError::MalformedEnvelope(format!("missing '{f}'"));
        Ok(Self {
            algorithm,
            data: data.ok_or_else(|| missing("data"))?,
            iv: iv.ok_or_else(|| missing("iv"))?,
            tag: tag.ok_or_else(|| missing("tag"))?,
            value_type: value_type.ok_or_else(|| missing("type"))?,
        })
    }

    /// Formats the value as an `ENC[...]` string.
    pub fn to_envelope_string(&self) -> String {
        format!(
            "{PREFIX}{},data:{},iv:{},tag:{},type:{}{SUFFIX}",
            self.algorithm,
            STANDARD.encode(&self.data),
            STANDARD.encode(&self.iv),
            STANDARD.encode(&self.tag),
            self.value_type
        )
    }
}

fn decode_field(name: &str, raw: &str) -> DocumentResult<Vec<u8>> {
    STANDARD
        .decode(raw)
        .map_err(|e| DocumentError::MalformedEnvelope(format!("invalid base64 in {name}: {e}")))
}

impl fmt::Display for EncryptedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_envelope_string())
    }
}

impl fmt::Debug for EncryptedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedScalar")
            .field("algorithm", &self.algorithm)
            .field("data_len", &self.data.len())
            .field("value_type", &self.value_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedScalar {
        EncryptedScalar {
            algorithm: "AES256_GCM".into(),
            data: b"cipher".to_vec(),
            iv: vec![1; 12],
            tag: vec![2; 16],
            value_type: ScalarType::Int,
        }
    }

    #[test]
    fn envelope_string_parses_back() {
        let text = sample().to_envelope_string();
        assert!(text.starts_with("ENC[AES256_GCM,data:"));
        assert!(text.ends_with(",type:int]"));
        assert_eq!(EncryptedScalar::parse(&text).unwrap(), sample());
    }

    #[test]
    fn empty_ciphertext_is_allowed() {
        let mut value = sample();
        value.data.clear();
        let text = value.to_envelope_string();
        assert!(text.contains("data:,"));
        assert_eq!(EncryptedScalar::parse(&text).unwrap(), value);
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(EncryptedScalar::parse("ENC[AES256_GCM,data:AA==,type:str]").is_err());
        assert!(EncryptedScalar::parse("ENC[data:AA==]").is_err());
        assert!(EncryptedScalar::parse("plain").is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        let text = sample().to_envelope_string().replace("type:int", "type:date");
        assert!(EncryptedScalar::parse(&text).is_err());
    }
}
