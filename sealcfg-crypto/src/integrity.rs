//! Whole-tree integrity tag.
//!
//! HMAC-SHA256 under a key derived from the data key. The input covers the
//! metadata header and every encrypted leaf in document order; each field is
//! length-prefixed so that no two distinct inputs share an encoding.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DataKey;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Size of the integrity tag in bytes.
pub const INTEGRITY_TAG_SIZE: usize = 32;

const DERIVATION_LABEL: &[u8] = b"sealcfg-integrity-v1";

/// Incremental integrity computation over a document's encrypted leaves.
pub struct IntegrityHasher {
    mac: HmacSha256,
    leaves: usize,
}

impl IntegrityHasher {
    /// Starts a computation bound to the metadata header.
    pub fn new(key: &DataKey, version: &str, last_modified: &str, scope: &str) -> CryptoResult<Self> {
        let mut derive = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Integrity(e.to_string()))?;
        derive.update(DERIVATION_LABEL);
        let mac_key = derive.finalize().into_bytes();

        let mut mac = HmacSha256::new_from_slice(&mac_key)
            .map_err(|e| CryptoError::Integrity(e.to_string()))?;
        for field in [version.as_bytes(), last_modified.as_bytes(), scope.as_bytes()] {
            update_prefixed(&mut mac, field);
        }
        Ok(Self { mac, leaves: 0 })
    }

    /// Feeds one encrypted leaf as stored: path, type, nonce, ciphertext, tag.
    pub fn update_leaf(&mut self, path: &[u8], value_type: &str, nonce: &[u8], ciphertext: &[u8], tag: &[u8]) {
        for field in [path, value_type.as_bytes(), nonce, ciphertext, tag] {
            update_prefixed(&mut self.mac, field);
        }
        self.leaves += 1;
    }

    /// Number of leaves fed so far.
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Finishes and returns the tag.
    pub fn finalize(self) -> [u8; INTEGRITY_TAG_SIZE] {
        let bytes = self.mac.finalize().into_bytes();
        let mut tag = [0u8; INTEGRITY_TAG_SIZE];
        tag.copy_from_slice(&bytes);
        tag
    }

    /// Finishes and compares against `expected` in constant time.
    pub fn verify(self, expected: &[u8]) -> CryptoResult<()> {
        let leaves = self.leaves;
        self.mac.verify_slice(expected).map_err(|_| {
            CryptoError::Integrity(format!("tag mismatch over {leaves} encrypted leaves"))
        })
    }
}

fn update_prefixed(mac: &mut HmacSha256, field: &[u8]) {
    mac.update(&(field.len() as u64).to_be_bytes());
    mac.update(field);
}
