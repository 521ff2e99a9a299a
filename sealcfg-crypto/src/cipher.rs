//! Leaf encryption with AES-256-GCM or ChaCha20-Poly1305.
//!
//! Every leaf gets a fresh random nonce. The associated data binds the
//! ciphertext to the leaf's position in the document tree.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DataKey;
use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit, Nonce, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

/// Size of nonce in bytes (96 bits for both suites).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// AEAD used for leaf values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Identifier stored in each `ENC[...]` value.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES256_GCM",
            Self::ChaCha20Poly1305 => "CHACHA20_POLY1305",
        }
    }

    /// Parses a stored identifier.
    pub fn from_identifier(id: &str) -> CryptoResult<Self> {
        match id {
            "AES256_GCM" => Ok(Self::Aes256Gcm),
            "CHACHA20_POLY1305" => Ok(Self::ChaCha20Poly1305),
            other => Err(CryptoError::UnsupportedCipher(other.to_string())),
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for CipherSuite {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "aes256-gcm" | "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-poly1305" => Ok(Self::ChaCha20Poly1305),
            _ => Err(CryptoError::UnsupportedCipher(s.to_string())),
        }
    }
}

/// Ciphertext of one leaf, with nonce and tag kept apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedLeaf {
    /// The nonce used for encryption (unique per leaf).
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext without the tag.
    pub ciphertext: Vec<u8>,
    /// The authentication tag.
    pub tag: [u8; TAG_SIZE],
}

impl SealedLeaf {
    /// Rebuilds a sealed leaf from stored parts, checking their lengths.
    pub fn from_parts(nonce: &[u8], ciphertext: Vec<u8>, tag: &[u8]) -> CryptoResult<Self> {
        let nonce: [u8; NONCE_SIZE] = nonce.try_into().map_err(|_| CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        })?;
        let tag: [u8; TAG_SIZE] = tag
            .try_into()
            .map_err(|_| CryptoError::Decryption(format!("invalid tag length {}", tag.len())))?;
        Ok(Self {
            nonce,
            ciphertext,
            tag,
        })
    }
}

/// Encrypts one leaf.
///
/// # Arguments
/// * `suite` - The AEAD to use
/// * `key` - The document data key
/// * `plaintext` - Encoded scalar value
/// * `aad` - Associated data (the leaf path)
pub fn encrypt_leaf(
    suite: CipherSuite,
    key: &DataKey,
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<SealedLeaf> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let mut combined = match suite {
        CipherSuite::Aes256Gcm => seal::<Aes256Gcm>(key, &nonce, plaintext, aad),
        CipherSuite::ChaCha20Poly1305 => seal::<ChaCha20Poly1305>(key, &nonce, plaintext, aad),
    }?;

    // The AEAD appends the tag; store it separately.
    let split = combined.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&combined[split..]);
    combined.truncate(split);

    Ok(SealedLeaf {
        nonce,
        ciphertext: combined,
        tag,
    })
}

/// Decrypts one leaf. Fails on any tag mismatch.
pub fn decrypt_leaf(
    suite: CipherSuite,
    key: &DataKey,
    sealed: &SealedLeaf,
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(&sealed.ciphertext);
    combined.extend_from_slice(&sealed.tag);

    match suite {
        CipherSuite::Aes256Gcm => open::<Aes256Gcm>(key, &sealed.nonce, &combined, aad),
        CipherSuite::ChaCha20Poly1305 => open::<ChaCha20Poly1305>(key, &sealed.nonce, &combined, aad),
    }
}

fn seal<A: Aead + KeyInit>(
    key: &DataKey,
    nonce: &[u8; NONCE_SIZE],
    msg: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = A::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    cipher
        .encrypt(Nonce::<A>::from_slice(nonce), Payload { msg, aad })
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

fn open<A: Aead + KeyInit>(
    key: &DataKey,
    nonce: &[u8; NONCE_SIZE],
    msg: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = A::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Decryption(e.to_string()))?;
    cipher
        .decrypt(Nonce::<A>::from_slice(nonce), Payload { msg, aad })
        .map_err(|_| CryptoError::Decryption("leaf authentication failed (wrong key or tampered data)".to_string()))
}
