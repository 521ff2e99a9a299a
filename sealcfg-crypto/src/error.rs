//! Error types for the envelope cipher and key providers.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A recipient string is malformed or uses an unknown scheme.
    #[error("key resolution failed: {0}")]
    KeyResolution(String),

    /// No key group (or not enough groups) could unwrap the data key.
    #[error("data key unavailable: {0}")]
    KeyUnavailable(String),

    /// Wrapping a data key for a recipient failed.
    #[error("key wrap failed: {0}")]
    Wrap(String),

    /// Unwrapping a data key failed (wrong identity or tampered blob).
    #[error("key unwrap failed: {0}")]
    Unwrap(String),

    /// Leaf encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Leaf decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The integrity tag does not match the encrypted leaves.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Unknown AEAD identifier.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid nonce length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    /// Invalid threshold or share set.
    #[error("secret sharing error: {0}")]
    Sharing(String),
}
