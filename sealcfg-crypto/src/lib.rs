//! Envelope cryptography for sealcfg.
//!
//! Provides the primitives behind selective config encryption:
//! - A random 256-bit data key per document, zeroized on drop
//! - AES-256-GCM or ChaCha20-Poly1305 per leaf, with the leaf path as AAD
//! - HMAC-SHA256 integrity tag over every encrypted leaf
//!
//! # Key wrapping
//!
//! The data key never leaves this crate in the clear. It is wrapped once per
//! recipient:
//!
//! 1. **age**: X25519 recipients (`age1…`), ASCII-armored age files.
//! 2. **box**: X25519 + XSalsa20-Poly1305 sealed boxes (`box:<base64>`).
//!
//! Recipients are arranged in key groups. One group means any member can
//! decrypt; several groups split the key with Shamir's scheme so that a
//! threshold of groups must cooperate.

mod age_scheme;
mod cipher;
pub mod envelope;
mod error;
mod integrity;
mod key;
mod keyring;
mod master_key;
mod sealed_box;
pub mod shamir;

pub use age_scheme::{
    generate_age_identity, parse_identities, AgeKeyPair, AgeMasterKey, AgeProvider, AGE_SCHEME,
};
pub use cipher::{decrypt_leaf, encrypt_leaf, CipherSuite, SealedLeaf, NONCE_SIZE, TAG_SIZE};
pub use envelope::{
    effective_threshold, unwrap_data_key, wrap_data_key, WrappedDataKey, WrappedGroup, WrappedKey,
};
pub use error::{CryptoError, CryptoResult};
pub use integrity::{IntegrityHasher, INTEGRITY_TAG_SIZE};
pub use key::{generate_data_key, DataKey, KEY_SIZE};
pub use keyring::Keyring;
pub use master_key::{KeyGroup, KeyGroupProvider, MasterKey};
pub use sealed_box::{
    encode_recipient, encode_secret_key, generate_box_keypair, parse_secret_keys, BoxKeyPair,
    BoxMasterKey, BoxProvider, BOX_SCHEME,
};

/// Re-exported so callers can name age identities without depending on `age`.
pub use age::x25519::Identity as AgeIdentity;
/// Re-exported so callers can name box secret keys without depending on `crypto_box`.
pub use crypto_box::SecretKey as BoxSecretKey;
