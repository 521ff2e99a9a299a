//! X25519 + XSalsa20-Poly1305 sealed-box recipients.
//!
//! Each wrap uses a fresh ephemeral key pair, so the sender stays anonymous.
//! Wire form: `base64(ephemeral_pk || nonce || ciphertext)`.

use crate::error::{CryptoError, CryptoResult};
use crate::master_key::{KeyGroupProvider, MasterKey};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Scheme name stored in metadata.
pub const BOX_SCHEME: &str = "box";

/// Prefix of public recipient strings.
pub const RECIPIENT_PREFIX: &str = "box:";

/// Prefix of secret key lines.
pub const SECRET_PREFIX: &str = "box-secret:";

const PUBLIC_KEY_SIZE: usize = 32;
const BOX_NONCE_SIZE: usize = 24;

/// Provider for `box:` recipients.
#[derive(Clone, Default)]
pub struct BoxProvider {
    secret_keys: Arc<Vec<SecretKey>>,
}

impl BoxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider holding secret keys for unwrapping.
    pub fn with_secret_keys(secret_keys: Vec<SecretKey>) -> Self {
        Self {
            secret_keys: Arc::new(secret_keys),
        }
    }
}

impl fmt::Debug for BoxProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxProvider")
            .field("secret_keys", &self.secret_keys.len())
            .finish()
    }
}

impl KeyGroupProvider for BoxProvider {
    fn scheme(&self) -> &'static str {
        BOX_SCHEME
    }

    fn accepts(&self, recipient: &str) -> bool {
        recipient.starts_with(RECIPIENT_PREFIX)
    }

    fn master_key(&self, recipient: &str) -> CryptoResult<Arc<dyn MasterKey>> {
        let encoded = recipient
            .trim()
            .strip_prefix(RECIPIENT_PREFIX)
            .ok_or_else(|| CryptoError::KeyResolution(format!("not a box recipient: {recipient}")))?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = STANDARD
            .decode(encoded)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                CryptoError::KeyResolution(format!("box recipient is not a base64 32-byte key: {recipient}"))
            })?;

        Ok(Arc::new(BoxMasterKey {
            public: PublicKey::from(bytes),
            secret_keys: Arc::clone(&self.secret_keys),
        }))
    }
}

/// One box recipient plus the secret keys available for unwrapping.
pub struct BoxMasterKey {
    public: PublicKey,
    secret_keys: Arc<Vec<SecretKey>>,
}

impl fmt::Debug for BoxMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxMasterKey")
            .field("recipient", &self.recipient())
            .finish_non_exhaustive()
    }
}

impl MasterKey for BoxMasterKey {
    fn scheme(&self) -> &'static str {
        BOX_SCHEME
    }

    fn recipient(&self) -> String {
        encode_recipient(&self.public)
    }

    fn wrap_key(&self, secret: &[u8]) -> CryptoResult<String> {
        let ephemeral = SecretKey::generate(&mut rand::rngs::OsRng);
        let ephemeral_pk = ephemeral.public_key();
        let salsa_box = SalsaBox::new(&self.public, &ephemeral);

        let mut nonce = [0u8; BOX_NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = salsa_box
            .encrypt(crypto_box::Nonce::from_slice(&nonce), secret)
            .map_err(|e| CryptoError::Wrap(format!("box seal failed: {e}")))?;

        let mut blob = Vec::with_capacity(PUBLIC_KEY_SIZE + BOX_NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(ephemeral_pk.as_bytes());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    fn unwrap_key(&self, wrapped: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let blob = STANDARD
            .decode(wrapped.trim())
            .map_err(|e| CryptoError::Unwrap(format!("box blob is not base64: {e}")))?;
        if blob.len() < PUBLIC_KEY_SIZE + BOX_NONCE_SIZE {
            return Err(CryptoError::Unwrap("box blob is truncated".into()));
        }
        let (ephemeral, rest) = blob.split_at(PUBLIC_KEY_SIZE);
        let (nonce, ciphertext) = rest.split_at(BOX_NONCE_SIZE);
        let mut ephemeral_bytes = [0u8; PUBLIC_KEY_SIZE];
        ephemeral_bytes.copy_from_slice(ephemeral);
        let ephemeral_pk = PublicKey::from(ephemeral_bytes);

        // Only keys matching this recipient are worth trying.
        let secret = self
            .secret_keys
            .iter()
            .find(|sk| sk.public_key() == self.public)
            .ok_or_else(|| CryptoError::Unwrap(format!("no secret key for {}", self.recipient())))?;

        SalsaBox::new(&ephemeral_pk, secret)
            .decrypt(crypto_box::Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Unwrap("box open failed (wrong key or tampered data)".into()))
    }
}

/// Formats a public key as `box:<base64>`.
pub fn encode_recipient(public: &PublicKey) -> String {
    format!("{RECIPIENT_PREFIX}{}", STANDARD.encode(public.as_bytes()))
}

/// Formats a secret key as `box-secret:<base64>`.
pub fn encode_secret_key(secret: &SecretKey) -> Zeroizing<String> {
    let bytes = Zeroizing::new(secret.to_bytes());
    Zeroizing::new(format!("{SECRET_PREFIX}{}", STANDARD.encode(bytes.as_slice())))
}

/// Parses `box-secret:` lines. Blank lines and `#` comments are skipped.
pub fn parse_secret_keys(contents: &str) -> CryptoResult<Vec<SecretKey>> {
    let mut keys = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let malformed = || CryptoError::KeyResolution(format!("line {} is not a box secret key", index + 1));
        let encoded = line.strip_prefix(SECRET_PREFIX).ok_or_else(malformed)?;
        let decoded = Zeroizing::new(STANDARD.decode(encoded).map_err(|_| malformed())?);
        let bytes: [u8; 32] = decoded.as_slice().try_into().map_err(|_| malformed())?;
        keys.push(SecretKey::from(bytes));
    }
    Ok(keys)
}

/// A freshly generated box key pair.
pub struct BoxKeyPair {
    pub secret: SecretKey,
    pub recipient: String,
}

/// Generates a new box key pair.
pub fn generate_box_keypair() -> BoxKeyPair {
    let secret = SecretKey::generate(&mut rand::rngs::OsRng);
    let recipient = encode_recipient(&secret.public_key());
    BoxKeyPair { secret, recipient }
}
