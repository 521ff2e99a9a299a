//! age X25519 recipients.
//!
//! Wrapped secrets are ASCII-armored age files so they survive every text
//! format unchanged.

use crate::error::{CryptoError, CryptoResult};
use crate::master_key::{KeyGroupProvider, MasterKey};
use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::secrecy::ExposeSecret;
use age::x25519;
use std::fmt;
use std::io::{Read, Write};
use std::iter;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;
use zeroize::Zeroizing;

/// Scheme name stored in metadata.
pub const AGE_SCHEME: &str = "age";

/// Upper bound on an unwrapped secret. Data keys and shares are far smaller.
const MAX_UNWRAPPED_SIZE: usize = 1024;

/// Provider for `age1…` recipients.
#[derive(Clone, Default)]
pub struct AgeProvider {
    identities: Arc<Vec<x25519::Identity>>,
}

impl AgeProvider {
    /// A provider that can only wrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider holding private identities for unwrapping.
    pub fn with_identities(identities: Vec<x25519::Identity>) -> Self {
        Self {
            identities: Arc::new(identities),
        }
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}

impl fmt::Debug for AgeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgeProvider")
            .field("identities", &self.identities.len())
            .finish()
    }
}

impl KeyGroupProvider for AgeProvider {
    fn scheme(&self) -> &'static str {
        AGE_SCHEME
    }

    fn accepts(&self, recipient: &str) -> bool {
        recipient.starts_with("age1")
    }

    fn master_key(&self, recipient: &str) -> CryptoResult<Arc<dyn MasterKey>> {
        let parsed = x25519::Recipient::from_str(recipient.trim())
            .map_err(|e| CryptoError::KeyResolution(format!("invalid age recipient {recipient}: {e}")))?;
        Ok(Arc::new(AgeMasterKey {
            recipient: parsed,
            identities: Arc::clone(&self.identities),
        }))
    }
}

/// One age recipient plus the identities available for unwrapping.
pub struct AgeMasterKey {
    recipient: x25519::Recipient,
    identities: Arc<Vec<x25519::Identity>>,
}

impl fmt::Debug for AgeMasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgeMasterKey")
            .field("recipient", &self.recipient.to_string())
            .finish_non_exhaustive()
    }
}

impl MasterKey for AgeMasterKey {
    fn scheme(&self) -> &'static str {
        AGE_SCHEME
    }

    fn recipient(&self) -> String {
        self.recipient.to_string()
    }

    fn wrap_key(&self, secret: &[u8]) -> CryptoResult<String> {
        let wrap_err = |e: &dyn fmt::Display| CryptoError::Wrap(format!("age: {e}"));

        let encryptor = age::Encryptor::with_recipients(iter::once(&self.recipient as &dyn age::Recipient))
            .map_err(|e| wrap_err(&e))?;

        let mut out = Vec::new();
        let armor = ArmoredWriter::wrap_output(&mut out, Format::AsciiArmor).map_err(|e| wrap_err(&e))?;
        let mut writer = encryptor.wrap_output(armor).map_err(|e| wrap_err(&e))?;
        writer.write_all(secret).map_err(|e| wrap_err(&e))?;
        writer
            .finish()
            .and_then(|armor| armor.finish())
            .map_err(|e| wrap_err(&e))?;

        String::from_utf8(out).map_err(|e| wrap_err(&e))
    }

    fn unwrap_key(&self, wrapped: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if self.identities.is_empty() {
            return Err(CryptoError::Unwrap("no age identities available".into()));
        }

        let decryptor = age::Decryptor::new_buffered(ArmoredReader::new(wrapped.as_bytes()))
            .map_err(|e| CryptoError::Unwrap(format!("failed to parse age ciphertext: {e}")))?;

        if decryptor.is_scrypt() {
            return Err(CryptoError::Unwrap(
                "passphrase-encrypted age files are not supported".into(),
            ));
        }

        let mut reader = decryptor
            .decrypt(self.identities.iter().map(|i| i as &dyn age::Identity))
            .map_err(|e| CryptoError::Unwrap(format!("age: {e}")))?;

        let mut plaintext = Zeroizing::new(Vec::new());
        let mut buffer = Zeroizing::new([0u8; 256]);
        loop {
            let read = reader
                .read(&mut buffer[..])
                .map_err(|e| CryptoError::Unwrap(format!("age: {e}")))?;
            if read == 0 {
                break;
            }
            if plaintext.len() + read > MAX_UNWRAPPED_SIZE {
                return Err(CryptoError::Unwrap(format!(
                    "unwrapped secret exceeds {MAX_UNWRAPPED_SIZE} bytes"
                )));
            }
            plaintext.extend_from_slice(&buffer[..read]);
        }

        trace!(recipient = %self.recipient, "age unwrap succeeded");
        Ok(plaintext)
    }
}

/// Parses `AGE-SECRET-KEY-1…` lines. Blank lines and `#` comments are
/// skipped.
pub fn parse_identities(contents: &str) -> CryptoResult<Vec<x25519::Identity>> {
    let mut identities = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.starts_with("AGE-SECRET-KEY-1") {
            return Err(CryptoError::KeyResolution(format!(
                "line {} is not an age secret key",
                index + 1
            )));
        }
        // Never echo the line itself.
        let identity = x25519::Identity::from_str(line).map_err(|_| {
            CryptoError::KeyResolution(format!("line {} holds a malformed age secret key", index + 1))
        })?;
        identities.push(identity);
    }
    Ok(identities)
}

/// A freshly generated age key pair.
pub struct AgeKeyPair {
    pub identity: x25519::Identity,
    pub recipient: String,
}

impl AgeKeyPair {
    /// The secret key line, `AGE-SECRET-KEY-1…`.
    pub fn secret_line(&self) -> Zeroizing<String> {
        Zeroizing::new(self.identity.to_string().expose_secret().to_string())
    }
}

/// Generates a new age identity.
pub fn generate_age_identity() -> AgeKeyPair {
    let identity = x25519::Identity::generate();
    let recipient = identity.to_public().to_string();
    AgeKeyPair { identity, recipient }
}
