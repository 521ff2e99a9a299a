//! Master keys, key groups and the provider interface.
//!
//! A master key wraps the per-document secret for one recipient. Providers
//! turn recipient strings of one scheme into master keys; private credentials
//! are handed to the provider at construction time and never read from the
//! environment.

use crate::error::CryptoResult;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// A handle able to wrap and unwrap secrets for one recipient.
pub trait MasterKey: Send + Sync + fmt::Debug {
    /// Scheme name used as the metadata map key (`age`, `box`).
    fn scheme(&self) -> &'static str;

    /// Public recipient string, stored in plaintext next to the wrapped key.
    fn recipient(&self) -> String;

    /// Wraps `secret` for this recipient.
    fn wrap_key(&self, secret: &[u8]) -> CryptoResult<String>;

    /// Recovers a secret from its wrapped form. Requires private credentials.
    fn unwrap_key(&self, wrapped: &str) -> CryptoResult<Zeroizing<Vec<u8>>>;
}

/// Turns recipient strings of one scheme into master keys.
pub trait KeyGroupProvider: Send + Sync {
    /// Scheme handled by this provider.
    fn scheme(&self) -> &'static str;

    /// Whether the recipient string belongs to this scheme.
    fn accepts(&self, recipient: &str) -> bool;

    /// Builds a master key for `recipient`. Fails on malformed input.
    fn master_key(&self, recipient: &str) -> CryptoResult<Arc<dyn MasterKey>>;
}

/// An ordered group of master keys. Any one member can unwrap the group's
/// secret.
#[derive(Clone, Debug, Default)]
pub struct KeyGroup {
    members: Vec<Arc<dyn MasterKey>>,
}

impl KeyGroup {
    pub fn new(members: Vec<Arc<dyn MasterKey>>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, key: Arc<dyn MasterKey>) {
        self.members.push(key);
    }

    pub fn members(&self) -> &[Arc<dyn MasterKey>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl From<Vec<Arc<dyn MasterKey>>> for KeyGroup {
    fn from(members: Vec<Arc<dyn MasterKey>>) -> Self {
        Self::new(members)
    }
}
