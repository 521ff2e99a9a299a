//! Recipient routing across providers.

use crate::age_scheme::AgeProvider;
use crate::error::{CryptoError, CryptoResult};
use crate::master_key::{KeyGroup, KeyGroupProvider, MasterKey};
use crate::sealed_box::BoxProvider;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An ordered set of providers. Recipients are routed to the first provider
/// that accepts them.
#[derive(Clone, Default)]
pub struct Keyring {
    providers: Vec<Arc<dyn KeyGroupProvider>>,
}

impl Keyring {
    /// An empty keyring. Every recipient fails to resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in age and box providers without private credentials.
    pub fn with_default_providers() -> Self {
        Self::new()
            .with_provider(AgeProvider::new())
            .with_provider(BoxProvider::new())
    }

    /// Adds a provider. A later provider for an already registered scheme
    /// replaces the earlier one.
    pub fn with_provider(mut self, provider: impl KeyGroupProvider + 'static) -> Self {
        self.register(Arc::new(provider));
        self
    }

    pub fn register(&mut self, provider: Arc<dyn KeyGroupProvider>) {
        self.providers.retain(|p| p.scheme() != provider.scheme());
        self.providers.push(provider);
    }

    /// Registered scheme names, in registration order.
    pub fn schemes(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.scheme()).collect()
    }

    /// Resolves one recipient string to a master key.
    pub fn resolve(&self, recipient: &str) -> CryptoResult<Arc<dyn MasterKey>> {
        let recipient = recipient.trim();
        let provider = self
            .providers
            .iter()
            .find(|p| p.accepts(recipient))
            .ok_or_else(|| CryptoError::KeyResolution(format!("unsupported recipient scheme: {recipient}")))?;
        provider.master_key(recipient)
    }

    /// Resolves a stored `(scheme, recipient)` pair. The scheme must match
    /// the provider that accepts the recipient.
    pub fn resolve_stored(&self, scheme: &str, recipient: &str) -> CryptoResult<Arc<dyn MasterKey>> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.scheme() == scheme)
            .ok_or_else(|| CryptoError::KeyResolution(format!("unknown key scheme: {scheme}")))?;
        if !provider.accepts(recipient) {
            return Err(CryptoError::KeyResolution(format!(
                "recipient {recipient} does not belong to scheme {scheme}"
            )));
        }
        provider.master_key(recipient)
    }

    /// Resolves groups of recipient strings into key groups.
    pub fn resolve_groups<S: AsRef<str>>(&self, groups: &[Vec<S>]) -> CryptoResult<Vec<KeyGroup>> {
        if groups.is_empty() {
            return Err(CryptoError::KeyResolution("no recipients given".into()));
        }
        let mut resolved = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(CryptoError::KeyResolution(format!("key group {} is empty", index + 1)));
            }
            let keys = group
                .iter()
                .map(|recipient| self.resolve(recipient.as_ref()))
                .collect::<CryptoResult<Vec<_>>>()?;
            resolved.push(KeyGroup::new(keys));
        }
        debug!(
            groups = resolved.len(),
            recipients = resolved.iter().map(KeyGroup::len).sum::<usize>(),
            "resolved key groups"
        );
        Ok(resolved)
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring").field("schemes", &self.schemes()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::age_scheme::generate_age_identity;
    use crate::sealed_box::generate_box_keypair;

    #[test]
    fn routes_by_prefix() {
        let keyring = Keyring::with_default_providers();
        let age = generate_age_identity();
        let boxed = generate_box_keypair();
        assert_eq!(keyring.resolve(&age.recipient).unwrap().scheme(), "age");
        assert_eq!(keyring.resolve(&boxed.recipient).unwrap().scheme(), "box");
    }

    #[test]
    fn unknown_scheme_fails() {
        let keyring = Keyring::with_default_providers();
        assert!(matches!(
            keyring.resolve("pgp:ABCDEF"),
            Err(CryptoError::KeyResolution(_))
        ));
        assert!(keyring.resolve_stored("kms", "arn:aws:kms:...").is_err());
    }

    #[test]
    fn empty_group_fails() {
        let keyring = Keyring::with_default_providers();
        let groups: Vec<Vec<String>> = vec![vec![]];
        assert!(keyring.resolve_groups(&groups).is_err());
    }

    #[test]
    fn later_provider_replaces_earlier() {
        let keyring = Keyring::with_default_providers().with_provider(AgeProvider::new());
        assert_eq!(keyring.schemes(), vec!["box", "age"]);
    }
}
