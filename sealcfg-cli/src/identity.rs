//! Loading private keys for decryption.
//!
//! Sources are named explicitly: identity files and at most one environment
//! variable. Key material is never logged or echoed in errors.

use anyhow::{bail, Context, Result};
use sealcfg_crypto::{
    parse_identities, parse_secret_keys, AgeIdentity, AgeProvider, BoxProvider, BoxSecretKey,
    Keyring,
};
use std::path::Path;
use tracing::debug;
use zeroize::Zeroizing;

const AGE_SECRET_PREFIX: &str = "AGE-SECRET-KEY-";
const BOX_SECRET_PREFIX: &str = "box-secret:";

/// Private keys collected from every source.
#[derive(Default)]
pub struct Identities {
    pub age: Vec<AgeIdentity>,
    pub boxes: Vec<BoxSecretKey>,
}

impl Identities {
    pub fn len(&self) -> usize {
        self.age.len() + self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds the keys found in `contents`, one per line. Blank lines and
    /// `#` comments are ignored. `source` names the origin in errors.
    pub fn add_from_str(&mut self, contents: &str, source: &str) -> Result<()> {
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let context = || format!("{source}: line {}", index + 1);
            if line.starts_with(AGE_SECRET_PREFIX) {
                self.age.extend(parse_identities(line).with_context(context)?);
            } else if line.starts_with(BOX_SECRET_PREFIX) {
                self.boxes.extend(parse_secret_keys(line).with_context(context)?);
            } else {
                bail!("{}: not an age or box secret key", context());
            }
        }
        Ok(())
    }

    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let contents = Zeroizing::new(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read identity file {}", path.display()))?,
        );
        let before = self.len();
        self.add_from_str(&contents, &path.display().to_string())?;
        debug!(path = %path.display(), keys = self.len() - before, "loaded identity file");
        Ok(())
    }

    pub fn add_env(&mut self, var: &str) -> Result<()> {
        let contents = Zeroizing::new(
            std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?,
        );
        let before = self.len();
        self.add_from_str(&contents, var)?;
        debug!(var, keys = self.len() - before, "loaded identities from environment");
        Ok(())
    }

    /// Builds a keyring holding only the collected keys.
    pub fn into_keyring(self) -> Keyring {
        Keyring::new()
            .with_provider(AgeProvider::with_identities(self.age))
            .with_provider(BoxProvider::with_secret_keys(self.boxes))
    }
}

impl std::fmt::Debug for Identities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identities")
            .field("age", &self.age.len())
            .field("boxes", &self.boxes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealcfg_crypto::{encode_secret_key, generate_age_identity, generate_box_keypair};

    #[test]
    fn mixed_key_file() {
        let age = generate_age_identity();
        let boxed = generate_box_keypair();
        let contents = format!(
            "# created: today\n# public key: {}\n{}\n\n{}\n",
            age.recipient,
            age.secret_line().as_str(),
            encode_secret_key(&boxed.secret).as_str()
        );

        let mut identities = Identities::default();
        identities.add_from_str(&contents, "keys.txt").unwrap();
        assert_eq!(identities.age.len(), 1);
        assert_eq!(identities.boxes.len(), 1);
    }

    #[test]
    fn errors_do_not_echo_keys() {
        let mut identities = Identities::default();
        let err = identities
            .add_from_str("AGE-SECRET-KEY-1NOTREALLYAKEY\n", "keys.txt")
            .unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("keys.txt: line 1"));
        assert!(!rendered.contains("NOTREALLYAKEY"));

        let err = identities.add_from_str("\nhunter2\n", "ENV").unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("ENV: line 2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let mut identities = Identities::default();
        let err = identities.add_file(Path::new("/nonexistent/keys.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/keys.txt"));
    }
}
