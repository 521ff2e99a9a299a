//! `sealcfg.toml` configuration. Flags given on the command line win over
//! values from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sealcfg.toml";

/// Defaults for `sealcfg encrypt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptConfig {
    /// Recipients forming a single key group.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Key groups, each a list of recipients.
    #[serde(default)]
    pub key_groups: Vec<Vec<String>>,
    #[serde(default)]
    pub shamir_threshold: Option<usize>,
    #[serde(default)]
    pub encrypted_regex: Option<String>,
    #[serde(default)]
    pub unencrypted_regex: Option<String>,
    #[serde(default)]
    pub encrypted_suffix: Option<String>,
    #[serde(default)]
    pub unencrypted_suffix: Option<String>,
    #[serde(default = "default_cipher")]
    pub cipher: String,
}

fn default_cipher() -> String {
    "aes256-gcm".to_string()
}

impl Default for EncryptConfig {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            key_groups: Vec::new(),
            shamir_threshold: None,
            encrypted_regex: None,
            unencrypted_regex: None,
            encrypted_suffix: None,
            unencrypted_suffix: None,
            cipher: default_cipher(),
        }
    }
}

/// Defaults for `sealcfg decrypt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecryptConfig {
    #[serde(default)]
    pub identity_files: Vec<PathBuf>,
    #[serde(default)]
    pub pass_through_plain: bool,
}

/// Directory walk settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalkConfig {
    #[serde(default)]
    pub collect_errors: bool,
    #[serde(default)]
    pub skip_hidden: bool,
    /// Extensions never touched by directory walks.
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
    /// Regular expression on the full path of files to leave alone.
    #[serde(default)]
    pub skip_pattern: Option<String>,
}

fn default_skip_extensions() -> Vec<String> {
    vec!["lock".to_string()]
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            collect_errors: false,
            skip_hidden: false,
            skip_extensions: default_skip_extensions(),
            skip_pattern: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub encrypt: EncryptConfig,
    #[serde(default)]
    pub decrypt: DecryptConfig,
    #[serde(default)]
    pub walk: WalkConfig,
}

impl CliConfig {
    /// Loads `explicit` if given, otherwise `./sealcfg.toml` when it exists,
    /// otherwise the defaults. An unreadable or malformed file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load_from(fallback)
                } else {
                    debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.encrypt.cipher, "aes256-gcm");
        assert_eq!(config.walk.skip_extensions, vec!["lock"]);
    }

    #[test]
    fn full_file() {
        let config = CliConfig::parse(
            r#"
[encrypt]
key_groups = [["age1a", "box:b"], ["age1c"]]
shamir_threshold = 2
encrypted_suffix = "_secret"
cipher = "chacha20-poly1305"

[decrypt]
identity_files = ["keys.txt"]
pass_through_plain = true

[walk]
collect_errors = true
skip_extensions = []
skip_pattern = "/vendor/"
"#,
        )
        .unwrap();
        assert_eq!(config.encrypt.key_groups.len(), 2);
        assert_eq!(config.encrypt.shamir_threshold, Some(2));
        assert_eq!(config.encrypt.encrypted_suffix.as_deref(), Some("_secret"));
        assert_eq!(config.decrypt.identity_files, vec![PathBuf::from("keys.txt")]);
        assert!(config.decrypt.pass_through_plain);
        assert!(config.walk.collect_errors);
        assert!(config.walk.skip_extensions.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(CliConfig::parse("this is not valid toml {{{{").is_err());
        assert!(CliConfig::parse("[encrypt]\nunknown = 1\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealcfg.toml");
        std::fs::write(&path, "[walk]\nskip_hidden = true\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert!(config.walk.skip_hidden);
        assert_eq!(config.encrypt, EncryptConfig::default());
    }
}
