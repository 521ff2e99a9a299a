//! Which leaves get encrypted.
//!
//! A scope tests the leaf's local key name only, never the full path. For
//! sequence elements the local key is the nearest enclosing mapping key.

use crate::error::{EngineError, EngineResult, Operation};
use regex::Regex;
use sealcfg_document::ScopeRecord;

/// Scope expression persisted in metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Encrypt keys the regex matches. An empty regex matches everything.
    EncryptedRegex(String),
    /// Encrypt keys the regex does not match.
    UnencryptedRegex(String),
    /// Encrypt keys ending with the suffix.
    EncryptedSuffix(String),
    /// Encrypt keys not ending with the suffix.
    UnencryptedSuffix(String),
}

impl Default for Scope {
    fn default() -> Self {
        Self::EncryptedRegex(String::new())
    }
}

impl Scope {
    /// Builds a scope from at most one configured option.
    pub fn from_options(
        encrypted_regex: Option<String>,
        unencrypted_regex: Option<String>,
        encrypted_suffix: Option<String>,
        unencrypted_suffix: Option<String>,
    ) -> EngineResult<Self> {
        let mut chosen: Vec<Scope> = [
            encrypted_regex.map(Scope::EncryptedRegex),
            unencrypted_regex.map(Scope::UnencryptedRegex),
            encrypted_suffix.map(Scope::EncryptedSuffix),
            unencrypted_suffix.map(Scope::UnencryptedSuffix),
        ]
        .into_iter()
        .flatten()
        .collect();

        match chosen.len() {
            0 => Ok(Self::default()),
            1 => Ok(chosen.remove(0)),
            _ => Err(EngineError::config(
                Operation::Encode,
                "only one of encrypted_regex, unencrypted_regex, encrypted_suffix, unencrypted_suffix may be set",
            )),
        }
    }

    /// The metadata form of this scope.
    pub fn to_record(&self) -> ScopeRecord {
        let mut record = ScopeRecord::default();
        match self {
            Self::EncryptedRegex(re) => record.encrypted_regex = Some(re.clone()),
            Self::UnencryptedRegex(re) => record.unencrypted_regex = Some(re.clone()),
            Self::EncryptedSuffix(s) => record.encrypted_suffix = Some(s.clone()),
            Self::UnencryptedSuffix(s) => record.unencrypted_suffix = Some(s.clone()),
        }
        record
    }

    /// Compiles the scope into a matcher.
    pub fn compile(&self) -> EngineResult<ScopeMatcher> {
        let compile = |re: &str| {
            Regex::new(re).map_err(|e| EngineError::config(Operation::Encode, format!("invalid scope regex: {e}")))
        };
        let rule = match self {
            Self::EncryptedRegex(re) if re.is_empty() => Rule::All,
            Self::EncryptedRegex(re) => Rule::Regex(compile(re)?, true),
            Self::UnencryptedRegex(re) => Rule::Regex(compile(re)?, false),
            Self::EncryptedSuffix(s) => Rule::Suffix(s.clone(), true),
            Self::UnencryptedSuffix(s) => Rule::Suffix(s.clone(), false),
        };
        Ok(ScopeMatcher { rule })
    }
}

/// A compiled, stateless scope test.
#[derive(Clone, Debug)]
pub struct ScopeMatcher {
    rule: Rule,
}

#[derive(Clone, Debug)]
enum Rule {
    All,
    /// Pattern and whether a match means "encrypt".
    Regex(Regex, bool),
    Suffix(String, bool),
}

impl ScopeMatcher {
    /// Returns true if a leaf under `leaf_key` must be encrypted.
    pub fn matches(&self, leaf_key: &str) -> bool {
        match &self.rule {
            Rule::All => true,
            Rule::Regex(re, encrypt) => re.is_match(leaf_key) == *encrypt,
            Rule::Suffix(suffix, encrypt) => leaf_key.ends_with(suffix.as_str()) == *encrypt,
        }
    }
}
