//! Skip predicates consulted before a file is transformed.

use regex::Regex;
use sealcfg_document::FormatTag;
use sealcfg_engine::BoxError;
use std::path::Path;

/// Decides whether a file is left alone.
///
/// An `Err` aborts processing of that path; the walk policy decides whether
/// the rest of the tree continues.
pub trait SkipPredicate: Send + Sync {
    fn should_skip(&self, path: &Path) -> Result<bool, BoxError>;
}

impl<F> SkipPredicate for F
where
    F: Fn(&Path) -> Result<bool, BoxError> + Send + Sync,
{
    fn should_skip(&self, path: &Path) -> Result<bool, BoxError> {
        self(path)
    }
}

/// Skips files whose name starts with a dot.
pub fn skip_hidden(path: &Path) -> Result<bool, BoxError> {
    Ok(path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.')))
}

/// Skips files with any of the listed extensions (case-insensitive).
#[derive(Clone, Debug)]
pub struct SkipExtensions {
    extensions: Vec<String>,
}

impl SkipExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl SkipPredicate for SkipExtensions {
    fn should_skip(&self, path: &Path) -> Result<bool, BoxError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(false);
        };
        let ext = ext.to_ascii_lowercase();
        Ok(self.extensions.iter().any(|skip| *skip == ext))
    }
}

/// Skips every file whose detected format is not listed.
#[derive(Clone, Debug)]
pub struct OnlyFormats {
    formats: Vec<FormatTag>,
}

impl OnlyFormats {
    pub fn new(formats: impl IntoIterator<Item = FormatTag>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }
}

impl SkipPredicate for OnlyFormats {
    fn should_skip(&self, path: &Path) -> Result<bool, BoxError> {
        Ok(!self.formats.contains(&FormatTag::from_path(path)))
    }
}

/// Skips files whose full path matches a regular expression.
#[derive(Clone, Debug)]
pub struct SkipPattern {
    pattern: Regex,
}

impl SkipPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl SkipPredicate for SkipPattern {
    fn should_skip(&self, path: &Path) -> Result<bool, BoxError> {
        Ok(self.pattern.is_match(&path.to_string_lossy()))
    }
}
