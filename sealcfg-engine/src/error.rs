//! Error types for the encryption and decryption engines.

use sealcfg_crypto::CryptoError;
use sealcfg_document::DocumentError;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Boxed error for causes that come from more than one layer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which half of the engine produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Encode,
    Decode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Encode => "encode failed",
            Self::Decode => "decode failed",
        })
    }
}

/// Stable classification of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    FormatMismatch,
    AlreadyEncrypted,
    NotEncrypted,
    KeyResolution,
    KeyUnavailable,
    Integrity,
    Auth,
    Serialize,
    Io,
    Config,
}

/// Errors that abort an encode or decode pass.
///
/// Display always starts with the [`Operation`] sentinel; the underlying
/// cause is available through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input could not be parsed in its format.
    #[error("{op}: {file}: parse error")]
    Parse {
        op: Operation,
        file: String,
        #[source]
        source: DocumentError,
    },

    /// The content does not match the declared format.
    #[error("{op}: {file}: format mismatch")]
    FormatMismatch {
        op: Operation,
        file: String,
        #[source]
        source: DocumentError,
    },

    /// The document already carries envelope metadata.
    #[error("{op}: {file}: already encrypted (branch {branch} of {total})")]
    AlreadyEncrypted {
        op: Operation,
        file: String,
        branch: usize,
        total: usize,
    },

    /// The document carries no envelope metadata.
    #[error("{op}: {file}: not encrypted")]
    NotEncrypted { op: Operation, file: String },

    /// A recipient could not be turned into a usable key.
    #[error("{op}: key resolution")]
    KeyResolution {
        op: Operation,
        #[source]
        source: CryptoError,
    },

    /// Not enough key groups could unwrap the data key.
    #[error("{op}: {file}: data key unavailable")]
    KeyUnavailable {
        op: Operation,
        file: String,
        #[source]
        source: CryptoError,
    },

    /// The integrity tag does not match the encrypted leaves.
    #[error("{op}: {file}: integrity check failed")]
    Integrity {
        op: Operation,
        file: String,
        #[source]
        source: CryptoError,
    },

    /// A leaf failed to encrypt or authenticate.
    #[error("{op}: {file}: leaf {path} failed")]
    Auth {
        op: Operation,
        file: String,
        path: String,
        #[source]
        source: BoxError,
    },

    /// The output could not be serialized.
    #[error("{op}: {file}: serialize error")]
    Serialize {
        op: Operation,
        file: String,
        #[source]
        source: DocumentError,
    },

    /// Reading the input failed.
    #[error("{op}: {file}: I/O error")]
    Io {
        op: Operation,
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid builder settings.
    #[error("{op}: invalid configuration: {reason}")]
    Config { op: Operation, reason: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::FormatMismatch { .. } => ErrorKind::FormatMismatch,
            Self::AlreadyEncrypted { .. } => ErrorKind::AlreadyEncrypted,
            Self::NotEncrypted { .. } => ErrorKind::NotEncrypted,
            Self::KeyResolution { .. } => ErrorKind::KeyResolution,
            Self::KeyUnavailable { .. } => ErrorKind::KeyUnavailable,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Serialize { .. } => ErrorKind::Serialize,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Parse { op, .. }
            | Self::FormatMismatch { op, .. }
            | Self::AlreadyEncrypted { op, .. }
            | Self::NotEncrypted { op, .. }
            | Self::KeyResolution { op, .. }
            | Self::KeyUnavailable { op, .. }
            | Self::Integrity { op, .. }
            | Self::Auth { op, .. }
            | Self::Serialize { op, .. }
            | Self::Io { op, .. }
            | Self::Config { op, .. } => *op,
        }
    }

    /// The file the error refers to, if it is tied to one.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Parse { file, .. }
            | Self::FormatMismatch { file, .. }
            | Self::AlreadyEncrypted { file, .. }
            | Self::NotEncrypted { file, .. }
            | Self::KeyUnavailable { file, .. }
            | Self::Integrity { file, .. }
            | Self::Auth { file, .. }
            | Self::Serialize { file, .. }
            | Self::Io { file, .. } => Some(file.as_str()),
            Self::KeyResolution { .. } | Self::Config { .. } => None,
        }
    }

    pub(crate) fn config(op: Operation, reason: impl ToString) -> Self {
        Self::Config {
            op,
            reason: reason.to_string(),
        }
    }

    /// Classifies a failure while loading a document.
    pub(crate) fn load(op: Operation, file: &str, source: DocumentError) -> Self {
        let file = file.to_string();
        match source {
            DocumentError::FormatMismatch { .. } => Self::FormatMismatch { op, file, source },
            source => Self::Parse { op, file, source },
        }
    }

    pub(crate) fn serialize(op: Operation, file: &str, source: DocumentError) -> Self {
        Self::Serialize {
            op,
            file: file.to_string(),
            source,
        }
    }
}
