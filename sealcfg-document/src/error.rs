//! Error types for the document layer.

use crate::format::FormatTag;
use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while parsing or emitting structured documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The bytes are not valid for the selected format.
    #[error("{format} parse error: {reason}")]
    Parse { format: FormatTag, reason: String },

    /// The content belongs to a different format than the one selected.
    #[error("content is {found} but the file is declared as {declared}")]
    FormatMismatch { declared: FormatTag, found: FormatTag },

    /// The tree cannot be represented in the selected format.
    #[error("{format} serialize error: {reason}")]
    Serialize { format: FormatTag, reason: String },

    /// An `ENC[...]` value could not be decoded.
    #[error("malformed encrypted value: {0}")]
    MalformedEnvelope(String),

    /// The metadata block is missing fields or has the wrong shape.
    #[error("invalid metadata: {0}")]
    Metadata(String),

    /// JSON conversion error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DocumentError {
    pub(crate) fn parse(format: FormatTag, reason: impl ToString) -> Self {
        Self::Parse {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn serialize(format: FormatTag, reason: impl ToString) -> Self {
        Self::Serialize {
            format,
            reason: reason.to_string(),
        }
    }
}
