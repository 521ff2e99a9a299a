//! Error types for file operations.

use sealcfg_engine::{BoxError, EngineError};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for file operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors raised while walking or persisting files.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list directory {}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("skip predicate failed for {}", path.display())]
    Predicate {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to transform {}", path.display())]
    Engine {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
}

impl FsError {
    /// The file or directory the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::ListDir { path, .. }
            | Self::Write { path, .. }
            | Self::Predicate { path, .. }
            | Self::Engine { path, .. } => path,
        }
    }

    /// The engine failure, when the transform itself failed.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Engine { source, .. } => Some(source),
            _ => None,
        }
    }
}
