//! Byte-level encode/decode capabilities.
//!
//! The file walker depends on these traits, not on the concrete engines, so
//! tests and callers can plug in closures.

use crate::error::{EngineError, EngineResult, Operation};
use std::path::Path;

/// Turns plaintext file contents into their encrypted form.
pub trait Encoder: Send + Sync {
    /// `file_name` selects the format and is reported in errors.
    fn encode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>>;

    /// Reads and encodes a file. Nothing is written.
    fn encode_file(&self, path: &Path) -> EngineResult<Vec<u8>> {
        let data = read(Operation::Encode, path)?;
        self.encode(&path.to_string_lossy(), &data)
    }
}

/// Turns encrypted file contents back into plaintext.
pub trait Decoder: Send + Sync {
    fn decode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>>;

    /// Reads and decodes a file. Nothing is written.
    fn decode_file(&self, path: &Path) -> EngineResult<Vec<u8>> {
        let data = read(Operation::Decode, path)?;
        self.decode(&path.to_string_lossy(), &data)
    }
}

impl<F> Encoder for F
where
    F: Fn(&str, &[u8]) -> EngineResult<Vec<u8>> + Send + Sync,
{
    fn encode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        self(file_name, data)
    }
}

impl<F> Decoder for F
where
    F: Fn(&str, &[u8]) -> EngineResult<Vec<u8>> + Send + Sync,
{
    fn decode(&self, file_name: &str, data: &[u8]) -> EngineResult<Vec<u8>> {
        self(file_name, data)
    }
}

fn read(op: Operation, path: &Path) -> EngineResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| EngineError::Io {
        op,
        file: path.display().to_string(),
        source,
    })
}
