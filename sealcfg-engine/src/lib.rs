//! Selective envelope encryption for structured configuration files.
//!
//! [`EnvelopeEncoder`] encrypts the leaves whose key matches a [`Scope`] and
//! attaches a metadata block with the wrapped data key and an integrity tag.
//! [`EnvelopeDecoder`] reverses it, verifying the tag before any leaf is
//! decrypted.
//!
//! ```no_run
//! use sealcfg_engine::{EnvelopeEncoder, Scope};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let encoder = EnvelopeEncoder::builder()
//!     .recipients(["age1ql3z7hjy54pw3hyww5ayyfg7zqgvc7w3j2elw8zmrj2kg5sfn9aqmcac8p"])
//!     .scope(Scope::EncryptedRegex("^password$".into()))
//!     .build()?;
//! let sealed = encoder.encrypt("app.yaml", b"user: admin\npassword: hunter2\n")?;
//! # let _ = sealed;
//! # Ok(())
//! # }
//! ```

mod codec;
mod decoder;
mod encoder;
mod error;
mod records;
mod scope;
pub mod tree;

pub use codec::{Decoder, Encoder};
pub use decoder::{DecoderBuilder, EnvelopeDecoder, NotEncryptedPolicy};
pub use encoder::{EncoderBuilder, EnvelopeEncoder};
pub use error::{BoxError, EngineError, EngineResult, ErrorKind, Operation};
pub use scope::{Scope, ScopeMatcher};

pub use sealcfg_crypto::{CipherSuite, Keyring};
pub use sealcfg_document::{FormatRegistry, FormatTag};
