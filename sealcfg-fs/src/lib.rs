//! File collaborator for sealcfg.
//!
//! Walks directory trees, applies an [`Encoder`](sealcfg_engine::Encoder) or
//! [`Decoder`](sealcfg_engine::Decoder) to each file and persists results
//! atomically.
//!
//! # Example
//!
//! ```no_run
//! use sealcfg_fs::{skip_hidden, WalkPolicy, Walker};
//! use sealcfg_engine::EnvelopeDecoder;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let decoder = EnvelopeDecoder::builder().build();
//! let report = Walker::new(WalkPolicy::CollectErrors)
//!     .skip(skip_hidden)
//!     .decode_tree(Path::new("deploy/"), &decoder)?;
//! for failure in &report.failed {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```

mod atomic;
mod error;
mod predicate;
mod walker;

pub use atomic::write_atomic;
pub use error::{FsError, FsResult};
pub use predicate::{skip_hidden, OnlyFormats, SkipExtensions, SkipPattern, SkipPredicate};
pub use walker::{WalkPolicy, WalkReport, Walker};
