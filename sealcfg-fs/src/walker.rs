//! Recursive encode/decode over a directory tree.

use crate::atomic::write_atomic;
use crate::error::{FsError, FsResult};
use crate::predicate::SkipPredicate;
use sealcfg_engine::{Decoder, Encoder, EngineResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happens when a file fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WalkPolicy {
    /// Stop and return the first error.
    #[default]
    AbortOnFirstError,
    /// Keep going and report every failure in the [`WalkReport`].
    CollectErrors,
}

/// Outcome of a walk.
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Files that were transformed, including those whose output matched
    /// the input and were left untouched on disk.
    pub processed: Vec<PathBuf>,
    /// Files excluded by a predicate, and symbolic links.
    pub skipped: Vec<PathBuf>,
    /// Failures, only populated under [`WalkPolicy::CollectErrors`].
    pub failed: Vec<FsError>,
}

impl WalkReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum Outcome {
    Written,
    Unchanged,
    Skipped,
}

/// Applies an encoder or decoder to every file under a root.
pub struct Walker {
    policy: WalkPolicy,
    predicates: Vec<Box<dyn SkipPredicate>>,
}

impl Walker {
    pub fn new(policy: WalkPolicy) -> Self {
        Self {
            policy,
            predicates: Vec::new(),
        }
    }

    /// Adds a skip predicate. Files are skipped when any predicate says so.
    pub fn skip(mut self, predicate: impl SkipPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn policy(&self) -> WalkPolicy {
        self.policy
    }

    /// Encrypts every file under `root` in place. `root` may be a file.
    pub fn encode_tree(&self, root: &Path, encoder: &dyn Encoder) -> FsResult<WalkReport> {
        self.run(root, &|name: &str, data: &[u8]| encoder.encode(name, data))
    }

    /// Decrypts every file under `root` in place. `root` may be a file.
    pub fn decode_tree(&self, root: &Path, decoder: &dyn Decoder) -> FsResult<WalkReport> {
        self.run(root, &|name: &str, data: &[u8]| decoder.decode(name, data))
    }

    fn run(&self, root: &Path, transform: &dyn Fn(&str, &[u8]) -> EngineResult<Vec<u8>>) -> FsResult<WalkReport> {
        let mut report = WalkReport::default();
        self.visit(root, transform, &mut report)?;
        info!(
            root = %root.display(),
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "walk finished"
        );
        Ok(report)
    }

    fn visit(
        &self,
        path: &Path,
        transform: &dyn Fn(&str, &[u8]) -> EngineResult<Vec<u8>>,
        report: &mut WalkReport,
    ) -> FsResult<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(source) => {
                return self.fail(
                    FsError::Read {
                        path: path.to_path_buf(),
                        source,
                    },
                    report,
                );
            }
        };

        if metadata.file_type().is_symlink() {
            debug!(path = %path.display(), "skipping symbolic link");
            report.skipped.push(path.to_path_buf());
            return Ok(());
        }

        if metadata.is_dir() {
            let entries = match sorted_entries(path) {
                Ok(entries) => entries,
                Err(err) => return self.fail(err, report),
            };
            for entry in entries {
                self.visit(&entry, transform, report)?;
            }
            return Ok(());
        }

        match self.process_file(path, metadata.permissions(), transform) {
            Ok(Outcome::Skipped) => report.skipped.push(path.to_path_buf()),
            Ok(Outcome::Written | Outcome::Unchanged) => report.processed.push(path.to_path_buf()),
            Err(err) => return self.fail(err, report),
        }
        Ok(())
    }

    fn process_file(
        &self,
        path: &Path,
        permissions: fs::Permissions,
        transform: &dyn Fn(&str, &[u8]) -> EngineResult<Vec<u8>>,
    ) -> FsResult<Outcome> {
        for predicate in &self.predicates {
            let skip = predicate.should_skip(path).map_err(|source| FsError::Predicate {
                path: path.to_path_buf(),
                source,
            })?;
            if skip {
                debug!(path = %path.display(), "skipped by predicate");
                return Ok(Outcome::Skipped);
            }
        }

        let input = fs::read(path).map_err(|source| FsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path.to_string_lossy();
        let output = transform(name.as_ref(), input.as_slice()).map_err(|source| FsError::Engine {
            path: path.to_path_buf(),
            source,
        })?;

        if output == input {
            debug!(path = %path.display(), "unchanged");
            return Ok(Outcome::Unchanged);
        }
        write_atomic(path, &output, Some(permissions))?;
        debug!(path = %path.display(), bytes = output.len(), "rewritten");
        Ok(Outcome::Written)
    }

    fn fail(&self, err: FsError, report: &mut WalkReport) -> FsResult<()> {
        match self.policy {
            WalkPolicy::AbortOnFirstError => Err(err),
            WalkPolicy::CollectErrors => {
                warn!(path = %err.path().display(), error = %err, "file failed");
                report.failed.push(err);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("policy", &self.policy)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

fn sorted_entries(dir: &Path) -> FsResult<Vec<PathBuf>> {
    let list_error = |source| FsError::ListDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(list_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(list_error)?;
    entries.sort();
    Ok(entries)
}
