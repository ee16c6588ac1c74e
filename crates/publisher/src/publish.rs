//! One-shot publishing
//!
//! Copies every entry of every bundle into the output root, in manifest
//! order. A failing entry is recorded and the pass continues, so every
//! entry that can be copied is.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use courier_config::Bundle;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::PublishError;

/// An entry that was copied
#[derive(Debug, Clone)]
pub struct CopiedEntry {
    pub bundle: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// An entry that could not be copied
#[derive(Debug)]
pub struct FailedEntry {
    pub bundle: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: PublishError,
}

/// Result of a publish pass
#[derive(Debug, Default)]
pub struct PublishReport {
    pub copied: Vec<CopiedEntry>,
    pub failed: Vec<FailedEntry>,
}

impl PublishReport {
    /// True when no entry failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total bytes written
    pub fn bytes_copied(&self) -> u64 {
        self.copied.iter().map(|c| c.bytes).sum()
    }

    /// Format the report for display
    pub fn display(&self) -> String {
        let mut output = format!(
            "Published {} file(s), {} byte(s)",
            self.copied.len(),
            self.bytes_copied()
        );

        if !self.failed.is_empty() {
            output.push_str(&format!("; {} failed:", self.failed.len()));
            for failure in &self.failed {
                output.push_str(&format!(
                    "\n  ✗ [{}] {} -> {}: {}",
                    failure.bundle,
                    failure.source.display(),
                    failure.destination.display(),
                    failure.error
                ));
            }
        }

        output
    }
}

/// A copy that a publish pass would perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub bundle: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Resolve every entry to its source and destination without touching the
/// filesystem
pub fn plan(bundles: &[Bundle], output_root: &Path) -> Vec<PlannedCopy> {
    bundles
        .iter()
        .flat_map(|bundle| {
            bundle.entries.iter().map(move |entry| PlannedCopy {
                bundle: bundle.name.clone(),
                source: bundle.source_path(entry),
                destination: entry.destination_path(output_root),
            })
        })
        .collect()
}

/// Copy every entry of every bundle into `output_root`
pub fn publish(bundles: &[Bundle], output_root: &Path) -> PublishReport {
    let mut report = PublishReport::default();

    for bundle in bundles {
        info!(
            bundle = %bundle.name,
            base = %bundle.base.display(),
            files = bundle.entries.len(),
            "Copying assets"
        );

        for entry in &bundle.entries {
            let source = bundle.source_path(entry);
            let destination = entry.destination_path(output_root);

            match copy_file(&source, &destination) {
                Ok(bytes) => {
                    debug!(
                        bundle = %bundle.name,
                        source = %source.display(),
                        destination = %destination.display(),
                        bytes,
                        "Copied"
                    );
                    report.copied.push(CopiedEntry {
                        bundle: bundle.name.clone(),
                        source,
                        destination,
                        bytes,
                    });
                }
                Err(e) => {
                    error!(
                        bundle = %bundle.name,
                        source = %source.display(),
                        error = %e,
                        "Failed to copy asset"
                    );
                    report.failed.push(FailedEntry {
                        bundle: bundle.name.clone(),
                        source,
                        destination,
                        error: e,
                    });
                }
            }
        }
    }

    info!(
        copied = report.copied.len(),
        failed = report.failed.len(),
        bytes = report.bytes_copied(),
        "Publish finished"
    );

    report
}

/// Copy one file, creating the destination's parent directories.
///
/// The bytes go to a temporary file next to the destination which is then
/// renamed over it, so readers see either the old file or the new one.
/// The source's permissions are carried over.
pub fn copy_file(source: &Path, destination: &Path) -> Result<u64, PublishError> {
    let source_error = |e: io::Error| PublishError::Source {
        path: source.to_path_buf(),
        source: e,
    };
    let write_error = |e: io::Error| PublishError::Write {
        path: destination.to_path_buf(),
        source: e,
    };

    let metadata = fs::metadata(source).map_err(source_error)?;
    if !metadata.is_file() {
        return Err(source_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let bytes = fs::read(source).map_err(source_error)?;

    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| PublishError::CreateDir {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(&bytes).map_err(write_error)?;
    temp.as_file()
        .set_permissions(metadata.permissions())
        .map_err(write_error)?;
    temp.persist(destination)
        .map_err(|e| write_error(e.error))?;

    Ok(bytes.len() as u64)
}
