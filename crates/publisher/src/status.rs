//! Output status checking
//!
//! Compares each declared destination against its source by SHA-256
//! digest.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use courier_config::Bundle;
use sha2::{Digest, Sha256};

/// Status of an individual entry
#[derive(Debug, Clone)]
pub struct EntryStatus {
    /// Bundle the entry belongs to
    pub bundle: String,

    /// Resolved source path
    pub source: PathBuf,

    /// Resolved destination path
    pub destination: PathBuf,

    /// Status indicator
    pub status: Status,
}

/// Entry publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Destination matches the source byte for byte
    UpToDate,

    /// Destination exists but differs from the source
    Stale,

    /// Destination does not exist
    Missing,

    /// Source cannot be read
    SourceMissing,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::UpToDate => write!(f, "up to date"),
            Status::Stale => write!(f, "stale"),
            Status::Missing => write!(f, "missing"),
            Status::SourceMissing => write!(f, "source missing"),
        }
    }
}

/// Status of the whole output directory
#[derive(Debug)]
pub struct PublishStatus {
    /// Output root being checked
    pub output: PathBuf,

    /// Status of each entry, in manifest order
    pub entries: Vec<EntryStatus>,
}

impl PublishStatus {
    /// Check the status of every entry
    pub fn check(bundles: &[Bundle], output_root: &Path) -> Self {
        let mut entries = Vec::new();

        for bundle in bundles {
            for entry in &bundle.entries {
                let source = bundle.source_path(entry);
                let destination = entry.destination_path(output_root);
                let status = check_entry(&source, &destination);

                entries.push(EntryStatus {
                    bundle: bundle.name.clone(),
                    source,
                    destination,
                    status,
                });
            }
        }

        Self {
            output: output_root.to_path_buf(),
            entries,
        }
    }

    /// Check if every destination is up to date
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.status == Status::UpToDate)
    }

    /// Entries a publish pass would change or cannot serve
    pub fn pending(&self) -> Vec<&EntryStatus> {
        self.entries
            .iter()
            .filter(|e| e.status != Status::UpToDate)
            .collect()
    }

    /// Get count of each status type
    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for entry in &self.entries {
            match entry.status {
                Status::UpToDate => summary.up_to_date += 1,
                Status::Stale => summary.stale += 1,
                Status::Missing => summary.missing += 1,
                Status::SourceMissing => summary.source_missing += 1,
            }
        }
        summary.total = self.entries.len();
        summary
    }

    /// Format status for display
    pub fn display(&self) -> String {
        use std::fmt::Write;

        let mut output = String::new();

        let _ = writeln!(output, "Courier Publish Status");
        let _ = writeln!(output, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        let _ = writeln!(output, "Output path: {}", self.output.display());
        let _ = writeln!(output);

        let _ = writeln!(output, "{:<12} {:<40} {}", "Bundle", "Destination", "Status");
        let _ = writeln!(output, "{}", "─".repeat(70));

        for entry in &self.entries {
            let status_icon = match entry.status {
                Status::UpToDate => "✓",
                Status::Stale => "↑",
                Status::Missing => "✗",
                Status::SourceMissing => "!",
            };

            let _ = writeln!(
                output,
                "{:<12} {:<40} {} {}",
                entry.bundle,
                entry.destination.display(),
                status_icon,
                entry.status
            );
        }

        let summary = self.summary();
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Total: {} | Up to date: {} | Stale: {} | Missing: {} | Source missing: {}",
            summary.total,
            summary.up_to_date,
            summary.stale,
            summary.missing,
            summary.source_missing
        );

        output
    }
}

/// Summary counts
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub total: usize,
    pub up_to_date: usize,
    pub stale: usize,
    pub missing: usize,
    pub source_missing: usize,
}

fn check_entry(source: &Path, destination: &Path) -> Status {
    let Ok(source_digest) = digest(source) else {
        return Status::SourceMissing;
    };

    match digest(destination) {
        Ok(d) if d == source_digest => Status::UpToDate,
        Ok(_) => Status::Stale,
        Err(_) => Status::Missing,
    }
}

/// Hex-encoded SHA-256 of a file's contents
pub fn digest(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
