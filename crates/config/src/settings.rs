//! Runtime settings
//!
//! The manifest's `[publish]` section with command-line and environment
//! overrides applied on top.

use std::path::PathBuf;
use std::time::Duration;

use crate::manifest::Manifest;

/// Effective settings for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Output root all destinations resolve under
    pub output: PathBuf,
    /// Watch cooldown window per path
    pub cooldown: Duration,
}

/// Values that take precedence over the manifest
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub cooldown_ms: Option<u64>,
}

impl Settings {
    /// Build settings from a manifest and overrides
    pub fn resolve(manifest: &Manifest, overrides: &Overrides) -> Self {
        let output = overrides
            .output
            .clone()
            .unwrap_or_else(|| manifest.publish.output.clone());
        let cooldown_ms = overrides
            .cooldown_ms
            .unwrap_or(manifest.publish.cooldown_ms);

        Self {
            output,
            cooldown: Duration::from_millis(cooldown_ms),
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.output.as_os_str().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }

        if self.cooldown.is_zero() {
            return Err("Cooldown must be > 0".to_string());
        }

        Ok(())
    }
}
