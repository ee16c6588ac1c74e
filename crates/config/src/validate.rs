//! Manifest validation
//!
//! Collects every problem in a manifest instead of stopping at the first,
//! so the operator can fix them in one pass.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::manifest::{BundleSpec, Manifest};
use crate::model::stays_within;

/// What part of the manifest a finding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Bundle,
    Source,
    Destination,
    Publish,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Bundle => write!(f, "bundle"),
            ErrorCategory::Source => write!(f, "source"),
            ErrorCategory::Destination => write!(f, "destination"),
            ErrorCategory::Publish => write!(f, "publish"),
        }
    }
}

/// A problem that makes the manifest unusable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ValidationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.message)
    }
}

/// A suspicious but usable manifest setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub category: ErrorCategory,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Outcome of validating a manifest
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All error messages joined, one per line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validate a manifest without touching the filesystem
pub fn validate_manifest(manifest: &Manifest) -> ValidationResult {
    let mut result = ValidationResult::new();

    if manifest.publish.cooldown_ms == 0 {
        result.add_error(ValidationError::new(
            ErrorCategory::Publish,
            "cooldown_ms must be > 0",
        ));
    }

    if manifest.publish.output.as_os_str().is_empty() {
        result.add_error(ValidationError::new(
            ErrorCategory::Publish,
            "output directory must not be empty",
        ));
    }

    let mut seen = HashSet::new();
    for bundle in &manifest.bundles {
        if bundle.name.trim().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Bundle,
                format!("bundle with base {:?} has an empty name", bundle.base),
            ));
        } else if !seen.insert(bundle.name.as_str()) {
            result.add_error(ValidationError::new(
                ErrorCategory::Bundle,
                format!("duplicate bundle name '{}'", bundle.name),
            ));
        }

        validate_bundle(bundle, &mut result);
    }

    result
}

fn validate_bundle(bundle: &BundleSpec, result: &mut ValidationResult) {
    if bundle.files.is_empty() && bundle.listing.is_none() {
        result.add_warning(ValidationWarning::new(
            ErrorCategory::Bundle,
            format!("bundle '{}' declares no files and no listing", bundle.name),
        ));
    }

    for file in &bundle.files {
        if file.src.as_os_str().is_empty() {
            result.add_error(ValidationError::new(
                ErrorCategory::Source,
                format!("bundle '{}' has a file entry with an empty src", bundle.name),
            ));
            continue;
        }

        let destination = match &file.dst {
            Some(dst) if !dst.as_os_str().is_empty() => dst.as_path(),
            _ => file.src.as_path(),
        };
        check_destination(&bundle.name, destination, result);
    }

    if let Some(listing) = &bundle.listing {
        if let Some(prefix) = &listing.prefix {
            check_destination(&bundle.name, prefix, result);
        }
    }
}

fn check_destination(bundle: &str, destination: &Path, result: &mut ValidationResult) {
    if destination.is_absolute() || destination.has_root() {
        result.add_error(ValidationError::new(
            ErrorCategory::Destination,
            format!(
                "bundle '{}': destination {:?} must be relative to the output directory",
                bundle, destination
            ),
        ));
    } else if !stays_within(destination) {
        result.add_error(ValidationError::new(
            ErrorCategory::Destination,
            format!(
                "bundle '{}': destination {:?} escapes the output directory",
                bundle, destination
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Manifest {
        Manifest::from_str(content).unwrap()
    }

    #[test]
    fn test_default_manifest_is_valid() {
        let result = validate_manifest(&Manifest::default());
        assert!(result.is_valid(), "{}", result.error_summary());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_bundle_names() {
        let manifest = parse(
            r#"
[[bundles]]
name = "js"
base = "a"
files = [{ src = "a.js" }]

[[bundles]]
name = "js"
base = "b"
files = [{ src = "b.js" }]
"#,
        );

        let result = validate_manifest(&manifest);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].category, ErrorCategory::Bundle);
        assert!(result.errors[0].message.contains("duplicate"));
    }

    #[test]
    fn test_escaping_destination() {
        let manifest = parse(
            r#"
[[bundles]]
name = "js"
base = "assets"
files = [
    { src = "a.js", dst = "../outside.js" },
    { src = "b.js", dst = "/etc/b.js" },
    { src = "c.js", dst = "js/c.js" },
]
"#,
        );

        let result = validate_manifest(&manifest);
        assert_eq!(result.errors.len(), 2);
        assert!(result
            .errors
            .iter()
            .all(|e| e.category == ErrorCategory::Destination));
    }

    #[test]
    fn test_escaping_listing_prefix() {
        let manifest = parse(
            r#"
[[bundles]]
name = "css"
base = "assets/css"
listing = { prefix = "../css" }
"#,
        );

        let result = validate_manifest(&manifest);
        assert!(!result.is_valid());
    }

    #[test]
    fn test_empty_src_and_name() {
        let manifest = parse(
            r#"
[[bundles]]
name = " "
base = "assets"
files = [{ src = "" }]
"#,
        );

        let result = validate_manifest(&manifest);
        assert_eq!(result.errors.len(), 2);
        assert!(result.error_summary().contains("empty name"));
        assert!(result.error_summary().contains("empty src"));
    }

    #[test]
    fn test_zero_cooldown() {
        let manifest = parse(
            r#"
[publish]
cooldown_ms = 0
"#,
        );

        let result = validate_manifest(&manifest);
        assert!(!result.is_valid());
        assert_eq!(result.errors[0].category, ErrorCategory::Publish);
    }

    #[test]
    fn test_empty_bundle_warns() {
        let manifest = parse(
            r#"
[[bundles]]
name = "nothing"
base = "assets"
"#,
        );

        let result = validate_manifest(&manifest);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }
}
