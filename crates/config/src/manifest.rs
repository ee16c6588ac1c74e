//! Manifest parsing
//!
//! Parses the `courier.toml` manifest that declares which files are
//! published and where they land in the output directory.
//!
//! ```toml
//! [publish]
//! output = "build"
//! cooldown_ms = 1000
//!
//! [[bundles]]
//! name = "css"
//! base = "assets/css"
//! listing = { prefix = "css", exclude = ["tailwind"] }
//!
//! [[bundles]]
//! name = "jquery"
//! base = "node_modules/jquery/dist"
//! files = [{ src = "jquery.min.js", dst = "js/jquery.min.js" }]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Bundle, FileEntry};
use crate::validate::{validate_manifest, ValidationResult};

/// Manifest file looked up in the working directory when none is given
pub const DEFAULT_MANIFEST_PATH: &str = "courier.toml";

/// Output root used when the manifest does not name one
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Watch cooldown used when the manifest does not set one
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Errors that can occur when loading or resolving the manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Manifest not found at: {0}")]
    NotFound(String),

    #[error("Bundle '{bundle}': failed to list directory {}: {source}", dir.display())]
    Listing {
        bundle: String,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid manifest:\n{0}")]
    Invalid(String),
}

/// Manifest file structure
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Output and watch settings
    #[serde(default)]
    pub publish: PublishSection,

    /// Bundles in publish order
    #[serde(default)]
    pub bundles: Vec<BundleSpec>,
}

/// `[publish]` section
#[derive(Debug, Clone, Deserialize)]
pub struct PublishSection {
    /// Directory all destinations resolve under
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Minimum time between honored change notifications per path
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

/// One `[[bundles]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSpec {
    pub name: String,

    /// Directory sources are relative to. Empty means the working directory.
    #[serde(default)]
    pub base: PathBuf,

    /// Explicitly listed files, published first
    #[serde(default)]
    pub files: Vec<FileSpec>,

    /// Publish every file directly inside `base`
    #[serde(default)]
    pub listing: Option<ListingSpec>,
}

/// Explicit file mapping
#[derive(Debug, Clone, Deserialize)]
pub struct FileSpec {
    pub src: PathBuf,

    /// Destination under the output root; absent or empty means `src`
    #[serde(default)]
    pub dst: Option<PathBuf>,
}

/// Directory listing settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingSpec {
    /// Destination directory for listed files; absent means the output root
    #[serde(default)]
    pub prefix: Option<PathBuf>,

    /// Skip files whose name contains any of these substrings
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            output: default_output(),
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

impl Default for Manifest {
    /// The built-in manifest used when no manifest file exists: the
    /// project's own stylesheets, scripts, images and fonts, plus jQuery
    /// from `node_modules`.
    fn default() -> Self {
        let listing = |name: &str, prefix: &str, exclude: &[&str]| BundleSpec {
            name: name.to_string(),
            base: PathBuf::from("assets").join(name),
            files: Vec::new(),
            listing: Some(ListingSpec {
                prefix: Some(PathBuf::from(prefix)),
                exclude: exclude.iter().map(|s| s.to_string()).collect(),
            }),
        };

        Self {
            publish: PublishSection::default(),
            bundles: vec![
                listing("css", "css", &["tailwind"]),
                listing("js", "js", &[]),
                listing("images", "images", &[]),
                listing("font", "font", &[]),
                BundleSpec {
                    name: "jquery".to_string(),
                    base: PathBuf::from("node_modules/jquery/dist"),
                    files: vec![FileSpec {
                        src: PathBuf::from("jquery.min.js"),
                        dst: Some(PathBuf::from("js/jquery.min.js")),
                    }],
                    listing: None,
                },
            ],
        }
    }
}

impl Manifest {
    /// Load a manifest from a path
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from string content
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Load the manifest for a run.
    ///
    /// An explicit path must exist. Without one, `courier.toml` in the
    /// working directory is used when present, and the built-in manifest
    /// otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ManifestError> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "Loading manifest");
            return Self::from_file(path);
        }

        let path = Path::new(DEFAULT_MANIFEST_PATH);
        if path.exists() {
            info!(path = %path.display(), "Loading manifest");
            Self::from_file(path)
        } else {
            info!(
                path = %path.display(),
                "No manifest found, using built-in configuration"
            );
            Ok(Self::default())
        }
    }

    /// Check the manifest for errors and warnings
    pub fn validate(&self) -> ValidationResult {
        validate_manifest(self)
    }

    /// Validate and fail on errors
    pub fn ensure_valid(&self) -> Result<(), ManifestError> {
        let result = self.validate();
        if result.is_valid() {
            Ok(())
        } else {
            Err(ManifestError::Invalid(result.error_summary()))
        }
    }

    /// Resolve every bundle into concrete file entries.
    ///
    /// Listings read their base directory here; a directory that cannot be
    /// listed fails the whole resolution with the bundle named.
    pub fn resolve(&self) -> Result<Vec<Bundle>, ManifestError> {
        self.bundles.iter().map(BundleSpec::resolve).collect()
    }
}

impl BundleSpec {
    /// Resolve this bundle into file entries: explicit files first, then
    /// the listing in file-name order.
    pub fn resolve(&self) -> Result<Bundle, ManifestError> {
        let mut bundle = Bundle::new(self.name.clone(), self.base.clone());

        for file in &self.files {
            bundle
                .entries
                .push(FileEntry::new(file.src.clone(), file.dst.clone()));
        }

        if let Some(listing) = &self.listing {
            let listed = self.list_files(listing)?;
            debug!(
                bundle = %self.name,
                base = %self.base.display(),
                count = listed.len(),
                "Listed bundle directory"
            );
            bundle.entries.extend(listed);
        }

        Ok(bundle)
    }

    fn list_files(&self, listing: &ListingSpec) -> Result<Vec<FileEntry>, ManifestError> {
        let dir = if self.base.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.base.as_path()
        };

        let listing_error = |source: io::Error| ManifestError::Listing {
            bundle: self.name.clone(),
            dir: dir.to_path_buf(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(listing_error)? {
            let entry = entry.map_err(listing_error)?;
            // Paths keep the raw name; the lossy form is only for matching
            let name = entry.file_name();
            let shown = name.to_string_lossy();

            if !entry.path().is_file() {
                debug!(bundle = %self.name, name = %shown, "Skipping non-file entry");
                continue;
            }
            if listing.exclude.iter().any(|pattern| shown.contains(pattern.as_str())) {
                debug!(bundle = %self.name, name = %shown, "Skipping excluded file");
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let source = PathBuf::from(name);
                let destination = match &listing.prefix {
                    Some(prefix) => prefix.join(&source),
                    None => source.clone(),
                };
                FileEntry::new(source, Some(destination))
            })
            .collect())
    }
}
