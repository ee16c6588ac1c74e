//! Configuration for the Courier asset publisher
//!
//! Loading is a separate phase from publishing: [`Manifest`] is the
//! declarative form read from `courier.toml` (or the built-in default),
//! and [`Manifest::resolve`] turns it into the [`Bundle`] values the
//! publisher consumes. Tests can skip this crate's I/O entirely and build
//! bundles in memory.

pub mod manifest;
pub mod model;
pub mod settings;
pub mod validate;

pub use manifest::{
    BundleSpec, FileSpec, ListingSpec, Manifest, ManifestError, PublishSection,
    DEFAULT_COOLDOWN_MS, DEFAULT_MANIFEST_PATH, DEFAULT_OUTPUT_DIR,
};
pub use model::{Bundle, FileEntry};
pub use settings::{Overrides, Settings};
pub use validate::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
