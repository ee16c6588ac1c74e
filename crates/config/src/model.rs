//! Resolved manifest model
//!
//! These are the values the publisher works on. They are produced by
//! [`Manifest::resolve`](crate::Manifest::resolve) or built directly in
//! memory, and never change after construction.

use std::path::{Component, Path, PathBuf};

/// A named group of file entries sharing a base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Bundle name, used in logs and reports
    pub name: String,

    /// Directory the entry sources are relative to
    pub base: PathBuf,

    /// Entries in publish order
    pub entries: Vec<FileEntry>,
}

/// One source-to-destination file mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    /// Path relative to the bundle base
    pub source: PathBuf,

    /// Path relative to the output root
    pub destination: PathBuf,
}

impl Bundle {
    pub fn new(name: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entry, builder style
    pub fn with_entry(mut self, entry: FileEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Source path of `entry` with the bundle base applied
    pub fn source_path(&self, entry: &FileEntry) -> PathBuf {
        normalize(&self.base.join(&entry.source))
    }
}

impl FileEntry {
    /// Create an entry. A missing or empty destination publishes to the
    /// source path.
    pub fn new(source: impl Into<PathBuf>, destination: Option<PathBuf>) -> Self {
        let source = source.into();
        let destination = match destination {
            Some(dst) if !dst.as_os_str().is_empty() => dst,
            _ => source.clone(),
        };
        Self {
            source,
            destination,
        }
    }

    /// Destination path of this entry under `output_root`
    pub fn destination_path(&self, output_root: &Path) -> PathBuf {
        normalize(&output_root.join(&self.destination))
    }
}

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component where one exists. The filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Whether a relative path stays inside the directory it is joined onto
pub fn stays_within(path: &Path) -> bool {
    if path.is_absolute() || path.has_root() {
        return false;
    }
    !matches!(
        normalize(path).components().next(),
        Some(Component::ParentDir)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_destination_defaults_to_source() {
        let entry = FileEntry::new("ui.js", None);
        assert_eq!(entry.destination, PathBuf::from("ui.js"));
    }

    #[test]
    fn test_empty_destination_uses_source() {
        let entry = FileEntry::new("css/app.css", Some(PathBuf::new()));
        assert_eq!(entry.destination, PathBuf::from("css/app.css"));
    }

    #[test]
    fn test_resolved_paths() {
        let bundle = Bundle::new("js", "assets/js")
            .with_entry(FileEntry::new("ui.js", Some("js/ui.js".into())));
        let entry = &bundle.entries[0];

        assert_eq!(bundle.source_path(entry), PathBuf::from("assets/js/ui.js"));
        assert_eq!(
            entry.destination_path(Path::new("build")),
            PathBuf::from("build/js/ui.js")
        );
    }

    #[test]
    fn test_empty_base_resolves_to_source() {
        let bundle = Bundle::new("assets", "")
            .with_entry(FileEntry::new("assets/css/app.css", Some("css/app.css".into())));
        let entry = &bundle.entries[0];
        assert_eq!(
            bundle.source_path(entry),
            PathBuf::from("assets/css/app.css")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_stays_within() {
        assert!(stays_within(Path::new("js/ui.js")));
        assert!(stays_within(Path::new("js/../ui.js")));
        assert!(!stays_within(Path::new("../ui.js")));
        assert!(!stays_within(Path::new("js/../../ui.js")));
        assert!(!stays_within(Path::new("/etc/passwd")));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(parts in prop::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 0..8)) {
            let path: PathBuf = parts.iter().collect();
            let once = normalize(&path);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn normalized_paths_have_no_cur_dir(parts in prop::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 1..8)) {
            let path: PathBuf = parts.iter().collect();
            let normalized = normalize(&path);
            if normalized != Path::new(".") {
                prop_assert!(normalized.components().all(|c| c != Component::CurDir));
            }
        }
    }
}
