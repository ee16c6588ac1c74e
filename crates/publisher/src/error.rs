//! Publisher error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while publishing or watching a file
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Source file {} is missing or unreadable: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create destination directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to initialise file watcher: {0}")]
    WatcherInit(#[source] notify::Error),

    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
