//! Courier asset publisher
//!
//! Mirrors static web assets into a build directory and keeps them in sync
//! while a watch is running.
//!
//! - [`publish`]: copy every manifest entry once, continuing past failures
//! - [`watch`]: re-copy entries when their sources change, with a
//!   per-path cooldown
//! - [`PublishStatus`]: compare the output directory with the sources
//!
//! Bundles come from [`courier_config`]; they can be loaded from a
//! manifest or built in memory.

pub mod cli;
mod error;
pub mod publish;
pub mod status;
pub mod watch;

pub use error::PublishError;
pub use publish::{copy_file, plan, publish, CopiedEntry, FailedEntry, PlannedCopy, PublishReport};
pub use status::{digest, EntryStatus, PublishStatus, Status, StatusSummary};
pub use watch::{watch, watch_events, WatchEvent, WatchHandle, WatchLoop, WatchTarget};

pub use courier_config::{Bundle, FileEntry};
