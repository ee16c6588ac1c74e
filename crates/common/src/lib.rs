//! Common utilities shared across Courier components
//!
//! Provides logging initialisation and the log output format selector used
//! by the CLI.

pub mod observability;

pub use observability::{init_tracing, LogFormat, ParseLogFormatError};
