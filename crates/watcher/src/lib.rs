//! File system watching and debounce scheduling for mdpdf
//!
//! This crate provides:
//! - Per-path debounce with last-write-wins rearming
//! - A watch session that filters raw filesystem events down to
//!   qualifying Markdown changes
//! - Clean, signal-driven shutdown of both

pub mod debounce;
pub mod watch;

use std::path::PathBuf;
use thiserror::Error;

// Re-exports
pub use debounce::DebounceScheduler;
pub use watch::{WatchSession, WatchState, WatchTarget};

/// Errors fatal to a watch session
///
/// Per-path conversion failures are not represented here: the scheduler
/// recovers them locally and the session keeps running.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Watch root is missing or not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The underlying event source failed
    #[error("event source error: {0}")]
    EventSource(#[from] notify::Error),
}
