//! File system watching and event coordination.
//!
//! This module provides:
//! - Ignore-pattern filtering for watched trees
//! - Event classification (add / change / unlink)
//! - Per-path in-flight deduplication
//! - Recursive directory watching with an initial background crawl

mod coordinator;
mod events;
mod ignore;
#[allow(clippy::module_inception)]
mod watcher;

pub use coordinator::{FlightGuard, ProcessingCoordinator};
pub use events::{classify, EventKind, FileEvent};
pub use ignore::IgnoreMatcher;
pub use watcher::{ChangeHandler, DirectoryWatcher, WatcherConfig};
