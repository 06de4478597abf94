//! Scout: an incremental semantic index over watched directory trees.
//!
//! Scout watches a set of root directories, keeps a chunked vector
//! index in sync with file creations, modifications, and deletions, and
//! answers similarity queries over the indexed content. Ignore patterns
//! filter the watched trees; per-path in-flight deduplication keeps
//! concurrent events for the same file from racing; persistence is
//! debounced so bursts of changes produce a single save.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
