//! Configuration for Scout.
//!
//! A single [`Config`] is constructed once at startup and passed by
//! reference into each component. Components never read the environment
//! themselves.

mod settings;

pub use settings::{default_index_dir, Config};
