//! Document store: vector index, chunk groups, stats, persistence.

mod debounce;
mod flat;
mod models;
#[allow(clippy::module_inception)]
mod store;

pub use debounce::Debouncer;
pub use flat::FlatIndex;
pub use models::{DocumentChunk, SearchHit, StoreStats};
pub use store::{IndexStore, DOCSTORE_FILE, INDEX_FILE, STATS_FILE};
