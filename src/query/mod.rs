//! Query surface over the index store: semantic search with optional
//! folder scoping and date-range filtering.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::store::{IndexStore, SearchHit, StoreStats};
use crate::Result;

/// Over-fetch factor applied when a post-search filter will discard hits.
const FILTER_OVERFETCH: usize = 4;

/// Read-side facade over the store.
pub struct QueryEngine {
    store: Arc<IndexStore>,
}

impl QueryEngine {
    /// Create a query engine over the given store.
    #[must_use]
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// Semantic search, optionally scoped to sources under `folder`.
    ///
    /// Folder scoping is a path-prefix match on the chunk's source path.
    /// The store is over-fetched when a folder filter is active so that
    /// filtering still yields up to `limit` hits.
    ///
    /// # Errors
    ///
    /// Returns an error when the index is uninitialized or the query
    /// cannot be embedded.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        folder: Option<&Path>,
    ) -> Result<Vec<SearchHit>> {
        let Some(folder) = folder else {
            return self.store.similarity_search(query, limit);
        };

        let fetch = limit.saturating_mul(FILTER_OVERFETCH);
        let mut hits = self.store.similarity_search(query, fetch)?;
        hits.retain(|h| Path::new(&h.chunk.source).starts_with(folder));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Filter chunks by modification-time range, optionally ranked by a
    /// semantic query. Without a query, results come back in source
    /// insertion order with a sentinel score.
    ///
    /// # Errors
    ///
    /// Returns an error when a query is supplied and the index is
    /// uninitialized or the query cannot be embedded.
    pub fn search_by_date(
        &self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = match query {
            Some(query) => self
                .store
                .similarity_search(query, limit.saturating_mul(FILTER_OVERFETCH))?,
            None => self.store.get_all_documents(usize::MAX),
        };

        hits.retain(|h| {
            after.map_or(true, |a| h.chunk.last_modified >= a)
                && before.map_or(true, |b| h.chunk.last_modified <= b)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Current aggregate index statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::HashEmbedder;
    use crate::store::DocumentChunk;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_engine() -> (TempDir, Arc<IndexStore>, QueryEngine) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(IndexStore::new(
            Arc::new(HashEmbedder::with_dimension(32)),
            tmp.path().join("index"),
            Vec::new(),
            Duration::from_secs(600),
        ));
        let engine = QueryEngine::new(Arc::clone(&store));
        (tmp, store, engine)
    }

    fn chunk(source: &str, content: &str, modified: DateTime<Utc>) -> DocumentChunk {
        DocumentChunk {
            content: content.to_string(),
            source: source.to_string(),
            file_type: "txt".to_string(),
            last_modified: modified,
            chunk_index: 0,
            total_chunks: 1,
        }
    }

    #[tokio::test]
    async fn test_search_unscoped() {
        let (_tmp, store, engine) = test_engine();
        let now = Utc::now();
        store
            .add_documents(vec![
                chunk("/docs/a.txt", "alpha bravo", now),
                chunk("/docs/b.txt", "zulu yankee", now),
            ])
            .unwrap();

        let hits = engine.search("alpha", 1, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/docs/a.txt");
    }

    #[tokio::test]
    async fn test_search_scoped_to_folder() {
        let (_tmp, store, engine) = test_engine();
        let now = Utc::now();
        store
            .add_documents(vec![
                chunk("/docs/a.txt", "alpha bravo", now),
                chunk("/other/b.txt", "alpha charlie", now),
            ])
            .unwrap();

        let hits = engine.search("alpha", 10, Some(Path::new("/other"))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/other/b.txt");
    }

    #[tokio::test]
    async fn test_folder_prefix_is_component_wise() {
        let (_tmp, store, engine) = test_engine();
        let now = Utc::now();
        store
            .add_documents(vec![
                chunk("/docs/a.txt", "alpha", now),
                chunk("/docs-archive/b.txt", "alpha", now),
            ])
            .unwrap();

        // "/docs" must not match "/docs-archive".
        let hits = engine.search("alpha", 10, Some(Path::new("/docs"))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/docs/a.txt");
    }

    #[tokio::test]
    async fn test_search_uninitialized_fails() {
        let (_tmp, _store, engine) = test_engine();
        assert!(engine.search("anything", 5, None).is_err());
    }

    #[tokio::test]
    async fn test_date_filter_without_query() {
        let (_tmp, store, engine) = test_engine();
        let now = Utc::now();
        let old = now - ChronoDuration::days(30);
        store
            .add_documents(vec![
                chunk("/a.txt", "recent", now),
                chunk("/b.txt", "ancient", old),
            ])
            .unwrap();

        let hits = engine
            .search_by_date(Some(now - ChronoDuration::days(7)), None, None, 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/a.txt");

        let hits = engine
            .search_by_date(None, Some(now - ChronoDuration::days(7)), None, 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/b.txt");
    }

    #[tokio::test]
    async fn test_date_filter_with_query_ranks_semantically() {
        let (_tmp, store, engine) = test_engine();
        let now = Utc::now();
        store
            .add_documents(vec![
                chunk("/a.txt", "alpha bravo", now),
                chunk("/b.txt", "alpha charlie", now - ChronoDuration::days(30)),
            ])
            .unwrap();

        let hits = engine
            .search_by_date(
                Some(now - ChronoDuration::days(7)),
                None,
                Some("alpha"),
                10,
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.source, "/a.txt");
    }

    #[tokio::test]
    async fn test_stats_passthrough() {
        let (_tmp, store, engine) = test_engine();
        store
            .add_documents(vec![chunk("/a.txt", "content", Utc::now())])
            .unwrap();
        assert_eq!(engine.stats().total_documents, 1);
    }
}
