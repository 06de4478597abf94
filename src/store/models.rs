//! Data model for the index store.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One indexed slice of a source file's extracted text.
///
/// Immutable once produced; owned by the store after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Extracted text of this slice.
    pub content: String,
    /// Filesystem path the chunk was derived from.
    pub source: String,
    /// Lowercase file extension of the source.
    pub file_type: String,
    /// Modification time of the source when ingested.
    pub last_modified: DateTime<Utc>,
    /// Position of this chunk within the source.
    pub chunk_index: usize,
    /// Total chunks produced for the source.
    pub total_chunks: usize,
}

/// A search result: one chunk plus its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Aggregate index statistics, recomputed incrementally on every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub documents_by_type: HashMap<String, usize>,
    pub watched_directories: Vec<PathBuf>,
    pub files_being_processed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_serde_roundtrip() {
        let chunk = DocumentChunk {
            content: "hello".to_string(),
            source: "/a/x.txt".to_string(),
            file_type: "txt".to_string(),
            last_modified: Utc::now(),
            chunk_index: 0,
            total_chunks: 1,
        };

        let json = serde_json::to_string(&chunk).unwrap();
        let back: DocumentChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(chunk, back);
    }

    #[test]
    fn test_stats_default_is_empty() {
        let stats = StoreStats::default();
        assert_eq!(stats.total_documents, 0);
        assert!(stats.documents_by_type.is_empty());
        assert_eq!(stats.files_being_processed, 0);
    }
}
