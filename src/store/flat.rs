//! Flat backing index for embedding vectors.
//!
//! Append-only id/vector table with brute-force cosine search. There is
//! no selective delete; the store rebuilds the index from its remaining
//! chunks when a source is removed. Serializes as a single JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    id: u64,
    vector: Vec<f32>,
}

/// Brute-force cosine similarity index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatIndex {
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vector under the given id.
    pub fn add(&mut self, id: u64, vector: Vec<f32>) {
        self.entries.push(IndexEntry { id, vector });
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no vectors are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `limit` ids ordered by cosine similarity, best first.
    #[must_use]
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<(u64, f32)> {
        let mut scored: Vec<(u64, f32)> = self
            .entries
            .iter()
            .map(|e| (e.id, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Serialize the index to its native on-disk form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(path, raw)
            .map_err(|e| StoreError::Persistence(format!("write '{}': {e}", path.display())))?;
        Ok(())
    }

    /// Load an index from its native on-disk form.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Persistence(format!("read '{}': {e}", path.display())))?;
        let index = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(index)
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero norms.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
