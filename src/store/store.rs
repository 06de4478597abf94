//! Document lifecycle and debounced persistence.
//!
//! The store owns the per-source chunk groups and the backing vector
//! index. Replacement is remove-then-add per source; removal rebuilds
//! the backing index from the remaining chunks since the flat index has
//! no selective delete. Every mutation re-arms a single delayed save.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::debounce::Debouncer;
use super::flat::FlatIndex;
use super::models::{DocumentChunk, SearchHit, StoreStats};
use crate::error::{PipelineError, StoreError};
use crate::pipeline::EmbeddingProvider;
use crate::Result;

/// Native serialization of the backing index.
pub const INDEX_FILE: &str = "index.json";
/// Serialized per-source chunk groups.
pub const DOCSTORE_FILE: &str = "docstore.json";
/// Serialized aggregate statistics.
pub const STATS_FILE: &str = "stats.json";

/// Score reported by [`IndexStore::get_all_documents`].
const SENTINEL_SCORE: f32 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedChunk {
    id: u64,
    #[serde(flatten)]
    stored: StoredChunk,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSource {
    source: String,
    chunks: Vec<PersistedChunk>,
}

/// On-disk shape of the per-source document map.
#[derive(Debug, Serialize, Deserialize)]
struct DocStoreFile {
    next_id: u64,
    sources: Vec<PersistedSource>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Backing index; `None` until the first add initializes it.
    index: Option<FlatIndex>,
    chunks: HashMap<u64, StoredChunk>,
    /// Chunk ids per source path. At most one group per source.
    groups: HashMap<String, Vec<u64>>,
    /// Source insertion order, for `get_all_documents`.
    order: Vec<String>,
    next_id: u64,
    total_documents: usize,
    documents_by_type: HashMap<String, usize>,
    /// Paths currently mid-extraction, reported in stats.
    processing: HashSet<PathBuf>,
}

impl StoreState {
    /// Rebuild the backing index from remaining chunks, in group order.
    fn rebuild_index(&mut self) {
        if self.index.is_none() {
            return;
        }

        let mut index = FlatIndex::new();
        for source in &self.order {
            if let Some(ids) = self.groups.get(source) {
                for id in ids {
                    if let Some(stored) = self.chunks.get(id) {
                        index.add(*id, stored.embedding.clone());
                    }
                }
            }
        }
        self.index = Some(index);
    }

    fn to_docstore(&self) -> DocStoreFile {
        let sources = self
            .order
            .iter()
            .map(|source| PersistedSource {
                source: source.clone(),
                chunks: self
                    .groups
                    .get(source)
                    .into_iter()
                    .flatten()
                    .filter_map(|id| {
                        self.chunks.get(id).map(|stored| PersistedChunk {
                            id: *id,
                            stored: stored.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();

        DocStoreFile {
            next_id: self.next_id,
            sources,
        }
    }

    fn from_docstore(doc: DocStoreFile, index: FlatIndex) -> Self {
        let mut state = Self {
            // An empty persisted store stays uninitialized.
            index: if doc.sources.is_empty() && index.is_empty() {
                None
            } else {
                Some(index)
            },
            next_id: doc.next_id,
            ..Self::default()
        };

        for source in doc.sources {
            state.order.push(source.source.clone());
            let mut ids = Vec::with_capacity(source.chunks.len());
            for persisted in source.chunks {
                state.total_documents += 1;
                *state
                    .documents_by_type
                    .entry(persisted.stored.chunk.file_type.clone())
                    .or_insert(0) += 1;
                ids.push(persisted.id);
                state.chunks.insert(persisted.id, persisted.stored);
            }
            state.groups.insert(source.source, ids);
        }

        state
    }
}

/// Searchable index of document chunks keyed by source path.
pub struct IndexStore {
    state: Arc<Mutex<StoreState>>,
    embedder: Arc<dyn EmbeddingProvider>,
    persist: Debouncer,
    persist_dir: PathBuf,
    watched_dirs: Vec<PathBuf>,
}

impl IndexStore {
    /// Create an empty store.
    ///
    /// Mutations schedule a save into `persist_dir` after `save_delay`.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        persist_dir: impl Into<PathBuf>,
        watched_dirs: Vec<PathBuf>,
        save_delay: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            embedder,
            persist: Debouncer::new(save_delay),
            persist_dir: persist_dir.into(),
            watched_dirs,
        }
    }

    /// Insert chunks into the backing index and the per-source map.
    ///
    /// The first call initializes the backing index; later calls append.
    /// Empty input is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding the chunk contents fails.
    pub fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts)?;

        {
            let mut state = self.state.lock();

            if state.index.is_none() {
                tracing::info!("Initializing backing index");
                state.index = Some(FlatIndex::new());
            }

            for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
                let id = state.next_id;
                state.next_id += 1;

                if let Some(index) = state.index.as_mut() {
                    index.add(id, embedding.clone());
                }

                if !state.groups.contains_key(&chunk.source) {
                    state.order.push(chunk.source.clone());
                }
                state
                    .groups
                    .entry(chunk.source.clone())
                    .or_default()
                    .push(id);

                state.total_documents += 1;
                *state
                    .documents_by_type
                    .entry(chunk.file_type.clone())
                    .or_insert(0) += 1;

                state.chunks.insert(id, StoredChunk { chunk, embedding });
            }
        }

        self.arm_persist();
        Ok(())
    }

    /// Remove every chunk indexed for a source path.
    ///
    /// Unknown sources are a no-op. Rebuilds the backing index from the
    /// remaining chunks, which is O(total remaining documents). Returns
    /// the number of chunks removed.
    pub fn remove_documents_by_source(&self, source: &str) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let Some(ids) = state.groups.remove(source) else {
                return 0;
            };
            state.order.retain(|s| s != source);

            for id in &ids {
                if let Some(stored) = state.chunks.remove(id) {
                    state.total_documents = state.total_documents.saturating_sub(1);
                    let file_type = stored.chunk.file_type;
                    if let Some(count) = state.documents_by_type.get_mut(&file_type) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            state.documents_by_type.remove(&file_type);
                        }
                    }
                }
            }

            state.rebuild_index();
            ids.len()
        };

        tracing::debug!(source, removed, "Removed documents for source");
        self.arm_persist();
        removed
    }

    /// Replace each incoming source's chunks with the new set.
    ///
    /// Chunks are grouped by source; each distinct source is removed and
    /// re-added, never partially merged. Empty input is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails.
    pub fn update_documents(&self, chunks: Vec<DocumentChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut order: Vec<String> = Vec::new();
        let mut by_source: HashMap<String, Vec<DocumentChunk>> = HashMap::new();
        for chunk in chunks {
            if !by_source.contains_key(&chunk.source) {
                order.push(chunk.source.clone());
            }
            by_source.entry(chunk.source.clone()).or_default().push(chunk);
        }

        for source in order {
            let group = by_source.remove(&source).unwrap_or_default();
            self.remove_documents_by_source(&source);
            self.add_documents(group)?;
        }

        Ok(())
    }

    /// Search for chunks similar to the query text.
    ///
    /// Results follow the backing index's own ordering, best first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotInitialized`] when no documents have
    /// ever been added, or an embedding error for the query.
    pub fn similarity_search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if self.state.lock().index.is_none() {
            return Err(StoreError::NotInitialized.into());
        }

        let embedding = self
            .embedder
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Embedding("empty embedding batch".to_string()))?;

        let state = self.state.lock();
        let Some(index) = state.index.as_ref() else {
            return Err(StoreError::NotInitialized.into());
        };

        let hits = index
            .search(&embedding, limit)
            .into_iter()
            .filter_map(|(id, score)| {
                state.chunks.get(&id).map(|stored| SearchHit {
                    chunk: stored.chunk.clone(),
                    score,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Return up to `limit` chunks in source insertion order, each with
    /// a constant sentinel score. Intended for metadata/date filtering
    /// when no semantic query is supplied.
    #[must_use]
    pub fn get_all_documents(&self, limit: usize) -> Vec<SearchHit> {
        let state = self.state.lock();
        let mut hits = Vec::new();

        'outer: for source in &state.order {
            if let Some(ids) = state.groups.get(source) {
                for id in ids {
                    if hits.len() >= limit {
                        break 'outer;
                    }
                    if let Some(stored) = state.chunks.get(id) {
                        hits.push(SearchHit {
                            chunk: stored.chunk.clone(),
                            score: SENTINEL_SCORE,
                        });
                    }
                }
            }
        }

        hits
    }

    /// Current aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let state = self.state.lock();
        StoreStats {
            total_documents: state.total_documents,
            documents_by_type: state.documents_by_type.clone(),
            watched_directories: self.watched_dirs.clone(),
            files_being_processed: state.processing.len(),
        }
    }

    /// Mark a path as mid-extraction for stats reporting.
    pub fn increment_processing(&self, path: &Path) {
        self.state.lock().processing.insert(path.to_path_buf());
    }

    /// Clear a path's mid-extraction marker.
    pub fn decrement_processing(&self, path: &Path) {
        self.state.lock().processing.remove(path);
    }

    /// Persist the backing index, document map, and stats into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any write fails.
    pub fn save(&self, dir: &Path) -> Result<()> {
        persist_snapshot(&self.state, dir, &self.watched_dirs)
    }

    /// Restore state previously written by [`IndexStore::save`].
    ///
    /// Failure surfaces to the caller, which decides whether starting
    /// empty is acceptable.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed.
    pub fn load(&self, dir: &Path) -> Result<()> {
        let index = FlatIndex::load(&dir.join(INDEX_FILE))?;

        let doc_path = dir.join(DOCSTORE_FILE);
        let raw = std::fs::read_to_string(&doc_path)
            .map_err(|e| StoreError::Persistence(format!("read '{}': {e}", doc_path.display())))?;
        let doc: DocStoreFile =
            serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut state = self.state.lock();
        let processing = std::mem::take(&mut state.processing);
        *state = StoreState::from_docstore(doc, index);
        state.processing = processing;

        tracing::info!(
            documents = state.total_documents,
            sources = state.order.len(),
            "Loaded persisted index"
        );
        Ok(())
    }

    /// (Re)arm the debounced save; a newer mutation supersedes any
    /// previously scheduled one.
    fn arm_persist(&self) {
        let state = Arc::clone(&self.state);
        let dir = self.persist_dir.clone();
        let watched = self.watched_dirs.clone();

        self.persist.arm(async move {
            if let Err(e) = persist_snapshot(&state, &dir, &watched) {
                tracing::warn!(error = %e, dir = %dir.display(), "Scheduled index save failed");
            } else {
                tracing::debug!(dir = %dir.display(), "Index persisted");
            }
        });
    }
}

/// Write the current state as a unit: index, document map, stats.
fn persist_snapshot(
    state: &Mutex<StoreState>,
    dir: &Path,
    watched_dirs: &[PathBuf],
) -> Result<()> {
    let (index_snapshot, doc_json, stats_json) = {
        let state = state.lock();

        let index_snapshot = state.index.clone().unwrap_or_default();
        let doc_json = serde_json::to_string(&state.to_docstore())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let stats = StoreStats {
            total_documents: state.total_documents,
            documents_by_type: state.documents_by_type.clone(),
            watched_directories: watched_dirs.to_vec(),
            files_being_processed: state.processing.len(),
        };
        let stats_json = serde_json::to_string_pretty(&stats)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        (index_snapshot, doc_json, stats_json)
    };

    std::fs::create_dir_all(dir)
        .map_err(|e| StoreError::Persistence(format!("create '{}': {e}", dir.display())))?;

    index_snapshot.save(&dir.join(INDEX_FILE))?;

    let write = |name: &str, raw: &str| -> Result<()> {
        let path = dir.join(name);
        std::fs::write(&path, raw)
            .map_err(|e| StoreError::Persistence(format!("write '{}': {e}", path.display())))?;
        Ok(())
    };
    write(DOCSTORE_FILE, &doc_json)?;
    write(STATS_FILE, &stats_json)?;

    Ok(())
}
