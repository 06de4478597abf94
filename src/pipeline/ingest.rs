//! File ingestion: read, extract, split, embed, store.
//!
//! `FileIngestor` is the change handler wired into the watcher. Every
//! attempt that touches the index is recorded in a line-oriented
//! ingestion log alongside structured tracing output.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::processor::ProcessorSet;
use super::splitter::TextSplitter;
use crate::error::PipelineError;
use crate::store::{DocumentChunk, IndexStore};
use crate::watcher::ChangeHandler;
use crate::Result;

/// Append-only, human-readable record of index mutations.
///
/// One line per attempt:
/// `<RFC3339 UTC> | <ADD|REMOVE> | <SUCCESS|FAILED> | <path>[ | <reason>]`
pub struct IngestLog {
    path: PathBuf,
}

impl IngestLog {
    /// Create a log writing to the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one attempt line. Log I/O failures are reported through
    /// tracing and never fail the ingestion itself.
    pub fn record(&self, action: &str, success: bool, subject: &Path, reason: Option<&str>) {
        let status = if success { "SUCCESS" } else { "FAILED" };
        let mut line = format!(
            "{} | {} | {} | {}",
            Utc::now().to_rfc3339(),
            action,
            status,
            subject.display()
        );
        if let Some(reason) = reason {
            line.push_str(" | ");
            line.push_str(reason);
        }
        line.push('\n');

        if let Err(e) = self.append(&line) {
            tracing::warn!(path = %self.path.display(), error = %e, "Ingestion log write failed");
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

/// Outcome of one ingest attempt.
enum IngestOutcome {
    /// The source's chunks were replaced in the index.
    Indexed(usize),
    /// Content hash matched the previous ingest; index untouched.
    Unchanged,
}

/// The change handler behind the watcher: turns file events into index
/// mutations.
pub struct FileIngestor {
    store: Arc<IndexStore>,
    processors: ProcessorSet,
    splitter: TextSplitter,
    log: IngestLog,
    /// Content hash of the last successful ingest per path, used to
    /// short-circuit events that did not change file content.
    seen: Mutex<HashMap<PathBuf, String>>,
}

impl FileIngestor {
    /// Create an ingestor writing into the given store.
    #[must_use]
    pub fn new(
        store: Arc<IndexStore>,
        processors: ProcessorSet,
        splitter: TextSplitter,
        log: IngestLog,
    ) -> Self {
        Self {
            store,
            processors,
            splitter,
            log,
            seen: Mutex::new(HashMap::new()),
        }
    }

    async fn ingest_inner(&self, path: &Path) -> Result<IngestOutcome> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return Err(PipelineError::extraction(
                    path.display().to_string(),
                    "not valid UTF-8",
                )
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        let content_hash = blake3::hash(raw.as_bytes()).to_hex().to_string();
        if self.seen.lock().get(path) == Some(&content_hash) {
            tracing::debug!(path = %path.display(), "Content unchanged, skipping");
            return Ok(IngestOutcome::Unchanged);
        }

        let text = self.processors.process(path, &raw)?;
        let pieces = self.splitter.split(&text);

        let source = path.display().to_string();
        if pieces.is_empty() {
            // Nothing extractable; clear any stale chunks for this path.
            self.store.remove_documents_by_source(&source);
            self.seen.lock().insert(path.to_path_buf(), content_hash);
            return Ok(IngestOutcome::Indexed(0));
        }

        let last_modified = tokio::fs::metadata(path)
            .await?
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let total = pieces.len();
        let chunks: Vec<DocumentChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| DocumentChunk {
                content,
                source: source.clone(),
                file_type: file_type.clone(),
                last_modified,
                chunk_index: i,
                total_chunks: total,
            })
            .collect();

        self.store.update_documents(chunks)?;
        self.seen.lock().insert(path.to_path_buf(), content_hash);

        Ok(IngestOutcome::Indexed(total))
    }
}

impl ChangeHandler for FileIngestor {
    fn ingest(&self, path: &Path) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            self.store.increment_processing(path);
            let result = self.ingest_inner(path).await;
            self.store.decrement_processing(path);

            match result {
                Ok(IngestOutcome::Indexed(chunks)) => {
                    tracing::info!(path = %path.display(), chunks, "Indexed file");
                    self.log.record("ADD", true, path, None);
                    Ok(())
                }
                Ok(IngestOutcome::Unchanged) => Ok(()),
                Err(e) => {
                    self.log.record("ADD", false, path, Some(&e.to_string()));
                    Err(e)
                }
            }
        }
    }

    fn remove(&self, path: &Path) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            let source = path.display().to_string();
            let removed = self.store.remove_documents_by_source(&source);
            self.seen.lock().remove(path);

            tracing::info!(path = %path.display(), removed, "Removed file from index");
            self.log.record("REMOVE", true, path, None);
            Ok(())
        }
    }
}
