//! Directory watching built on notify-rs.
//!
//! Watches are armed on every root before the initial crawl begins; the
//! crawl then runs as a background task and synthesizes `Add` events
//! through the exact same handling path as live notifications, so
//! startup indexing and live updates share identical semantics.

#![allow(clippy::used_underscore_binding)]

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::coordinator::ProcessingCoordinator;
use super::events::{classify, EventKind, FileEvent};
use super::ignore::IgnoreMatcher;
use crate::error::WatcherError;
use crate::Result;

/// Debounce duration for raw notify events.
const EVENT_DEBOUNCE: Duration = Duration::from_millis(500);

/// The caller-supplied collaborator invoked for every qualifying event.
///
/// `ingest` runs the extraction/embedding pipeline for a changed file;
/// `remove` drops a vanished file from the index. Errors propagate back
/// through the coordinator's cleanup path and are logged by the caller.
pub trait ChangeHandler: Send + Sync + 'static {
    /// Handle a created or changed file.
    fn ingest(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;

    /// Handle a deleted file.
    fn remove(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Root directories to watch recursively.
    pub roots: Vec<PathBuf>,
    /// Debounce duration for raw events.
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            debounce: EVENT_DEBOUNCE,
        }
    }
}

/// Recursive watcher over a set of root directories.
pub struct DirectoryWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    event_rx: mpsc::Receiver<PathBuf>,
    roots: Vec<PathBuf>,
    matcher: Arc<IgnoreMatcher>,
    coordinator: Arc<ProcessingCoordinator>,
    tracked: Arc<Mutex<HashSet<PathBuf>>>,
    closed: bool,
}

impl DirectoryWatcher {
    /// Create a watcher and arm a recursive watch on every root.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or any root
    /// cannot be watched.
    pub fn new(config: &WatcherConfig, matcher: Arc<IgnoreMatcher>) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel(1024);

        let mut debouncer = new_debouncer(
            config.debounce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| match result {
                Ok(events) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::Any) {
                            let _ = event_tx.blocking_send(event.path);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Watch error");
                }
            },
        )
        .map_err(|e| WatcherError::WatchFailed {
            path: "init".to_string(),
            reason: e.to_string(),
        })?;

        for root in &config.roots {
            if !root.exists() {
                return Err(WatcherError::WatchFailed {
                    path: root.display().to_string(),
                    reason: "directory does not exist".to_string(),
                }
                .into());
            }

            debouncer
                .watcher()
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| WatcherError::WatchFailed {
                    path: root.display().to_string(),
                    reason: e.to_string(),
                })?;

            tracing::info!(path = %root.display(), "Watching directory");
        }

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
            roots: config.roots.clone(),
            matcher,
            coordinator: ProcessingCoordinator::new(),
            tracked: Arc::new(Mutex::new(HashSet::new())),
            closed: false,
        })
    }

    /// Receive the next raw event path.
    ///
    /// Returns `None` once the watcher has been closed.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        if self.closed {
            return None;
        }
        self.event_rx.recv().await
    }

    /// Classify a raw event path and hand it to the change handler.
    ///
    /// Ignored paths and directories produce no handling; an event for a
    /// path already in flight is silently dropped. Handling runs as its
    /// own task so different paths can interleave; handler errors are
    /// logged here, one level above the coordinator's cleanup.
    pub fn dispatch<H: ChangeHandler>(&self, handler: &Arc<H>, path: PathBuf) {
        if self.closed {
            return;
        }

        let event = {
            let tracked = self.tracked.lock();
            classify(&path, &self.matcher, &tracked)
        };
        let Some(event) = event else {
            return;
        };

        let coordinator = Arc::clone(&self.coordinator);
        let tracked = Arc::clone(&self.tracked);
        let handler = Arc::clone(handler);
        tokio::spawn(async move {
            let path = event.path.clone();
            if let Err(e) = handle_event(&coordinator, &tracked, handler.as_ref(), event).await {
                tracing::warn!(path = %path.display(), error = %e, "Event handling failed");
            }
        });
    }

    /// Crawl pre-existing files in every root as a background task.
    ///
    /// Each qualifying file is synthesized as an `Add` event and fed
    /// through the same coordinator path as live events. Returns the
    /// task handle so callers can await crawl completion if they choose.
    pub fn scan_existing<H: ChangeHandler>(&self, handler: Arc<H>) -> JoinHandle<()> {
        let roots = self.roots.clone();
        let matcher = Arc::clone(&self.matcher);
        let coordinator = Arc::clone(&self.coordinator);
        let tracked = Arc::clone(&self.tracked);

        tokio::spawn(async move {
            let files =
                match tokio::task::spawn_blocking(move || collect_existing(&roots, &matcher)).await
                {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::error!(error = %e, "Initial crawl task failed");
                        return;
                    }
                };

            tracing::info!(files = files.len(), "Initial crawl found files");

            for file in files {
                let event = FileEvent::new(file.clone(), EventKind::Add);
                if let Err(e) = handle_event(&coordinator, &tracked, handler.as_ref(), event).await
                {
                    tracing::warn!(path = %file.display(), error = %e, "Initial scan ingest failed");
                }
            }
        })
    }

    /// Close every active watch and clear in-flight and tracked sets.
    ///
    /// No further events are dispatched after close.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        for root in &self.roots {
            if let Err(e) = self._debouncer.watcher().unwatch(root) {
                tracing::debug!(path = %root.display(), error = %e, "Unwatch failed");
            }
        }

        self.coordinator.clear();
        self.tracked.lock().clear();
        self.closed = true;
        tracing::info!("Watcher closed");
    }

    /// The watched root directories.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The coordinator guarding per-path handling.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<ProcessingCoordinator> {
        &self.coordinator
    }

    /// Number of paths currently tracked as indexed.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }
}

/// Handle one classified event under the coordinator's in-flight gate.
///
/// The in-flight marker is taken before the first suspension point and
/// released by guard drop on every exit path, success or failure.
pub(crate) async fn handle_event<H: ChangeHandler>(
    coordinator: &Arc<ProcessingCoordinator>,
    tracked: &Mutex<HashSet<PathBuf>>,
    handler: &H,
    event: FileEvent,
) -> Result<()> {
    let Some(_guard) = coordinator.try_begin(&event.path) else {
        tracing::debug!(path = %event.path.display(), "Path in flight, dropping event");
        return Ok(());
    };

    match event.kind {
        EventKind::Unlink => {
            handler.remove(&event.path).await?;
            tracked.lock().remove(&event.path);
        }
        EventKind::Add | EventKind::Change => {
            handler.ingest(&event.path).await?;
            tracked.lock().insert(event.path.clone());
        }
    }

    Ok(())
}

/// List every non-ignored file under the given roots.
fn collect_existing(roots: &[PathBuf], matcher: &IgnoreMatcher) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in roots {
        let walker = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !matcher.should_ignore(e.path(), e.file_type().is_dir()));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Error walking directory");
                }
            }
        }
    }

    files
}
