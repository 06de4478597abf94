//! In-flight deduplication for per-path event handling.
//!
//! At most one handling runs per path at a time. The in-flight flag is
//! set synchronously before any suspension point and cleared by an RAII
//! guard, so it is released on success, error propagation, and panic
//! alike.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Tracks the set of paths currently being handled.
#[derive(Debug, Default)]
pub struct ProcessingCoordinator {
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl ProcessingCoordinator {
    /// Create a new coordinator.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a path in-flight.
    ///
    /// Returns `None` when the path is already being handled; the caller
    /// must drop the event in that case. The returned guard clears the
    /// flag when dropped.
    #[must_use]
    pub fn try_begin(self: &Arc<Self>, path: &Path) -> Option<FlightGuard> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(path.to_path_buf()) {
            return None;
        }

        Some(FlightGuard {
            coordinator: Arc::clone(self),
            path: path.to_path_buf(),
        })
    }

    /// Number of paths currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Whether a specific path is currently in flight.
    #[must_use]
    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.lock().contains(path)
    }

    /// Drop all in-flight markers. Used at shutdown.
    pub fn clear(&self) {
        self.in_flight.lock().clear();
    }
}

/// RAII marker for one path's in-flight handling.
#[derive(Debug)]
pub struct FlightGuard {
    coordinator: Arc<ProcessingCoordinator>,
    path: PathBuf,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.coordinator.in_flight.lock().remove(&self.path);
    }
}
