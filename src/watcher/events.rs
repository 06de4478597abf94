//! File system event types and classification.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::ignore::IgnoreMatcher;

/// Logical kind of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A file not previously indexed appeared.
    Add,
    /// An already-indexed file changed.
    Change,
    /// A file disappeared.
    Unlink,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Change => write!(f, "change"),
            Self::Unlink => write!(f, "unlink"),
        }
    }
}

/// A classified filesystem event, consumed exactly once by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl FileEvent {
    /// Create an event.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Derive the logical event for a raw change notification.
///
/// A missing path is an unlink. An existing path is checked against the
/// ignore matcher and dropped when it matches or is a directory. A file
/// classifies as `Add` only when it is not in the tracked set; a
/// notification for a still-present, already-indexed path (including an
/// in-place rename) classifies as `Change`.
#[must_use]
pub fn classify(
    path: &Path,
    matcher: &IgnoreMatcher,
    tracked: &HashSet<PathBuf>,
) -> Option<FileEvent> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Some(FileEvent::new(path, EventKind::Unlink));
    };

    if matcher.should_ignore(path, meta.is_dir()) {
        return None;
    }

    if !meta.is_file() {
        return None;
    }

    let kind = if tracked.contains(path) {
        EventKind::Change
    } else {
        EventKind::Add
    };

    Some(FileEvent::new(path, kind))
}
