//! Configuration settings and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Default delay before a mutation burst is persisted.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_secs(5);

/// Shape of the optional watch configuration file.
#[derive(Debug, Deserialize)]
struct WatchConfigFile {
    #[serde(rename = "watchList")]
    watch_list: Vec<PathBuf>,
}

/// Main configuration for Scout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories to watch (comma-separated form).
    pub watch_dirs: Vec<PathBuf>,

    /// Optional JSON watch configuration file; wins over `watch_dirs`.
    pub watch_config: Option<PathBuf>,

    /// Chunk size in characters.
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,

    /// Optional ignore-pattern file.
    pub ignore_file: Option<PathBuf>,

    /// Append-only ingestion log path.
    pub ingest_log: PathBuf,

    /// Directory holding the persisted index.
    pub index_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Delay before a mutation burst is persisted.
    pub save_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            watch_config: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            ignore_file: None,
            ingest_log: PathBuf::from("./data/ingestion.log"),
            index_dir: default_index_dir(),
            log_level: "info".to_string(),
            save_delay: DEFAULT_SAVE_DELAY,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size cannot be 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Resolve the directories to watch.
    ///
    /// A watch configuration file takes precedence over the comma-separated
    /// directory list when both are supplied.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no watch directories are
    /// configured, when the watch configuration file cannot be read or
    /// parsed, or when its list is empty. These abort startup.
    pub fn resolved_watch_dirs(&self) -> Result<Vec<PathBuf>> {
        if let Some(ref path) = self.watch_config {
            return load_watch_config(path);
        }

        if self.watch_dirs.is_empty() {
            return Err(Error::config(
                "no watch directories configured (use --watch or --watch-config)",
            ));
        }

        Ok(self.watch_dirs.clone())
    }
}

/// Parse a watch configuration file of the form `{"watchList": [...]}`.
fn load_watch_config(path: &Path) -> Result<Vec<PathBuf>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "cannot read watch config '{}': {e}",
            path.display()
        ))
    })?;

    let parsed: WatchConfigFile = serde_json::from_str(&raw).map_err(|e| {
        Error::config(format!(
            "malformed watch config '{}': {e}",
            path.display()
        ))
    })?;

    if parsed.watch_list.is_empty() {
        return Err(Error::config(format!(
            "watch config '{}' has an empty watchList",
            path.display()
        )));
    }

    Ok(parsed.watch_list)
}

/// Default directory for the persisted index.
///
/// Lives under the user's home directory when one is known, otherwise under
/// the local data directory.
#[must_use]
pub fn default_index_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from("./data/index"),
        |home| PathBuf::from(home).join(".scout").join("index"),
    )
}
