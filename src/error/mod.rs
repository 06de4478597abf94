//! Error types and Result aliases for Scout.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using Scout's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Scout operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Index store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Extraction/embedding pipeline error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Index store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Search was attempted before any documents were added.
    #[error("index not initialized: no documents have been added")]
    NotInitialized,

    /// Saving or loading persisted state failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Serializing or deserializing index state failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },
}

/// Extraction/embedding pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No content processor accepts the file.
    #[error("no processor for file '{path}'")]
    NoProcessor { path: String },

    /// Content extraction failed.
    #[error("failed to extract '{path}': {reason}")]
    Extraction { path: String, reason: String },

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl PipelineError {
    /// Create an extraction error for a path.
    pub fn extraction(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
