//! Ingestion pipeline: extraction, splitting, embedding, ingestion.

mod embedder;
mod ingest;
mod processor;
mod splitter;

pub use embedder::{EmbeddingProvider, HashEmbedder};
pub use ingest::{FileIngestor, IngestLog};
pub use processor::{ContentProcessor, HtmlProcessor, PlainTextProcessor, ProcessorSet};
pub use splitter::TextSplitter;
