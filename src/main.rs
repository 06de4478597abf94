//! Scout - Incremental semantic index over watched directory trees
//!
//! Entry point for the Scout daemon.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use scout::config::default_index_dir;
use scout::pipeline::{FileIngestor, HashEmbedder, IngestLog, ProcessorSet, TextSplitter};
use scout::query::QueryEngine;
use scout::store::IndexStore;
use scout::watcher::{DirectoryWatcher, IgnoreMatcher, WatcherConfig};
use scout::{Config, Result};

/// Scout - Incremental semantic index over watched directory trees
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directories to watch for changes
    #[arg(short, long, env = "SCOUT_WATCH_DIRS", value_delimiter = ',')]
    watch: Vec<PathBuf>,

    /// JSON watch configuration file ({"watchList": [...]}); wins over --watch
    #[arg(long, env = "SCOUT_WATCH_CONFIG")]
    watch_config: Option<PathBuf>,

    /// Ignore-pattern file
    #[arg(short, long, env = "SCOUT_IGNORE_FILE")]
    ignore_file: Option<PathBuf>,

    /// Directory for the persisted index
    #[arg(long, env = "SCOUT_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    /// Ingestion log path
    #[arg(long, env = "SCOUT_INGEST_LOG", default_value = "./data/ingestion.log")]
    ingest_log: PathBuf,

    /// Chunk size in characters
    #[arg(long, env = "SCOUT_CHUNK_SIZE", default_value = "1000")]
    chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[arg(long, env = "SCOUT_CHUNK_OVERLAP", default_value = "200")]
    chunk_overlap: usize,

    /// Seconds to wait after a mutation burst before persisting
    #[arg(long, env = "SCOUT_SAVE_DELAY", default_value = "5")]
    save_delay: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SCOUT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "SCOUT_LOG_JSON")]
    log_json: bool,
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("Scout v{} starting...", env!("CARGO_PKG_VERSION"));

    // Build config from CLI
    let config = Config {
        watch_dirs: cli.watch,
        watch_config: cli.watch_config,
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        ignore_file: cli.ignore_file,
        ingest_log: cli.ingest_log,
        index_dir: cli.index_dir.unwrap_or_else(default_index_dir),
        log_level: cli.log_level,
        save_delay: Duration::from_secs(cli.save_delay),
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;
    let watch_dirs = config.resolved_watch_dirs()?;

    // Ignore patterns
    let mut matcher = IgnoreMatcher::new();
    if let Some(ref ignore_file) = config.ignore_file {
        matcher.load(ignore_file);
    }
    matcher.set_roots(&watch_dirs);
    let matcher = Arc::new(matcher);

    // Store, restored from a previous run when possible
    let store = Arc::new(IndexStore::new(
        Arc::new(HashEmbedder::new()),
        config.index_dir.clone(),
        watch_dirs.clone(),
        config.save_delay,
    ));
    match store.load(&config.index_dir) {
        Ok(()) => {}
        Err(e) => {
            tracing::warn!(
                dir = %config.index_dir.display(),
                error = %e,
                "No usable persisted index, starting empty"
            );
        }
    }

    let query = QueryEngine::new(Arc::clone(&store));

    // Ingestion pipeline
    let ingestor = Arc::new(FileIngestor::new(
        Arc::clone(&store),
        ProcessorSet::with_defaults(),
        TextSplitter::new(config.chunk_size, config.chunk_overlap),
        IngestLog::new(config.ingest_log.clone()),
    ));

    // Watcher, then initial crawl through the same handling path
    let watcher_config = WatcherConfig {
        roots: watch_dirs,
        ..Default::default()
    };
    let mut watcher = DirectoryWatcher::new(&watcher_config, matcher)?;
    let _crawl = watcher.scan_existing(Arc::clone(&ingestor));

    tracing::info!(
        roots = watcher.roots().len(),
        index_dir = %config.index_dir.display(),
        "Scout running, press Ctrl-C to stop"
    );

    // Event loop until shutdown
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
            event = watcher.recv() => {
                match event {
                    Some(path) => watcher.dispatch(&ingestor, path),
                    None => break,
                }
            }
        }
    }

    // Orderly shutdown: stop watching, then flush the index
    watcher.close();
    let stats = query.stats();
    tracing::info!(documents = stats.total_documents, "Flushing index");
    store.save(&config.index_dir)?;

    tracing::info!("Scout stopped");
    Ok(())
}
