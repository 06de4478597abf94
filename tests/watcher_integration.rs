//! Integration tests for the watch-ingest-query loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scout::pipeline::{FileIngestor, HashEmbedder, IngestLog, ProcessorSet, TextSplitter};
use scout::query::QueryEngine;
use scout::store::{IndexStore, STATS_FILE};
use scout::watcher::{ChangeHandler, DirectoryWatcher, IgnoreMatcher, WatcherConfig};
use tempfile::TempDir;

fn build_store(tmp: &TempDir, watch_dirs: Vec<PathBuf>, save_delay: Duration) -> Arc<IndexStore> {
    Arc::new(IndexStore::new(
        Arc::new(HashEmbedder::with_dimension(64)),
        tmp.path().join("index"),
        watch_dirs,
        save_delay,
    ))
}

fn build_ingestor(tmp: &TempDir, store: &Arc<IndexStore>) -> Arc<FileIngestor> {
    Arc::new(FileIngestor::new(
        Arc::clone(store),
        ProcessorSet::with_defaults(),
        TextSplitter::new(500, 100),
        IngestLog::new(tmp.path().join("ingestion.log")),
    ))
}

/// Initial crawl indexes pre-existing files and they become searchable.
#[tokio::test]
async fn test_initial_scan_makes_files_searchable() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("rust.md"), "Ownership and borrowing in Rust").unwrap();
    fs::write(docs.join("cooking.txt"), "Slow roasted vegetables recipe").unwrap();

    let store = build_store(&tmp, vec![docs.clone()], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    let config = WatcherConfig {
        roots: vec![docs.clone()],
        ..Default::default()
    };
    let watcher = DirectoryWatcher::new(&config, Arc::new(IgnoreMatcher::new())).unwrap();
    watcher.scan_existing(Arc::clone(&ingestor)).await.unwrap();

    assert_eq!(watcher.tracked_count(), 2);

    let query = QueryEngine::new(Arc::clone(&store));
    let hits = query.search("borrowing ownership", 1, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].chunk.source.ends_with("rust.md"));

    let stats = query.stats();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.watched_directories, vec![docs]);
}

/// Ignored subtrees are skipped by the initial crawl.
#[tokio::test]
async fn test_scan_respects_ignore_patterns() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("project");
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("readme.md"), "project readme").unwrap();
    fs::write(root.join("debug.log"), "noisy output").unwrap();
    fs::write(root.join("node_modules/dep/index.md"), "dependency docs").unwrap();

    let mut matcher = IgnoreMatcher::from_patterns(&["node_modules", "*.log"]);
    matcher.set_roots(std::slice::from_ref(&root));

    let store = build_store(&tmp, vec![root.clone()], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    let config = WatcherConfig {
        roots: vec![root],
        ..Default::default()
    };
    let watcher = DirectoryWatcher::new(&config, Arc::new(matcher)).unwrap();
    watcher.scan_existing(Arc::clone(&ingestor)).await.unwrap();

    assert_eq!(watcher.tracked_count(), 1);
    let all = store.get_all_documents(10);
    assert_eq!(all.len(), 1);
    assert!(all[0].chunk.source.ends_with("readme.md"));
}

/// Modify-then-delete through the handler keeps stats and search consistent.
#[tokio::test]
async fn test_change_and_unlink_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();

    let page = docs.join("page.html");
    fs::write(&page, "<html><body><p>original topic</p></body></html>").unwrap();
    let notes = docs.join("notes.txt");
    fs::write(&notes, "unrelated notes").unwrap();

    let store = build_store(&tmp, vec![docs], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    ingestor.ingest(&page).await.unwrap();
    ingestor.ingest(&notes).await.unwrap();

    let stats = store.stats();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.documents_by_type.get("html"), Some(&1));
    assert_eq!(stats.documents_by_type.get("txt"), Some(&1));

    // Change: the source's chunks are replaced, not duplicated.
    fs::write(&page, "<html><body><p>rewritten subject</p></body></html>").unwrap();
    ingestor.ingest(&page).await.unwrap();
    assert_eq!(store.stats().total_documents, 2);

    let query = QueryEngine::new(Arc::clone(&store));
    let hits = query.search("rewritten subject", 1, None).unwrap();
    assert!(hits[0].chunk.source.ends_with("page.html"));
    assert_eq!(hits[0].chunk.content, "rewritten subject");

    // Unlink: the source disappears from stats and results.
    fs::remove_file(&page).unwrap();
    ingestor.remove(&page).await.unwrap();

    let stats = store.stats();
    assert_eq!(stats.total_documents, 1);
    assert!(!stats.documents_by_type.contains_key("html"));

    let hits = query.search("rewritten subject", 5, None).unwrap();
    assert!(hits.iter().all(|h| !h.chunk.source.ends_with("page.html")));
}

/// Folder-scoped search only returns sources under the given prefix.
#[tokio::test]
async fn test_folder_scoped_search() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("all");
    fs::create_dir_all(root.join("work")).unwrap();
    fs::create_dir_all(root.join("personal")).unwrap();
    fs::write(root.join("work/plan.md"), "quarterly planning meeting").unwrap();
    fs::write(root.join("personal/plan.md"), "holiday planning ideas").unwrap();

    let store = build_store(&tmp, vec![root.clone()], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);
    ingestor.ingest(&root.join("work/plan.md")).await.unwrap();
    ingestor.ingest(&root.join("personal/plan.md")).await.unwrap();

    let query = QueryEngine::new(Arc::clone(&store));
    let hits = query
        .search("planning", 10, Some(&root.join("work")))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].chunk.source.contains("work"));
}

/// Search before anything has been indexed surfaces an error.
#[tokio::test]
async fn test_search_on_empty_index_fails() {
    let tmp = TempDir::new().unwrap();
    let store = build_store(&tmp, Vec::new(), Duration::from_secs(600));
    let query = QueryEngine::new(store);

    let err = query.search("anything", 5, None).unwrap_err();
    assert!(err.to_string().contains("not initialized"));
}

/// A burst of ingests produces one debounced save reflecting the final state.
#[tokio::test]
async fn test_debounced_persistence_after_burst() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();

    let store = build_store(&tmp, vec![docs.clone()], Duration::from_millis(50));
    let ingestor = build_ingestor(&tmp, &store);

    for i in 0..3 {
        let file = docs.join(format!("f{i}.txt"));
        fs::write(&file, format!("content number {i}")).unwrap();
        ingestor.ingest(&file).await.unwrap();
    }

    let index_dir = tmp.path().join("index");
    assert!(!index_dir.join(STATS_FILE).exists());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(index_dir.join(STATS_FILE).exists());

    // A fresh store restores the persisted state.
    let restored = build_store(&tmp, vec![docs], Duration::from_secs(600));
    restored.load(&index_dir).unwrap();
    assert_eq!(restored.stats().total_documents, 3);
}

/// The ingestion log records both successes and failures.
#[tokio::test]
async fn test_ingestion_log_records_attempts() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();

    let store = build_store(&tmp, vec![docs.clone()], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    let good = docs.join("good.txt");
    fs::write(&good, "fine content").unwrap();
    ingestor.ingest(&good).await.unwrap();

    let missing = docs.join("missing.txt");
    assert!(ingestor.ingest(&missing).await.is_err());

    ingestor.remove(&good).await.unwrap();

    let log = fs::read_to_string(tmp.path().join("ingestion.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("ADD | SUCCESS"));
    assert!(lines[1].contains("ADD | FAILED"));
    assert!(lines[2].contains("REMOVE | SUCCESS"));
    assert!(lines.iter().all(|l| l.split(" | ").count() >= 4));
}

/// Closing the watcher clears tracked and in-flight state.
#[tokio::test]
async fn test_close_clears_watcher_state() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("a.txt"), "alpha").unwrap();

    let store = build_store(&tmp, vec![docs.clone()], Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    let config = WatcherConfig {
        roots: vec![docs],
        ..Default::default()
    };
    let mut watcher = DirectoryWatcher::new(&config, Arc::new(IgnoreMatcher::new())).unwrap();
    watcher.scan_existing(Arc::clone(&ingestor)).await.unwrap();
    assert_eq!(watcher.tracked_count(), 1);

    watcher.close();
    assert_eq!(watcher.tracked_count(), 0);
    assert_eq!(watcher.coordinator().in_flight_count(), 0);
    assert!(watcher.recv().await.is_none());

    // The index itself is untouched by closing the watcher.
    assert_eq!(store.stats().total_documents, 1);
}

/// Unlink of a never-indexed path is a harmless no-op.
#[tokio::test]
async fn test_unlink_unknown_source_is_noop() {
    let tmp = TempDir::new().unwrap();
    let store = build_store(&tmp, Vec::new(), Duration::from_secs(600));
    let ingestor = build_ingestor(&tmp, &store);

    ingestor
        .remove(Path::new("/never/indexed.txt"))
        .await
        .unwrap();
    assert_eq!(store.stats().total_documents, 0);
}
