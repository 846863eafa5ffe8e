//! Service-level knowledge-base tests exercising the library directly.

use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use devx::kwb::{Service, Settings};

fn settings(root: &Path) -> Settings {
    Settings {
        root_path: root.to_path_buf(),
        index_path: root.join("kwb-index/kwb.db"),
        extra_extensions: vec![],
        exclude_dirs: vec![],
        max_file_size: 1_048_576,
        batch_size: 2,
        index_type: "scorch".to_string(),
        search_timeout: Duration::from_secs(10),
        search_limit: 10,
        search_show_score: false,
        search_fuzziness: 0,
        highlight_style: "ansi".to_string(),
    }
}

fn setup_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/a.go"), "package alpha\nfunc Alpha() {}\n").unwrap();
    fs::write(root.join("src/b.go"), "package beta\nfunc Beta() {}\n").unwrap();
    fs::write(root.join("notes.md"), "# Notes\n\nSome documentation text.\n").unwrap();
    fs::write(root.join("conf.yaml"), "answer: 42\n").unwrap();
    tmp
}

#[tokio::test]
async fn list_files_covers_every_indexed_path() {
    let tmp = setup_tree();
    let mut service = Service::new(settings(tmp.path())).unwrap();
    let count = service.build_index(tmp.path()).await.unwrap();
    assert_eq!(count, 4);

    let files = service.list_files("").await.unwrap();
    assert_eq!(files.len(), 4);
    assert!(files.iter().any(|f| f.ends_with("src/a.go")));
    assert!(files.iter().any(|f| f.ends_with("notes.md")));
    service.close().await;
}

#[tokio::test]
async fn list_files_filters_by_type() {
    let tmp = setup_tree();
    let mut service = Service::new(settings(tmp.path())).unwrap();
    service.build_index(tmp.path()).await.unwrap();

    let code = service.list_files("code").await.unwrap();
    assert_eq!(code.len(), 2);
    assert!(code.iter().all(|f| f.ends_with(".go")));

    let docs = service.list_files("documentation").await.unwrap();
    assert_eq!(docs.len(), 1);

    let none = service.list_files("sql").await.unwrap();
    assert!(none.is_empty());
    service.close().await;
}

#[tokio::test]
async fn search_matches_document_content() {
    let tmp = setup_tree();
    let mut service = Service::new(settings(tmp.path())).unwrap();
    service.build_index(tmp.path()).await.unwrap();

    let results = service.search("documentation", 10).await.unwrap();
    assert!(!results.is_empty());
    assert!(results[0].path.ends_with("notes.md"));
    assert_eq!(results[0].doc_type, "documentation");
    assert!(results[0].score > 0.0);
    service.close().await;
}

#[tokio::test]
async fn get_file_reads_from_disk() {
    let tmp = setup_tree();
    let service = Service::new(settings(tmp.path())).unwrap();
    let path = tmp.path().join("conf.yaml");
    let content = service.get_file(path.to_str().unwrap()).unwrap();
    assert_eq!(content, "answer: 42\n");

    assert!(service.get_file("/nonexistent/file").is_err());
}

#[tokio::test]
async fn queries_open_the_index_lazily() {
    let tmp = setup_tree();

    // Build with one service instance, query with a fresh one.
    let mut builder = Service::new(settings(tmp.path())).unwrap();
    builder.build_index(tmp.path()).await.unwrap();
    builder.close().await;

    let mut service = Service::new(settings(tmp.path())).unwrap();
    let (count, _) = service.get_stats().await.unwrap();
    assert_eq!(count, 4);
    service.close().await;
}

#[tokio::test]
async fn close_is_idempotent() {
    let tmp = setup_tree();
    let mut service = Service::new(settings(tmp.path())).unwrap();
    service.build_index(tmp.path()).await.unwrap();
    service.close().await;
    service.close().await;
}

#[tokio::test]
async fn query_without_index_errors() {
    let tmp = TempDir::new().unwrap();
    let mut service = Service::new(settings(tmp.path())).unwrap();
    let err = service.list_files("").await.unwrap_err();
    assert!(err.to_string().contains("index not found"));
}
