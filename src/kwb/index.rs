//! Index build and lifecycle management.
//!
//! The knowledge base is a SQLite file with a typed `documents` table
//! mirrored into an FTS5 virtual table:
//!
//! | Table | Columns | Purpose |
//! |-------|---------|---------|
//! | `documents` | `path` (PK), `type`, `content` | stored fields, type filtering |
//! | `docs_fts` | `path`, `content` | full-text index (BM25, snippets) |
//!
//! `path` and `content` are searchable; `type` is stored but only reachable
//! through exact filtering. There are no dynamic fields.
//!
//! [`IndexManager::build_index`] walks the root directory, filters entries
//! against the built-in and user-supplied exclusion rules, and flushes
//! documents in batches of `batch_size`, one transaction per batch.
//! Queries open the index lazily; [`IndexManager::close`] is idempotent.

use anyhow::{bail, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::kwb::document::Document;
use crate::kwb::settings::Settings;

/// Directory basenames that are never descended into.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "vendor",
    "node_modules",
    ".idea",
    ".vscode",
    "dist",
    "build",
    "bin",
    ".devx",
];

/// Extensions indexed by default.
const DEFAULT_EXTENSIONS: &[&str] = &[
    "go", "md", "yaml", "yml", "mod", "sum", "proto", "sql", "json", "toml", "env", "sh",
];

/// Extensionless basenames indexed by default.
const ALLOWED_BASENAMES: &[&str] = &["Makefile", "Dockerfile", ".gitignore"];

pub struct IndexManager {
    settings: Settings,
    pool: Option<SqlitePool>,
}

impl IndexManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            pool: None,
        }
    }

    /// Rebuild the index from scratch for `root`.
    ///
    /// Removes any existing index file (tolerating "not found"), creates the
    /// parent directory, then walks `root` and indexes matching files in
    /// batches. Returns the number of documents written.
    ///
    /// Unreadable files and per-document insert failures are logged and
    /// skipped; walker errors at a specific path are logged but do not abort.
    /// Index creation and batch-flush failures are fatal.
    pub async fn build_index(&mut self, root: &Path) -> Result<u64> {
        self.close().await;
        self.remove_existing_index()?;

        if let Some(parent) = self.settings.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("creating index directory: {}", parent.display())
                })?;
            }
        }

        let pool = self.connect(true).await?;
        create_schema(&pool).await?;

        let mut batch: Vec<Document> = Vec::with_capacity(self.settings.batch_size);
        let mut indexed = 0u64;

        let excluded = |name: &str| {
            DEFAULT_EXCLUDED_DIRS.contains(&name)
                || self.settings.exclude_dirs.iter().any(|d| d == name)
        };

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            // Never filter out the walk root itself.
            entry.depth() == 0 || !excluded(&name)
        });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    error!(error = %err, "error accessing path");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self.should_index(&name, ext) {
                continue;
            }

            match entry.metadata() {
                Ok(meta) if meta.len() > self.settings.max_file_size => {
                    warn!(path = %path.display(), size = meta.len(), "skipping large file");
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to stat file");
                    continue;
                }
            }

            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read file");
                    continue;
                }
            };

            batch.push(Document::new(&path.to_string_lossy(), content));
            if batch.len() >= self.settings.batch_size {
                indexed += flush_batch(&pool, &batch).await?;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            indexed += flush_batch(&pool, &batch).await?;
        }

        self.pool = Some(pool);
        info!(documents = indexed, "indexing complete");
        Ok(indexed)
    }

    /// Whether a file with the given basename and extension is indexable.
    fn should_index(&self, name: &str, ext: &str) -> bool {
        DEFAULT_EXTENSIONS.contains(&ext)
            || ALLOWED_BASENAMES.contains(&name)
            || self.settings.extra_extensions.iter().any(|e| e == name)
    }

    fn remove_existing_index(&self) -> Result<()> {
        // The index file plus its WAL sidecars.
        let base = &self.settings.index_path;
        let mut targets = vec![base.clone()];
        for suffix in ["-wal", "-shm"] {
            let mut os = base.clone().into_os_string();
            os.push(suffix);
            targets.push(os.into());
        }
        for target in targets {
            match std::fs::remove_file(&target) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("removing old index: {}", target.display()));
                }
            }
        }
        Ok(())
    }

    async fn connect(&self, create: bool) -> Result<SqlitePool> {
        // `scorch` selects the modern WAL engine, `upsidedown` the legacy
        // rollback journal.
        let journal = if self.settings.index_type == "upsidedown" {
            SqliteJournalMode::Delete
        } else {
            SqliteJournalMode::Wal
        };

        let options = SqliteConnectOptions::new()
            .filename(&self.settings.index_path)
            .create_if_missing(create)
            .journal_mode(journal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("opening index: {}", self.settings.index_path.display())
            })?;

        Ok(pool)
    }

    /// Lazily open the index for querying.
    pub async fn open(&mut self) -> Result<&SqlitePool> {
        if self.pool.is_none() {
            if !self.settings.index_exists() {
                bail!(
                    "index not found at {} — run `devx kwb build` first",
                    self.settings.index_path.display()
                );
            }
            self.pool = Some(self.connect(false).await?);
        }
        Ok(self.pool.as_ref().unwrap())
    }

    /// Release the index handle. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }

    pub async fn stats(&mut self) -> Result<(u64, String)> {
        let index_path = self.settings.index_path.display().to_string();
        let pool = self.open().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(pool)
            .await
            .context("getting doc count")?;
        Ok((count as u64, index_path))
    }
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT PRIMARY KEY,
            type TEXT NOT NULL,
            content TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("creating documents table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(type)")
        .execute(pool)
        .await?;

    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='docs_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query("CREATE VIRTUAL TABLE docs_fts USING fts5(path, content)")
            .execute(pool)
            .await
            .context("creating full-text index")?;
    }

    Ok(())
}

/// Flush one batch of documents inside a single transaction.
///
/// Per-document failures are logged and skipped; a failed commit is fatal.
async fn flush_batch(pool: &SqlitePool, batch: &[Document]) -> Result<u64> {
    let mut tx = pool.begin().await.context("starting index batch")?;
    let mut written = 0u64;

    for doc in batch {
        let res = sqlx::query(
            "INSERT OR REPLACE INTO documents (path, type, content) VALUES (?, ?, ?)",
        )
        .bind(&doc.path)
        .bind(&doc.doc_type)
        .bind(&doc.content)
        .execute(&mut *tx)
        .await;

        if let Err(err) = res {
            warn!(path = %doc.path, error = %err, "failed to index file");
            continue;
        }

        sqlx::query("INSERT INTO docs_fts (path, content) VALUES (?, ?)")
            .bind(&doc.path)
            .bind(&doc.content)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("indexing {}", doc.path))?;

        debug!(path = %doc.path, "indexed file");
        written += 1;
    }

    tx.commit().await.context("flushing index batch")?;
    Ok(written)
}
