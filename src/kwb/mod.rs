//! Knowledge-base subsystem: filesystem indexer, full-text query layer,
//! and an MCP stdio server exposing both to AI agents.
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │  walker  │──▶│ batch writes  │──▶│ SQLite + FTS5 │
//! └──────────┘   └───────────────┘   └──────┬────────┘
//!                                           │
//!                          ┌────────────────┤
//!                          ▼                ▼
//!                    ┌──────────┐    ┌────────────┐
//!                    │   CLI    │    │ MCP (stdio)│
//!                    └──────────┘    └────────────┘
//! ```
//!
//! The [`Service`] owns the index handle exclusively. Queries open the
//! index lazily; [`Service::close`] releases it and is idempotent.

pub mod document;
pub mod index;
pub mod search;
pub mod server;
pub mod settings;

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

pub use document::{file_type, Document};
pub use search::SearchResult;
pub use settings::Settings;

use index::IndexManager;

pub struct Service {
    settings: Settings,
    index: IndexManager,
}

impl Service {
    /// Validate settings and construct the service. The index is not
    /// opened here; every query opens it lazily.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let index = IndexManager::new(settings.clone());
        Ok(Self { settings, index })
    }

    pub async fn build_index(&mut self, root: &Path) -> Result<u64> {
        info!(root = %root.display(), index = %self.settings.index_path.display(), "building knowledge base index");
        self.index.build_index(root).await
    }

    /// Full-text search bounded by `settings.search_timeout`.
    pub async fn search(&mut self, query: &str, limit: i64) -> Result<Vec<SearchResult>> {
        let timeout = self.settings.search_timeout;
        let pool = self.index.open().await?;
        let results = tokio::time::timeout(
            timeout,
            search::search(pool, &self.settings, query, limit),
        )
        .await
        .map_err(|_| anyhow!("search timed out after {:?}", timeout))??;
        Ok(results)
    }

    pub fn get_file(&self, path: &str) -> Result<String> {
        search::get_file(path)
    }

    pub async fn list_files(&mut self, file_type: &str) -> Result<Vec<String>> {
        let pool = self.index.open().await?;
        search::list_files(pool, file_type).await
    }

    /// Document count and index path.
    pub async fn get_stats(&mut self) -> Result<(u64, String)> {
        self.index.stats().await
    }

    pub async fn close(&mut self) {
        self.index.close().await;
    }

    pub fn show_score(&self) -> bool {
        self.settings.search_show_score
    }
}
