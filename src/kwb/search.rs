//! Query layer: full-text search, raw file fetch, and typed listing.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::kwb::settings::Settings;

/// A ranked search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub path: String,
    pub score: f64,
    pub doc_type: String,
    pub preview: String,
}

/// Run a full-text query and return up to `limit` hits with previews.
///
/// The query string supports the engine's native syntax: quoted phrases,
/// `AND`/`OR`/`NOT`, and `column:term` prefixes. A non-positive `limit`
/// falls back to `settings.search_limit`.
pub async fn search(
    pool: &SqlitePool,
    settings: &Settings,
    query: &str,
    limit: i64,
) -> Result<Vec<SearchResult>> {
    let limit = if limit <= 0 {
        settings.search_limit as i64
    } else {
        limit
    };

    let (pre, post) = highlight_markers(&settings.highlight_style);
    let query = apply_fuzziness(query, settings.search_fuzziness);

    let rows = sqlx::query(
        r#"
        SELECT docs_fts.path AS path,
               documents.type AS doc_type,
               rank,
               snippet(docs_fts, 1, ?, ?, '…', 12) AS preview
        FROM docs_fts
        JOIN documents ON documents.path = docs_fts.path
        WHERE docs_fts MATCH ?
        ORDER BY rank
        LIMIT ?
        "#,
    )
    .bind(pre)
    .bind(post)
    .bind(&query)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("search error")?;

    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        let rank: f64 = row.get("rank");
        results.push(SearchResult {
            path: row.get("path"),
            // bm25 rank is negative-is-better; negate so higher = better.
            score: -rank,
            doc_type: row.get("doc_type"),
            preview: row.get::<String, _>("preview").replace('\n', " "),
        });
    }

    Ok(results)
}

/// Read a file's raw content from disk. No index lookup is involved.
pub fn get_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading file {}", path))
}

/// List indexed paths, optionally filtered by document type.
/// Returns at most 1000 paths.
pub async fn list_files(pool: &SqlitePool, file_type: &str) -> Result<Vec<String>> {
    let rows = if file_type.is_empty() {
        sqlx::query("SELECT path FROM documents ORDER BY path LIMIT 1000")
            .fetch_all(pool)
            .await
    } else {
        sqlx::query("SELECT path FROM documents WHERE type = ? ORDER BY path LIMIT 1000")
            .bind(file_type)
            .fetch_all(pool)
            .await
    }
    .context("listing files")?;

    Ok(rows.into_iter().map(|r| r.get("path")).collect())
}

fn highlight_markers(style: &str) -> (&'static str, &'static str) {
    if style == "html" {
        ("<mark>", "</mark>")
    } else {
        ("\x1b[1;33m", "\x1b[0m")
    }
}

/// Expand bare terms into prefix queries when fuzziness is enabled.
/// Quoted phrases, boolean operators, and column filters pass through.
fn apply_fuzziness(query: &str, fuzziness: u8) -> String {
    if fuzziness == 0 {
        return query.to_string();
    }
    query
        .split_whitespace()
        .map(|term| {
            let passthrough = term.contains('"')
                || term.contains(':')
                || term.ends_with('*')
                || matches!(term, "AND" | "OR" | "NOT")
                || !term.chars().all(|c| c.is_alphanumeric() || c == '_');
            if passthrough {
                term.to_string()
            } else {
                format!("{}*", term)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
