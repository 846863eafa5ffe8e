use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Knowledge-base settings shared by the indexer, the query layer, and the
/// MCP server.
///
/// Constructed from CLI flags; [`Settings::validate`] must pass before a
/// [`crate::kwb::Service`] can be built.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory to index.
    pub root_path: PathBuf,
    /// Path of the SQLite index file.
    pub index_path: PathBuf,

    /// Extra basenames to index in addition to the built-in allow-set.
    pub extra_extensions: Vec<String>,
    /// Extra directory names to skip in addition to the built-in set.
    pub exclude_dirs: Vec<String>,
    /// Files larger than this many bytes are skipped with a warning.
    pub max_file_size: u64,
    /// Number of documents flushed to the index per transaction.
    pub batch_size: usize,
    /// Storage engine flavor: `scorch` (WAL journal) or `upsidedown`
    /// (rollback journal).
    pub index_type: String,

    /// Upper bound for a single search call.
    pub search_timeout: Duration,
    /// Default number of hits when the caller passes no limit.
    pub search_limit: usize,
    /// Print scores in CLI search output.
    pub search_show_score: bool,
    /// 0 = exact terms, 1-2 = prefix-expand query terms.
    pub search_fuzziness: u8,
    /// Highlight style for previews: `html` or `ansi`.
    pub highlight_style: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch size must be greater than 0");
        }
        if self.index_type.is_empty() {
            bail!("index type cannot be empty");
        }
        if self.max_file_size == 0 {
            bail!("max file size must be greater than 0");
        }
        if self.search_limit == 0 {
            bail!("search limit must be greater than 0");
        }
        if self.highlight_style.is_empty() {
            bail!("highlight style cannot be empty");
        }
        if self.search_fuzziness > 2 {
            bail!("search fuzziness must be between 0 and 2");
        }
        if self.index_type != "scorch" && self.index_type != "upsidedown" {
            bail!(
                "invalid index type: {} (must be 'scorch' or 'upsidedown')",
                self.index_type
            );
        }
        if self.highlight_style != "html" && self.highlight_style != "ansi" {
            bail!(
                "invalid highlight style: {} (must be 'html' or 'ansi')",
                self.highlight_style
            );
        }
        Ok(())
    }

    pub fn index_exists(&self) -> bool {
        self.index_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Settings {
        Settings {
            root_path: PathBuf::from("."),
            index_path: PathBuf::from(".devx/kwb.db"),
            extra_extensions: vec![],
            exclude_dirs: vec![],
            max_file_size: 1_048_576,
            batch_size: 100,
            index_type: "scorch".to_string(),
            search_timeout: Duration::from_secs(10),
            search_limit: 10,
            search_show_score: false,
            search_fuzziness: 0,
            highlight_style: "ansi".to_string(),
        }
    }

    #[test]
    fn accepts_valid_settings() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut s = valid();
        s.batch_size = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_file_size() {
        let mut s = valid();
        s.max_file_size = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_unknown_index_type() {
        let mut s = valid();
        s.index_type = "btree".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn accepts_upsidedown_index_type() {
        let mut s = valid();
        s.index_type = "upsidedown".to_string();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rejects_fuzziness_out_of_range() {
        let mut s = valid();
        s.search_fuzziness = 3;
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_unknown_highlight_style() {
        let mut s = valid();
        s.highlight_style = "latex".to_string();
        assert!(s.validate().is_err());
    }
}
