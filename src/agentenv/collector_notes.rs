//! File-backed collectors: analysis notes and project conventions.
//!
//! Both expose a single `content` key. A missing file yields empty
//! content rather than an error.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

use crate::agentenv::collector::Collector;

pub const ANALYSIS_COLLECTOR_NAME: &str = "analysis";
pub const CONVENTIONS_COLLECTOR_NAME: &str = "conventions";

pub const ANALYSIS_FILE_NAME: &str = "analysis.gen.md";
const CONVENTIONS_FILE_NAME: &str = "CONVENTIONS.md";

fn read_content(path: PathBuf) -> Result<Map<String, Value>> {
    let mut result = Map::new();
    let content = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", path.display()));
        }
    };
    result.insert("content".into(), json!(content));
    Ok(result)
}

/// Reads `analysis.gen.md` from the template directory (produced by
/// `devx agentenv analyse`).
pub struct AnalysisCollector {
    template_dir: PathBuf,
}

impl AnalysisCollector {
    pub fn new(template_dir: PathBuf) -> Self {
        Self { template_dir }
    }
}

impl Collector for AnalysisCollector {
    fn name(&self) -> &str {
        ANALYSIS_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        50
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        read_content(self.template_dir.join(ANALYSIS_FILE_NAME))
    }
}

/// Reads `CONVENTIONS.md` from the output directory.
pub struct ConventionsCollector {
    output_dir: PathBuf,
}

impl ConventionsCollector {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl Collector for ConventionsCollector {
    fn name(&self) -> &str {
        CONVENTIONS_COLLECTOR_NAME
    }

    fn priority(&self) -> i32 {
        50
    }

    fn collect(&self) -> Result<Map<String, Value>> {
        read_content(self.output_dir.join(CONVENTIONS_FILE_NAME))
    }
}
