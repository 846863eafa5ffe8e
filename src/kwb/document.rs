use std::path::Path;

/// A single indexed file.
///
/// The document id is the file path; `doc_type` is derived from the path
/// by [`file_type`].
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub path: String,
    pub content: String,
    pub doc_type: String,
}

impl Document {
    pub fn new(path: &str, content: String) -> Self {
        Self {
            id: path.to_string(),
            path: path.to_string(),
            content,
            doc_type: file_type(path).to_string(),
        }
    }
}

/// Classify a file by extension, falling back to basename heuristics for
/// extensionless files.
pub fn file_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "go" => "code",
        "md" => "documentation",
        "yaml" | "yml" => "config",
        "proto" => "proto",
        "sql" => "sql",
        "json" => "json",
        "toml" => "toml",
        "mod" | "sum" => "module",
        "sh" => "shell",
        "" => {
            let base = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");
            if base.contains("Makefile") {
                "makefile"
            } else if base.contains("Dockerfile") {
                "dockerfile"
            } else {
                "other"
            }
        }
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(file_type("src/a.go"), "code");
        assert_eq!(file_type("README.md"), "documentation");
        assert_eq!(file_type("deploy.yaml"), "config");
        assert_eq!(file_type("conf.yml"), "config");
        assert_eq!(file_type("api.proto"), "proto");
        assert_eq!(file_type("schema.sql"), "sql");
        assert_eq!(file_type("package.json"), "json");
        assert_eq!(file_type("Cargo.toml"), "toml");
        assert_eq!(file_type("go.mod"), "module");
        assert_eq!(file_type("go.sum"), "module");
        assert_eq!(file_type("run.sh"), "shell");
    }

    #[test]
    fn classifies_extensionless_basenames() {
        assert_eq!(file_type("Makefile"), "makefile");
        assert_eq!(file_type("build/Dockerfile"), "dockerfile");
        assert_eq!(file_type("LICENSE"), "other");
    }

    #[test]
    fn unknown_extension_is_other() {
        assert_eq!(file_type("img.png"), "other");
    }

    #[test]
    fn document_id_equals_path() {
        let doc = Document::new("src/a.go", "package a".to_string());
        assert_eq!(doc.id, doc.path);
        assert_eq!(doc.doc_type, "code");
    }
}
