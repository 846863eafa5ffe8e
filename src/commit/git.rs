//! Version-control operations for the commit pipeline.
//!
//! Shells out to the `git` CLI for repository state and mutations, the
//! same way the context collectors do. The repository handle is owned by
//! the commit service for its lifetime.
//!
//! Staging supports include/exclude filters with three paths:
//! - no filters → one `git add --all`
//! - a single simple glob include (glob meta, no path separator) → add by
//!   pathspec
//! - anything else → enumerate changed files, filter, add one by one
//!
//! A pattern matches a file when it is a substring of the path or the
//! basename, or when it glob-matches either. Global-gitignore patterns
//! follow gitignore line rules (comments, blanks, and `!` negations are
//! ignored; a trailing `/` means a directory prefix).

use anyhow::{anyhow, bail, Context, Result};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

pub struct GitOperations {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GitConfig {
    pub user_name: String,
    pub user_email: String,
    pub gpg_sign: bool,
    pub signing_key: String,
    pub gpg_program: String,
}

/// A semantic version parsed from a `v<major>.<minor>.<patch>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

fn semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v(\d+)\.(\d+)\.(\d+)$").expect("static semver pattern"))
}

impl SemVer {
    /// Parse `v1.2.3`; anything else yields `0.0.0`.
    pub fn parse(tag: &str) -> Self {
        match semver_regex().captures(tag) {
            Some(caps) => Self {
                major: caps[1].parse().unwrap_or(0),
                minor: caps[2].parse().unwrap_or(0),
                patch: caps[3].parse().unwrap_or(0),
            },
            None => Self {
                major: 0,
                minor: 0,
                patch: 0,
            },
        }
    }
}

impl std::fmt::Display for SemVer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl GitOperations {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .current_dir(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .context("running git")?;
        if !output.status.success() {
            bail!("failed to open git repository at {}", path.display());
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self {
            root: PathBuf::from(root),
        })
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
            .context("running git")?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn config_value(&self, key: &str) -> String {
        Command::new("git")
            .current_dir(&self.root)
            .args(["config", key])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
            .unwrap_or_default()
    }

    /// Read git configuration. `user.name` and `user.email` are required.
    pub fn config(&self) -> Result<GitConfig> {
        let user_name = self.config_value("user.name");
        if user_name.is_empty() {
            bail!("git user.name not configured. Run: git config user.name \"Your Name\"");
        }
        let user_email = self.config_value("user.email");
        if user_email.is_empty() {
            bail!(
                "git user.email not configured. Run: git config user.email \"you@example.com\""
            );
        }

        let gpg_program = match self.config_value("gpg.program") {
            p if p.is_empty() => "gpg".to_string(),
            p => p,
        };

        Ok(GitConfig {
            user_name,
            user_email,
            gpg_sign: self.config_value("commit.gpgsign").to_lowercase() == "true",
            signing_key: self.config_value("user.signingkey"),
            gpg_program,
        })
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
    }

    /// Mixed reset: clear the index, keep the working tree.
    pub fn unstage_all(&self) -> Result<()> {
        self.git(&["reset", "--quiet"])?;
        Ok(())
    }

    /// Paths with worktree modifications (including untracked), per
    /// `git status --porcelain`.
    fn modified_files(&self) -> Result<Vec<String>> {
        let status = self.git(&["status", "--porcelain"])?;
        let mut files = Vec::new();
        for line in status.lines() {
            if line.len() < 4 {
                continue;
            }
            let worktree = line.as_bytes()[1] as char;
            let untracked = line.starts_with("??");
            if worktree == ' ' && !untracked {
                continue;
            }
            let path = line[3..].trim();
            // Renames are reported as "old -> new"; stage the new path.
            let path = path.rsplit(" -> ").next().unwrap_or(path);
            files.push(path.trim_matches('"').to_string());
        }
        Ok(files)
    }

    /// Stage modified files honoring exclude/include patterns and,
    /// optionally, the global gitignore. Returns the staged paths.
    pub fn stage_files(
        &self,
        exclude_patterns: &[String],
        include_patterns: &[String],
        use_global_gitignore: bool,
    ) -> Result<Vec<String>> {
        let global_patterns = if use_global_gitignore {
            self.global_gitignore_patterns()?
        } else {
            Vec::new()
        };

        // Fast path: nothing to filter, stage everything in one call.
        if exclude_patterns.is_empty() && include_patterns.is_empty() && global_patterns.is_empty()
        {
            let files = self.modified_files()?;
            if files.is_empty() {
                return Ok(Vec::new());
            }
            self.git(&["add", "--all"])?;
            return Ok(files);
        }

        // Fast path: one simple glob include, stage by pathspec.
        if exclude_patterns.is_empty()
            && global_patterns.is_empty()
            && include_patterns.len() == 1
            && is_simple_glob(&include_patterns[0])
        {
            let pattern = &include_patterns[0];
            let matcher = PatternSet::new(std::slice::from_ref(pattern));
            let files: Vec<String> = self
                .modified_files()?
                .into_iter()
                .filter(|f| matcher.matches(f))
                .collect();
            if files.is_empty() {
                return Ok(Vec::new());
            }
            self.git(&["add", "--", pattern.as_str()])?;
            return Ok(files);
        }

        // Fallback: enumerate, filter, stage one by one.
        let excludes = PatternSet::new(exclude_patterns);
        let includes = PatternSet::new(include_patterns);

        let mut to_stage = Vec::new();
        for file in self.modified_files()? {
            if excludes.matches(&file) || matches_gitignore(&file, &global_patterns) {
                continue;
            }
            if !include_patterns.is_empty() && !includes.matches(&file) {
                continue;
            }
            to_stage.push(file);
        }

        for file in &to_stage {
            self.git(&["add", "--", file.as_str()])
                .with_context(|| format!("failed to stage file {}", file))?;
        }
        Ok(to_stage)
    }

    fn global_gitignore_patterns(&self) -> Result<Vec<String>> {
        let excludes_file = self.config_value("core.excludesFile");
        if excludes_file.is_empty() {
            return Ok(Vec::new());
        }
        let path = if let Some(rest) = excludes_file.strip_prefix("~/") {
            let home =
                std::env::var("HOME").context("failed to get home directory")?;
            PathBuf::from(home).join(rest)
        } else {
            PathBuf::from(excludes_file)
        };
        parse_gitignore_file(&path)
    }

    /// The cached diff of the index against HEAD.
    pub fn staged_diff(&self) -> Result<String> {
        let diff = self.git(&["diff", "--cached"])?;
        if !diff.trim().is_empty() {
            return Ok(diff);
        }
        // New files may produce an empty plain diff; retry without
        // external diff drivers when anything is staged.
        let status = self.git(&["status", "--porcelain"])?;
        let has_staged = status
            .lines()
            .any(|l| !l.starts_with("??") && l.as_bytes().first().map(|&b| b as char) != Some(' '));
        if has_staged {
            return self.git(&["diff", "--cached", "--no-ext-diff"]);
        }
        Ok(String::new())
    }

    /// Create a commit with the configured author identity.
    ///
    /// When `commit.gpgsign=true`, signing is delegated to the signing
    /// program's agent; a missing key or unreachable agent is a hard error.
    pub fn create_commit(&self, message: &str) -> Result<()> {
        let config = self.config().context("failed to get git config")?;

        if config.gpg_sign {
            if config.signing_key.is_empty() {
                bail!("commit.gpgsign=true but user.signingkey not configured");
            }
            if !self.gpg_agent_available(&config.gpg_program, &config.signing_key) {
                bail!(
                    "signing key {} not available via {} — start the agent or disable commit.gpgsign",
                    config.signing_key,
                    config.gpg_program
                );
            }
        }

        self.git(&["commit", "-m", message])
            .context("failed to create commit")?;
        Ok(())
    }

    fn gpg_agent_available(&self, gpg_program: &str, signing_key: &str) -> bool {
        Command::new(gpg_program)
            .args(["--batch", "--list-secret-keys", signing_key])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Push the current branch to `origin`.
    pub fn push(&self) -> Result<()> {
        let branch = self.current_branch()?;
        self.git(&["push", "origin", branch.as_str()])
            .with_context(|| format!("failed to push to origin/{}", branch))?;
        Ok(())
    }

    /// The highest tag matching `v<int>.<int>.<int>`, or `""` when the
    /// repository carries no semver tags.
    pub fn latest_tag(&self) -> Result<String> {
        let output = self.git(&["tag", "-l", "v*"])?;
        let latest = output
            .lines()
            .map(str::trim)
            .filter(|t| semver_regex().is_match(t))
            .map(|t| (SemVer::parse(t), t.to_string()))
            .max_by_key(|(v, _)| *v);
        Ok(latest.map(|(_, t)| t).unwrap_or_default())
    }

    /// Increment `current_tag` per `kind` (`major`, `minor`, `patch`).
    /// An empty current tag starts from `v0.0.0`.
    pub fn increment_version(&self, current_tag: &str, kind: &str) -> Result<String> {
        increment_version(current_tag, kind)
    }

    /// Create an annotated tag carrying `message`.
    pub fn create_tag(&self, tag: &str, message: &str) -> Result<()> {
        self.git(&["tag", "-a", tag, "-m", message])
            .with_context(|| format!("failed to create tag {}", tag))?;
        Ok(())
    }

    pub fn push_tag(&self, tag: &str) -> Result<()> {
        self.git(&["push", "origin", tag])
            .with_context(|| format!("failed to push tag {}", tag))?;
        Ok(())
    }
}

pub fn increment_version(current_tag: &str, kind: &str) -> Result<String> {
    let mut version = if current_tag.is_empty() {
        SemVer {
            major: 0,
            minor: 0,
            patch: 0,
        }
    } else {
        SemVer::parse(current_tag)
    };

    match kind.to_lowercase().as_str() {
        "major" => {
            version.major += 1;
            version.minor = 0;
            version.patch = 0;
        }
        "minor" => {
            version.minor += 1;
            version.patch = 0;
        }
        "patch" => {
            version.patch += 1;
        }
        other => {
            return Err(anyhow!(
                "invalid increment type: {} (must be major, minor, or patch)",
                other
            ))
        }
    }

    Ok(version.to_string())
}

/// Precompiled include/exclude patterns.
///
/// A pattern matches when it is a substring of the path or basename, or
/// glob-matches either.
pub struct PatternSet {
    patterns: Vec<(String, Option<GlobMatcher>)>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| {
                let glob = Glob::new(p).ok().map(|g| g.compile_matcher());
                (p.clone(), glob)
            })
            .collect();
        Self { patterns }
    }

    pub fn matches(&self, file: &str) -> bool {
        let basename = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);
        self.patterns.iter().any(|(raw, glob)| {
            if file.contains(raw.as_str()) || basename.contains(raw.as_str()) {
                return true;
            }
            match glob {
                Some(matcher) => matcher.is_match(file) || matcher.is_match(basename),
                None => false,
            }
        })
    }
}

/// Gitignore-style exclusion over parsed patterns.
fn matches_gitignore(file: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let basename = Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file);
    for pattern in patterns {
        if let Some(dir) = pattern.strip_suffix('/') {
            if file.contains(&format!("{}/", dir)) {
                return true;
            }
            continue;
        }
        if file.contains(pattern.as_str()) || basename.contains(pattern.as_str()) {
            return true;
        }
        if let Ok(glob) = Glob::new(pattern) {
            let matcher = glob.compile_matcher();
            if matcher.is_match(file) || matcher.is_match(basename) {
                return true;
            }
        }
    }
    false
}

/// Parse a gitignore file into exclude patterns. Blank lines, comments,
/// and `!` negations are skipped. A missing file yields no patterns.
pub fn parse_gitignore_file(path: &Path) -> Result<Vec<String>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to open gitignore file {}", path.display()))
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'))
        .map(str::to_string)
        .collect())
}

/// A pattern is a "simple glob" when it carries glob meta characters but
/// no path separator.
fn is_simple_glob(pattern: &str) -> bool {
    !pattern.contains('/') && (pattern.contains('*') || pattern.contains('?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_parse_and_display() {
        let v = SemVer::parse("v1.2.3");
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.to_string(), "v1.2.3");
        assert_eq!(SemVer::parse("garbage"), SemVer::parse("v0.0.0"));
    }

    #[test]
    fn semver_ordering_picks_highest() {
        let tags = ["v0.1.0", "v0.1.9", "v0.2.0"];
        let max = tags.iter().map(|t| SemVer::parse(t)).max().unwrap();
        assert_eq!(max.to_string(), "v0.2.0");
    }

    #[test]
    fn increment_major_zeroes_rest() {
        assert_eq!(increment_version("v1.2.3", "major").unwrap(), "v2.0.0");
    }

    #[test]
    fn increment_minor_zeroes_patch() {
        assert_eq!(increment_version("v1.2.3", "minor").unwrap(), "v1.3.0");
    }

    #[test]
    fn increment_patch() {
        assert_eq!(increment_version("v1.2.3", "patch").unwrap(), "v1.2.4");
    }

    #[test]
    fn increment_from_empty_starts_at_zero() {
        assert_eq!(increment_version("", "patch").unwrap(), "v0.0.1");
    }

    #[test]
    fn increment_rejects_unknown_kind() {
        assert!(increment_version("v1.0.0", "huge").is_err());
    }

    #[test]
    fn pattern_set_substring_match() {
        let set = PatternSet::new(&["generated".to_string()]);
        assert!(set.matches("src/generated/types.rs"));
        assert!(!set.matches("src/handwritten/types.rs"));
    }

    #[test]
    fn pattern_set_basename_glob_match() {
        let set = PatternSet::new(&["*.lock".to_string()]);
        assert!(set.matches("Cargo.lock"));
        assert!(set.matches("sub/dir/Cargo.lock"));
        assert!(!set.matches("src/main.rs"));
    }

    #[test]
    fn gitignore_parsing_skips_comments_and_negations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ignore");
        std::fs::write(&path, "# comment\n\n*.log\n!keep.log\nbuild/\n").unwrap();
        let patterns = parse_gitignore_file(&path).unwrap();
        assert_eq!(patterns, vec!["*.log".to_string(), "build/".to_string()]);
    }

    #[test]
    fn gitignore_missing_file_is_empty() {
        let patterns = parse_gitignore_file(Path::new("/nonexistent/gitignore")).unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn gitignore_directory_pattern_is_prefix() {
        let patterns = vec!["build/".to_string()];
        assert!(matches_gitignore("build/out.o", &patterns));
        assert!(matches_gitignore("sub/build/out.o", &patterns));
        assert!(!matches_gitignore("builder.rs", &patterns));
    }

    #[test]
    fn simple_glob_detection() {
        assert!(is_simple_glob("*.rs"));
        assert!(is_simple_glob("foo?.txt"));
        assert!(!is_simple_glob("src/*.rs"));
        assert!(!is_simple_glob("plain.txt"));
    }
}
