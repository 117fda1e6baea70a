//! Source tree scanning.
//!
//! Walks a directory tree and yields paths relative to the root, filtering
//! out anything the site should never see: dotfiles and dot-directories,
//! underscore-prefixed entries (`_templates`, `_output`), and editor backup
//! files (`foo~`, `#foo#`). A path is excluded when *any* of its components
//! matches an ignore pattern, so an ignored directory hides its whole
//! subtree.
//!
//! The same scanner is used for three different trees: the source root (to
//! discover pages), the output root (to list current files for orphan
//! reconciliation), and the template directory (to compute the build clock).
//! Using one filter everywhere keeps the three views consistent — a backup
//! file in the output directory is never misread as an orphan we created.
//!
//! Ordering is directory-walk order and is not part of the contract; callers
//! that need determinism (site loading, log output) sort the collected list
//! themselves. Symlinks are not followed.

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Patterns ignored by default, matched against each path component.
pub const DEFAULT_IGNORE: &[&str] = &[".*", "_*", "*~", "#*#"];

/// Recursive directory walker with per-component ignore globs.
#[derive(Debug, Clone)]
pub struct Scanner {
    patterns: Vec<Pattern>,
}

impl Scanner {
    /// Scanner with the [`DEFAULT_IGNORE`] pattern set.
    pub fn new() -> Self {
        Self::with_patterns(DEFAULT_IGNORE).expect("default ignore patterns are valid globs")
    }

    /// Scanner with a custom pattern set.
    pub fn with_patterns(patterns: &[&str]) -> Result<Self, glob::PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether a single path component is ignored.
    pub fn is_ignored(&self, component: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(component))
    }

    /// Lazily yield every non-ignored file under `root`, relative to `root`.
    pub fn files<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        self.walk(root)
            .filter(|e| e.file_type().is_file())
            .filter_map(move |e| e.path().strip_prefix(root).map(Path::to_path_buf).ok())
    }

    /// Lazily yield every non-ignored directory under `root`, relative to
    /// `root`. Includes the root itself (as the empty path).
    pub fn dirs<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        self.walk(root)
            .filter(|e| e.file_type().is_dir())
            .filter_map(move |e| e.path().strip_prefix(root).map(Path::to_path_buf).ok())
    }

    fn walk<'a>(&'a self, root: &Path) -> impl Iterator<Item = walkdir::DirEntry> + 'a {
        // depth 0 is the root itself; its name must not be filtered or the
        // whole walk vanishes (tempdir names start with a dot).
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_ignored(&e.file_name().to_string_lossy()))
            .filter_map(|e| e.ok())
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}
