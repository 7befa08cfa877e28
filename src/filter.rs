use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{Result, WatchError};

/// Per-subscriber include/exclude filter over relative paths.
///
/// A path passes when it matches the include glob (or no include is
/// configured) and does not match the exclude glob (or no exclude is
/// configured). Globs use shell semantics: `*` and `?` do not cross `/`,
/// `**` does, and brace/bracket classes are supported.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Option<GlobMatcher>,
    exclude: Option<GlobMatcher>,
}

impl PatternFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(compile).transpose()?,
            exclude: exclude.map(compile).transpose()?,
        })
    }

    /// Classify a single relative path.
    pub fn passes(&self, path: &Path) -> bool {
        self.include.as_ref().map_or(true, |m| m.is_match(path))
            && self.exclude.as_ref().map_or(true, |m| !m.is_match(path))
    }

    /// Apply [`passes`](Self::passes) to each path, preserving order.
    ///
    /// Returns `None` when nothing passed, so callers can drop the category
    /// from the outward batch entirely.
    pub fn filter_list(&self, paths: &[PathBuf]) -> Option<Vec<PathBuf>> {
        let matched: Vec<PathBuf> = paths
            .iter()
            .filter(|path| self.passes(path))
            .cloned()
            .collect();

        if matched.is_empty() {
            None
        } else {
            Some(matched)
        }
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| WatchError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}
