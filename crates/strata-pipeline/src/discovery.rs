//! Resolve the set of source files a pipeline run works on.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

/// Source patterns matched against root-relative paths when no explicit file
/// selection is given.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "**/*.go",
    "**/*.java",
    "**/*.py",
    "**/*.pyi",
    "**/*.ts",
    "**/*.tsx",
    "**/*.mts",
    "**/*.cts",
    "**/*.js",
    "**/*.jsx",
    "**/*.mjs",
    "**/*.cjs",
];

/// Paths never picked up by pattern discovery.
pub const DEFAULT_IGNORES: &[&str] = &[
    "**/node_modules/**",
    "**/vendor/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/*.min.js",
    "**/*.d.ts",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("project root {} is not accessible: {source}", root.display())]
    Root {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File selection for one run.
///
/// An explicit file list wins over pattern discovery. The exclusion set
/// applies to both.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    root: PathBuf,
    files: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
    patterns: Vec<String>,
    ignores: Vec<String>,
}

impl FileDiscovery {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
            exclude: Vec::new(),
            patterns: DEFAULT_PATTERNS.iter().map(ToString::to_string).collect(),
            ignores: DEFAULT_IGNORES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Restrict the run to these files (relative paths resolve against the root).
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.files = files.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, exclude: impl IntoIterator<Item = PathBuf>) -> Self {
        self.exclude = exclude.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    #[must_use]
    pub fn with_ignores(mut self, ignores: Vec<String>) -> Self {
        self.ignores = ignores;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical project root.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Root`] if the root does not exist.
    pub fn canonical_root(&self) -> Result<PathBuf, DiscoveryError> {
        self.root
            .canonicalize()
            .map_err(|source| DiscoveryError::Root {
                root: self.root.clone(),
                source,
            })
    }

    /// Deduplicated, existing, absolute file paths in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error for an inaccessible root or an invalid glob pattern.
    pub fn resolve(&self) -> Result<Vec<PathBuf>, DiscoveryError> {
        let root = self.canonical_root()?;
        let excluded: BTreeSet<PathBuf> =
            self.exclude.iter().map(|p| absolutize(&root, p)).collect();

        let candidates = if self.files.is_empty() {
            self.walk(&root)?
        } else {
            self.explicit(&root)
        };

        let resolved: BTreeSet<PathBuf> = candidates
            .into_iter()
            .filter(|p| !excluded.contains(p))
            .collect();
        tracing::debug!(
            root = %root.display(),
            files = resolved.len(),
            excluded = excluded.len(),
            "resolved file set"
        );
        Ok(resolved.into_iter().collect())
    }

    fn explicit(&self, root: &Path) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter_map(|file| {
                let path = absolutize(root, file);
                if path.is_file() {
                    Some(path)
                } else {
                    tracing::warn!(file = %file.display(), "skipping missing file");
                    None
                }
            })
            .collect()
    }

    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        let include = compile(&self.patterns)?;
        let ignore = compile(&self.ignores)?;

        let files = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(root).ok()?;
                let selected = include.iter().any(|p| p.matches_path_with(rel, MATCH_OPTIONS))
                    && !ignore.iter().any(|p| p.matches_path_with(rel, MATCH_OPTIONS));
                selected.then(|| entry.path().to_path_buf())
            })
            .collect();
        Ok(files)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|source| DiscoveryError::Pattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

fn absolutize(root: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    joined.canonicalize().unwrap_or(joined)
}
