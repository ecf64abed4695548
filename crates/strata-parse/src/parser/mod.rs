//! Language parsers: a closed set of variants behind one `parse_file`.
//!
//! Each variant ranks two strategies. The tree-sitter backend is initialized
//! lazily, once per parser instance; when it is unavailable the line-oriented
//! heuristics in [`heuristic`] take over for the lifetime of the instance.

mod ast;
mod go;
mod heuristic;
mod java;
mod python;
mod typescript;

use std::path::Path;
use std::sync::OnceLock;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{ParseError, Result};
use crate::item::{AiItem, Construct, ItemFactory};
use crate::languages::{Lang, detect_language};

pub use go::GoParser;
pub use java::JavaParser;
pub use python::PythonParser;
pub use typescript::TypeScriptParser;

/// Options shared by every parser variant.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Allow the tree-sitter strategy. When `false` only heuristics run.
    pub ast: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { ast: true }
    }
}

/// Memoized tree-sitter grammar for one parser instance.
#[derive(Debug)]
pub(crate) struct AstBackend {
    lang: Lang,
    tsx: bool,
    enabled: bool,
    grammar: OnceLock<Option<tree_sitter::Language>>,
}

impl AstBackend {
    pub(crate) fn new(lang: Lang, tsx: bool, enabled: bool) -> Self {
        Self {
            lang,
            tsx,
            enabled,
            grammar: OnceLock::new(),
        }
    }

    /// Grammar if the backend initialized; the first call performs initialization.
    pub(crate) fn grammar(&self) -> Option<&tree_sitter::Language> {
        self.grammar.get_or_init(|| self.initialize()).as_ref()
    }

    fn initialize(&self) -> Option<tree_sitter::Language> {
        if !self.enabled {
            tracing::debug!(lang = %self.lang, "AST strategy disabled, using heuristics");
            return None;
        }
        let Some(grammar) = self.lang.grammar(self.tsx) else {
            tracing::warn!(lang = %self.lang, "no tree-sitter grammar compiled in, using heuristics");
            return None;
        };
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            tracing::warn!(lang = %self.lang, "tree-sitter backend unavailable: {e}");
            return None;
        }
        tracing::debug!(lang = %self.lang, tsx = self.tsx, "tree-sitter backend initialized");
        Some(grammar)
    }

    fn parse(&self, source: &str) -> Option<Tree> {
        let grammar = self.grammar()?;
        let mut parser = Parser::new();
        parser.set_language(grammar).ok()?;
        parser.parse(source, None)
    }
}

/// Run the ranked strategies for one file and build its items.
fn extract_items(
    backend: &AstBackend,
    lang: Lang,
    source: &str,
    rel_path: &str,
    from_node: fn(Node<'_>, &str) -> Option<Construct>,
    from_lines: fn(&str) -> Vec<Construct>,
) -> Vec<AiItem> {
    let item_lang = detect_language(Path::new(rel_path)).unwrap_or(lang);
    let factory = ItemFactory::new(rel_path, item_lang);

    let constructs = match backend.parse(source) {
        Some(tree) => ast::walk_constructs(tree.root_node(), lang.construct_node_kinds(), |node| {
            from_node(node, source)
        }),
        None => {
            if backend.grammar().is_some() {
                tracing::warn!(file = rel_path, "tree-sitter produced no tree, using heuristics");
            }
            from_lines(source)
        }
    };

    tracing::debug!(file = rel_path, constructs = constructs.len(), "file parsed");
    constructs.into_iter().map(|c| factory.create(c)).collect()
}

/// One parser per supported language family.
#[derive(Debug)]
pub enum LanguageParser {
    Go(GoParser),
    Java(JavaParser),
    Python(PythonParser),
    TypeScript(TypeScriptParser),
}

impl LanguageParser {
    /// Parser handling `lang`. `JavaScript` maps to the TypeScript variant.
    #[must_use]
    pub fn for_language(lang: Lang, options: ParserOptions) -> Self {
        match lang {
            Lang::Go => Self::Go(GoParser::new(options)),
            Lang::Java => Self::Java(JavaParser::new(options)),
            Lang::Python => Self::Python(PythonParser::new(options)),
            Lang::TypeScript | Lang::JavaScript => Self::TypeScript(TypeScriptParser::new(options)),
        }
    }

    #[must_use]
    pub fn language(&self) -> Lang {
        match self {
            Self::Go(_) => Lang::Go,
            Self::Java(_) => Lang::Java,
            Self::Python(_) => Lang::Python,
            Self::TypeScript(_) => Lang::TypeScript,
        }
    }

    /// Whether the AST strategy is in use for files like `path`.
    #[must_use]
    pub fn ast_available(&self, path: &Path) -> bool {
        match self {
            Self::Go(p) => p.backend.grammar().is_some(),
            Self::Java(p) => p.backend.grammar().is_some(),
            Self::Python(p) => p.backend.grammar().is_some(),
            Self::TypeScript(p) => p.backend_for(path).grammar().is_some(),
        }
    }

    /// Read and parse one file. `root` is the project root used for the
    /// relative `filePath` of every item.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if the file cannot be read.
    pub fn parse_file(&self, path: &Path, root: &Path) -> Result<Vec<AiItem>> {
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse_source(&source, &relative_path(path, root)))
    }

    /// Parse in-memory source as if it lived at `rel_path`.
    #[must_use]
    pub fn parse_source(&self, source: &str, rel_path: &str) -> Vec<AiItem> {
        match self {
            Self::Go(p) => p.parse_source(source, rel_path),
            Self::Java(p) => p.parse_source(source, rel_path),
            Self::Python(p) => p.parse_source(source, rel_path),
            Self::TypeScript(p) => p.parse_source(source, rel_path),
        }
    }
}

/// `path` relative to `root`, `/`-separated. Falls back to `path` itself.
#[must_use]
pub fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_strips_root() {
        let rel = relative_path(Path::new("/repo/src/a.go"), Path::new("/repo"));
        assert_eq!(rel, "src/a.go");
    }

    #[test]
    fn relative_path_outside_root_kept() {
        let rel = relative_path(Path::new("/other/a.go"), Path::new("/repo"));
        assert_eq!(rel, "/other/a.go");
    }

    #[test]
    fn disabled_backend_never_initializes() {
        let backend = AstBackend::new(Lang::Go, false, false);
        assert!(backend.grammar().is_none());
        assert!(backend.grammar().is_none());
    }

    #[cfg(feature = "lang-go")]
    #[test]
    fn enabled_backend_memoizes_grammar() {
        let backend = AstBackend::new(Lang::Go, false, true);
        let first = backend.grammar().map(std::ptr::from_ref);
        let second = backend.grammar().map(std::ptr::from_ref);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn for_language_maps_javascript_to_typescript() {
        let parser = LanguageParser::for_language(Lang::JavaScript, ParserOptions::default());
        assert_eq!(parser.language(), Lang::TypeScript);
    }

    #[test]
    fn parse_file_missing_is_io_error() {
        let parser = LanguageParser::for_language(Lang::Go, ParserOptions::default());
        let err = parser
            .parse_file(Path::new("/definitely/not/here.go"), Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn parse_file_reads_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calc.py");
        std::fs::write(&path, "def add(a, b):\n    return a + b\n").unwrap();

        let parser = LanguageParser::for_language(Lang::Python, ParserOptions::default());
        let items = parser.parse_file(&path, dir.path()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].file_path, "calc.py");
        assert_eq!(items[0].id, "calc.add_L1");
    }
}
