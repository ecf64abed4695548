//! Static extension registry mapping source files to their parser.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ParseError, Result};
use crate::item::AiItem;
use crate::languages::{Lang, normalized_extension};
use crate::parser::{LanguageParser, ParserOptions};

const EXTENSIONS: &[(&str, Lang)] = &[
    ("go", Lang::Go),
    ("java", Lang::Java),
    ("py", Lang::Python),
    ("pyi", Lang::Python),
    ("ts", Lang::TypeScript),
    ("tsx", Lang::TypeScript),
    ("mts", Lang::TypeScript),
    ("cts", Lang::TypeScript),
    ("js", Lang::TypeScript),
    ("jsx", Lang::TypeScript),
    ("mjs", Lang::TypeScript),
    ("cjs", Lang::TypeScript),
];

/// One parser instance per language family, looked up by file extension.
///
/// All script extensions share the single TypeScript instance; the dialect is
/// resolved from the path when items are built.
#[derive(Debug)]
pub struct ParserDispatcher {
    parsers: Vec<LanguageParser>,
    by_extension: HashMap<&'static str, usize>,
}

impl ParserDispatcher {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        let mut parsers: Vec<LanguageParser> = Vec::new();
        let mut by_extension = HashMap::with_capacity(EXTENSIONS.len());

        for &(ext, lang) in EXTENSIONS {
            let slot = match parsers.iter().position(|p| p.language() == lang) {
                Some(slot) => slot,
                None => {
                    parsers.push(LanguageParser::for_language(lang, options));
                    parsers.len() - 1
                }
            };
            by_extension.insert(ext, slot);
        }

        Self {
            parsers,
            by_extension,
        }
    }

    /// Parser registered for the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnsupportedExtension`] if no parser handles it.
    pub fn parser_for(&self, path: &Path) -> Result<&LanguageParser> {
        let extension = normalized_extension(path).unwrap_or_default();
        self.by_extension
            .get(extension.as_str())
            .map(|&slot| &self.parsers[slot])
            .ok_or_else(|| ParseError::UnsupportedExtension {
                path: path.to_path_buf(),
                extension,
            })
    }

    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.parser_for(path).is_ok()
    }

    /// Registered extensions, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<_> = self.by_extension.keys().copied().collect();
        exts.sort_unstable();
        exts
    }

    /// Dispatch and parse one file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnsupportedExtension`] for unmapped extensions and
    /// [`ParseError::Io`] if the file cannot be read.
    pub fn parse_file(&self, path: &Path, root: &Path) -> Result<Vec<AiItem>> {
        self.parser_for(path)?.parse_file(path, root)
    }
}

impl Default for ParserDispatcher {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}
