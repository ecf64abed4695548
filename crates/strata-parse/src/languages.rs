//! Language detection and tree-sitter grammar registry.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported source language.
///
/// `JavaScript` is a dialect handled by the TypeScript parser; it never has a
/// parser of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Go,
    Java,
    Python,
    TypeScript,
    JavaScript,
}

impl Lang {
    /// Identifier used in item records and config.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Java => "java",
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
        }
    }

    /// Tree-sitter grammar, or `None` when the corresponding feature is disabled.
    ///
    /// `tsx` selects the TSX flavour of the TypeScript grammar; it is ignored
    /// for the other languages.
    #[must_use]
    pub fn grammar(self, tsx: bool) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-go")]
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[cfg(feature = "lang-java")]
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-ts")]
            Self::TypeScript | Self::JavaScript => Some(if tsx {
                tree_sitter_typescript::LANGUAGE_TSX.into()
            } else {
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
            }),
            #[allow(unreachable_patterns)]
            _ => {
                let _ = tsx;
                None
            }
        }
    }

    /// AST node kinds that may produce an item.
    #[must_use]
    pub fn construct_node_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Go => &[
                "function_declaration",
                "method_declaration",
                "type_spec",
                "type_alias",
            ],
            Self::Java => &[
                "class_declaration",
                "record_declaration",
                "interface_declaration",
                "enum_declaration",
                "method_declaration",
                "constructor_declaration",
                "annotation_type_declaration",
            ],
            Self::Python => &["function_definition", "class_definition"],
            Self::TypeScript | Self::JavaScript => &[
                "function_declaration",
                "generator_function_declaration",
                "arrow_function",
                "method_definition",
                "class_declaration",
                "abstract_class_declaration",
                "interface_declaration",
                "type_alias_declaration",
            ],
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Lowercased extension without the leading dot.
#[must_use]
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
}

/// Detect the language of a file from its extension.
///
/// Script files report their real dialect here even though they share the
/// TypeScript parser.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    match normalized_extension(path)?.as_str() {
        "go" => Some(Lang::Go),
        "java" => Some(Lang::Java),
        "py" | "pyi" => Some(Lang::Python),
        "ts" | "tsx" | "mts" | "cts" => Some(Lang::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        _ => None,
    }
}

/// Whether the file needs the TSX grammar (JSX syntax).
#[must_use]
pub fn uses_jsx(path: &Path) -> bool {
    matches!(normalized_extension(path).as_deref(), Some("tsx" | "jsx"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_go_java_python() {
        assert_eq!(detect_language(Path::new("main.go")), Some(Lang::Go));
        assert_eq!(detect_language(Path::new("src/App.java")), Some(Lang::Java));
        assert_eq!(detect_language(Path::new("app.py")), Some(Lang::Python));
        assert_eq!(detect_language(Path::new("stubs.pyi")), Some(Lang::Python));
    }

    #[test]
    fn detect_language_script_dialects() {
        for ext in &["js", "jsx", "mjs", "cjs"] {
            let path = format!("file.{ext}");
            assert_eq!(
                detect_language(Path::new(&path)),
                Some(Lang::JavaScript),
                "failed for .{ext}"
            );
        }
        for ext in &["ts", "tsx", "mts", "cts"] {
            let path = format!("file.{ext}");
            assert_eq!(
                detect_language(Path::new(&path)),
                Some(Lang::TypeScript),
                "failed for .{ext}"
            );
        }
    }

    #[test]
    fn detect_language_is_case_insensitive() {
        assert_eq!(detect_language(Path::new("Main.GO")), Some(Lang::Go));
        assert_eq!(detect_language(Path::new("x.TSX")), Some(Lang::TypeScript));
    }

    #[test]
    fn detect_language_unknown_returns_none() {
        assert_eq!(detect_language(Path::new("file.rs")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn jsx_detection() {
        assert!(uses_jsx(Path::new("a.tsx")));
        assert!(uses_jsx(Path::new("a.jsx")));
        assert!(!uses_jsx(Path::new("a.ts")));
        assert!(!uses_jsx(Path::new("a.js")));
    }

    #[test]
    fn grammar_returns_some_for_enabled_features() {
        #[cfg(feature = "lang-go")]
        assert!(Lang::Go.grammar(false).is_some());
        #[cfg(feature = "lang-java")]
        assert!(Lang::Java.grammar(false).is_some());
        #[cfg(feature = "lang-python")]
        assert!(Lang::Python.grammar(false).is_some());
        #[cfg(feature = "lang-ts")]
        {
            assert!(Lang::TypeScript.grammar(false).is_some());
            assert!(Lang::JavaScript.grammar(true).is_some());
        }
    }

    #[test]
    fn construct_kinds_per_language() {
        assert!(Lang::Go.construct_node_kinds().contains(&"method_declaration"));
        assert!(Lang::Java.construct_node_kinds().contains(&"constructor_declaration"));
        assert_eq!(Lang::Python.construct_node_kinds().len(), 2);
        assert!(Lang::JavaScript.construct_node_kinds().contains(&"arrow_function"));
    }

    #[test]
    fn lang_id_matches_display() {
        for lang in [Lang::Go, Lang::Java, Lang::Python, Lang::TypeScript, Lang::JavaScript] {
            assert_eq!(lang.to_string(), lang.id());
        }
    }
}
