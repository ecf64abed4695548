//! Polyglot construct extraction.
//!
//! Every supported source file is turned into a flat list of [`AiItem`]s, one
//! per construct of interest (function, class, struct, ...). Each language
//! parser prefers a tree-sitter backend and falls back to line-oriented
//! heuristics when no grammar is available.

pub mod dispatcher;
pub mod error;
pub mod item;
pub mod languages;
pub mod parser;

pub use dispatcher::ParserDispatcher;
pub use error::{ParseError, Result};
pub use item::{AiItem, Dependency, DependencyKind, ItemFactory, ItemType, Metadata};
pub use languages::Lang;
pub use parser::{LanguageParser, ParserOptions, relative_path};
