//! The canonical per-construct record and its deterministic id.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::languages::Lang;

/// Open attribute bag attached to every item.
///
/// Ordered so that serialized output and equality checks are deterministic.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Kind of construct an item was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Type,
    Enum,
    Constructor,
    Annotation,
}

impl ItemType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Constructor => "constructor",
            Self::Annotation => "annotation",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one item relates to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Call,
    Inheritance,
    Reference,
}

/// One entry of an item's L1 layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Symbol as written in the dependent's source.
    pub name: String,
    pub kind: DependencyKind,
    /// Id of the item the symbol resolved to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// One source construct, enriched layer by layer as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    pub language: Lang,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub l0_code: String,
    #[serde(default)]
    pub l1_deps: Vec<Dependency>,
    #[serde(default)]
    pub l2_desc: Option<String>,
    #[serde(default)]
    pub l2_summary: Option<String>,
    #[serde(default)]
    pub l2_tags: Option<Vec<String>>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl AiItem {
    /// 1-based first line of the construct.
    #[must_use]
    pub fn start_line(&self) -> usize {
        self.line_field("startLine")
    }

    /// 1-based last line of the construct (inclusive).
    #[must_use]
    pub fn end_line(&self) -> usize {
        self.line_field("endLine")
    }

    fn line_field(&self, key: &str) -> usize {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
    }
}

/// A construct found by a parser strategy, before it becomes an [`AiItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct Construct {
    pub kind: ItemType,
    pub name: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    pub code: String,
    pub metadata: Metadata,
}

impl Construct {
    #[must_use]
    pub fn new(
        kind: ItemType,
        name: impl Into<String>,
        lines: (usize, usize),
        code: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            start_line: lines.0,
            end_line: lines.1,
            code: code.into(),
            metadata: Metadata::new(),
        }
    }

    /// Insert a metadata attribute, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Insert a metadata attribute only when `value` is present.
    #[must_use]
    pub fn with_opt<V: Into<serde_json::Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Insert a list attribute only when it is non-empty.
    #[must_use]
    pub fn with_list(self, key: &str, values: Vec<String>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.with(key, values)
        }
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Derive an item id from file stem, construct name, and start line.
///
/// Two constructs with the same stem, name, and start line in different
/// directories receive the same id. Collisions are not detected here.
#[must_use]
pub fn derive_id(file_stem: &str, name: &str, start_line: usize) -> String {
    format!("{}.{}_L{start_line}", sanitize(file_stem), sanitize(name))
}

/// Builds [`AiItem`]s for one parsed file.
#[derive(Debug, Clone)]
pub struct ItemFactory {
    file_path: String,
    file_stem: String,
    language: Lang,
    extracted_at: DateTime<Utc>,
}

impl ItemFactory {
    #[must_use]
    pub fn new(rel_path: &str, language: Lang) -> Self {
        Self::with_timestamp(rel_path, language, Utc::now())
    }

    #[must_use]
    pub fn with_timestamp(rel_path: &str, language: Lang, extracted_at: DateTime<Utc>) -> Self {
        let file_stem = Path::new(rel_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_path: rel_path.replace('\\', "/"),
            file_stem,
            language,
            extracted_at,
        }
    }

    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Turn a construct into an item, adding the universal metadata fields.
    #[must_use]
    pub fn create(&self, construct: Construct) -> AiItem {
        let Construct {
            kind,
            name,
            start_line,
            end_line,
            code,
            mut metadata,
        } = construct;

        metadata.insert("startLine".into(), start_line.into());
        metadata.insert("endLine".into(), end_line.into());
        metadata.insert("sourceLength".into(), code.len().into());
        metadata.insert(
            "extractedAt".into(),
            self.extracted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );

        AiItem {
            id: derive_id(&self.file_stem, &name, start_line),
            item_type: kind,
            name,
            language: self.language,
            file_path: self.file_path.clone(),
            l0_code: code,
            l1_deps: Vec::new(),
            l2_desc: None,
            l2_summary: None,
            l2_tags: None,
            vector: None,
            metadata,
        }
    }
}
