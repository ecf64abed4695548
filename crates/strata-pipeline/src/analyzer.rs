//! L1 dependency extraction and graph assembly.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{LazyLock, RwLock};

use regex::Regex;
use serde::Serialize;
use strata_parse::{AiItem, Dependency, DependencyKind, ItemType, Lang};

use crate::error::CollaboratorError;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("valid regex"));

/// Metadata keys whose values name supertypes of an item.
const INHERITANCE_KEYS: &[&str] = &[
    "bases",
    "extends",
    "implements",
    "extendsInterfaces",
    "embedded",
];

pub trait DependencyAnalyzer: Send + Sync {
    /// Called once with the full collection before per-item analysis.
    fn prepare(&self, _all: &[AiItem]) {}

    /// Ordered dependencies of `item` against the whole collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be analyzed; the pipeline records
    /// an empty list for it.
    fn analyze_dependencies(
        &self,
        item: &AiItem,
        all: &[AiItem],
    ) -> Result<Vec<Dependency>, CollaboratorError>;

    /// Graph over `all`, whose `l1_deps` are already populated.
    fn build_dependency_graph(&self, all: &[AiItem]) -> DependencyGraph {
        DependencyGraph::from_items(all)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub file_path: String,
    pub outgoing: Vec<String>,
    pub incoming: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
}

/// Item dependency graph keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    /// Build nodes for every item and edges for every dependency that resolved
    /// to an item present in `items`.
    #[must_use]
    pub fn from_items(items: &[AiItem]) -> Self {
        let mut nodes: BTreeMap<String, GraphNode> = items
            .iter()
            .map(|item| {
                (
                    item.id.clone(),
                    GraphNode {
                        item_type: item.item_type,
                        file_path: item.file_path.clone(),
                        outgoing: Vec::new(),
                        incoming: Vec::new(),
                    },
                )
            })
            .collect();

        let mut edges = Vec::new();
        let mut seen = HashSet::new();
        for item in items {
            for dep in &item.l1_deps {
                let Some(target) = dep.target_id.as_deref() else {
                    continue;
                };
                if !nodes.contains_key(target) || !seen.insert((item.id.as_str(), target)) {
                    continue;
                }
                edges.push(GraphEdge {
                    from: item.id.clone(),
                    to: target.to_owned(),
                    kind: dep.kind,
                });
            }
        }

        for edge in &edges {
            if let Some(node) = nodes.get_mut(&edge.from) {
                node.outgoing.push(edge.to.clone());
            }
            if let Some(node) = nodes.get_mut(&edge.to) {
                node.incoming.push(edge.from.clone());
            }
        }

        Self { nodes, edges }
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }
}

/// Resolves identifiers in an item's code against the names of all items.
#[derive(Debug, Default)]
pub struct SymbolAnalyzer {
    prepared: RwLock<Option<NameIndex>>,
}

/// Item name to the `(id, language)` of every item carrying it, in collection order.
type NameIndex = HashMap<String, Vec<(String, Lang)>>;

impl SymbolAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn analyze_with(item: &AiItem, names: &NameIndex) -> Vec<Dependency> {
        let supertypes = supertype_names(item);
        let code = item.l0_code.as_str();

        let mut order: Vec<&str> = Vec::new();
        let mut kinds: HashMap<&str, DependencyKind> = HashMap::new();
        for m in IDENT_RE.find_iter(code) {
            let ident = m.as_str();
            if !names.contains_key(ident) {
                continue;
            }
            let kind = if supertypes.contains(ident) {
                DependencyKind::Inheritance
            } else if code[m.end()..].trim_start().starts_with('(') {
                DependencyKind::Call
            } else {
                DependencyKind::Reference
            };
            match kinds.get_mut(ident) {
                Some(existing) => {
                    if rank(kind) > rank(*existing) {
                        *existing = kind;
                    }
                }
                None => {
                    order.push(ident);
                    kinds.insert(ident, kind);
                }
            }
        }

        let mut deps = Vec::new();
        for ident in order {
            let kind = kinds[ident];
            for (target, lang) in &names[ident] {
                if *target == item.id || !compatible(item.language, *lang) {
                    continue;
                }
                deps.push(Dependency {
                    name: ident.to_owned(),
                    kind,
                    target_id: Some(target.clone()),
                });
            }
        }
        deps
    }
}

impl DependencyAnalyzer for SymbolAnalyzer {
    fn prepare(&self, all: &[AiItem]) {
        if let Ok(mut prepared) = self.prepared.write() {
            *prepared = Some(name_index(all));
        }
    }

    fn analyze_dependencies(
        &self,
        item: &AiItem,
        all: &[AiItem],
    ) -> Result<Vec<Dependency>, CollaboratorError> {
        let prepared = self
            .prepared
            .read()
            .map_err(|e| CollaboratorError::Other(format!("name index unavailable: {e}")))?;
        match prepared.as_ref() {
            Some(names) => Ok(Self::analyze_with(item, names)),
            None => Ok(Self::analyze_with(item, &name_index(all))),
        }
    }
}

fn name_index(all: &[AiItem]) -> NameIndex {
    let mut names: NameIndex = HashMap::new();
    for item in all {
        let targets = names.entry(item.name.clone()).or_default();
        if !targets.iter().any(|(id, _)| *id == item.id) {
            targets.push((item.id.clone(), item.language));
        }
    }
    names
}

/// Names listed in the item's supertype metadata, stripped of generics and qualifiers.
fn supertype_names(item: &AiItem) -> HashSet<String> {
    let mut names = HashSet::new();
    for key in INHERITANCE_KEYS {
        let Some(value) = item.metadata.get(*key) else {
            continue;
        };
        let raw: Vec<&str> = match value {
            serde_json::Value::String(s) => vec![s.as_str()],
            serde_json::Value::Array(values) => {
                values.iter().filter_map(serde_json::Value::as_str).collect()
            }
            _ => Vec::new(),
        };
        for entry in raw {
            let head = entry.split(['<', '[', '(']).next().unwrap_or(entry);
            let base = head.rsplit(['.', ' ', '*', '=']).next().unwrap_or(head).trim();
            if !base.is_empty() {
                names.insert(base.to_owned());
            }
        }
    }
    names
}

fn rank(kind: DependencyKind) -> u8 {
    match kind {
        DependencyKind::Reference => 0,
        DependencyKind::Call => 1,
        DependencyKind::Inheritance => 2,
    }
}

fn compatible(a: Lang, b: Lang) -> bool {
    let script = |l: Lang| matches!(l, Lang::TypeScript | Lang::JavaScript);
    a == b || (script(a) && script(b))
}

#[cfg(test)]
mod tests {
    use strata_parse::ParserDispatcher;

    use super::*;

    fn items(rel_path: &str, source: &str) -> Vec<AiItem> {
        ParserDispatcher::default()
            .parser_for(std::path::Path::new(rel_path))
            .unwrap()
            .parse_source(source, rel_path)
    }

    fn deps_of<'a>(all: &'a [AiItem], name: &str) -> &'a [Dependency] {
        &all.iter().find(|i| i.name == name).unwrap().l1_deps
    }

    fn analyzed(mut all: Vec<AiItem>) -> Vec<AiItem> {
        let analyzer = SymbolAnalyzer::new();
        analyzer.prepare(&all);
        let deps: Vec<_> = all
            .iter()
            .map(|item| analyzer.analyze_dependencies(item, &all).unwrap())
            .collect();
        for (item, deps) in all.iter_mut().zip(deps) {
            item.l1_deps = deps;
        }
        all
    }

    const PY: &str = "\
class Base:
    pass


class Child(Base):
    def run(self):
        return helper(LIMIT)


def helper(x):
    return helper(x - 1) if x else Base
";

    #[test]
    fn classifies_calls_inheritance_and_references() {
        let all = analyzed(items("app.py", PY));

        let child = deps_of(&all, "Child");
        assert_eq!(child[0].name, "Base");
        assert_eq!(child[0].kind, DependencyKind::Inheritance);
        assert!(child.iter().any(|d| d.name == "helper" && d.kind == DependencyKind::Call));

        let run = deps_of(&all, "run");
        assert_eq!(run.len(), 1);
        assert_eq!(run[0].target_id.as_deref(), Some("app.helper_L10"));

        let helper = deps_of(&all, "helper");
        assert_eq!(helper.len(), 1, "self call dropped: {helper:?}");
        assert_eq!(helper[0].name, "Base");
        assert_eq!(helper[0].kind, DependencyKind::Reference);
    }

    #[test]
    fn ambiguous_names_resolve_to_every_target() {
        let mut all = items("a.go", "package a\n\nfunc Open() {}\n");
        all.extend(items("b.go", "package b\n\nfunc Open() {}\n"));
        all.extend(items("main.go", "package main\n\nfunc main() {\n\tOpen()\n}\n"));
        let all = analyzed(all);

        let targets: Vec<_> = deps_of(&all, "main")
            .iter()
            .map(|d| d.target_id.clone().unwrap())
            .collect();
        assert_eq!(targets, ["a.Open_L3", "b.Open_L3"]);
    }

    #[test]
    fn languages_do_not_cross() {
        let mut all = items("util.py", "def load():\n    pass\n");
        all.extend(items("main.go", "package main\n\nfunc main() {\n\tload()\n}\n"));
        let all = analyzed(all);
        assert!(deps_of(&all, "main").is_empty());
    }

    #[test]
    fn works_without_prepare() {
        let all = items("app.py", PY);
        let child = all.iter().find(|i| i.name == "Child").unwrap();
        let deps = SymbolAnalyzer::new()
            .analyze_dependencies(child, &all)
            .unwrap();
        assert!(!deps.is_empty());
    }

    #[test]
    fn graph_links_resolved_dependencies_only() {
        let mut all = analyzed(items("app.py", PY));
        all[0].l1_deps.push(Dependency {
            name: "Unknown".into(),
            kind: DependencyKind::Reference,
            target_id: Some("nowhere_L1".into()),
        });

        let graph = DependencyGraph::from_items(&all);
        assert_eq!(graph.nodes.len(), all.len());
        assert!(graph.edges.iter().all(|e| graph.nodes.contains_key(&e.to)));

        let base = graph.node("app.Base_L1").unwrap();
        assert!(base.incoming.contains(&"app.Child_L5".to_owned()));
        let child = graph.node("app.Child_L5").unwrap();
        assert!(child.outgoing.contains(&"app.Base_L1".to_owned()));
        assert_eq!(
            graph.edge_count(),
            all.iter()
                .flat_map(|i| &i.l1_deps)
                .filter(|d| d.target_id.as_deref() != Some("nowhere_L1"))
                .count()
        );
    }

    #[test]
    fn supertypes_strip_generics_and_packages() {
        let mut all = items("Svc.java", "public class Svc extends core.Base<String> implements Runnable {\n}\n");
        all.extend(items("Base.java", "public class Base<T> {\n}\n"));
        let all = analyzed(all);
        let svc = deps_of(&all, "Svc");
        assert_eq!(svc.len(), 1);
        assert_eq!(svc[0].kind, DependencyKind::Inheritance);
    }
}
