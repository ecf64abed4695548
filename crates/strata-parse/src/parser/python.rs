//! Python: functions, methods, and classes, with decorators and docstrings.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use super::ast::{self, field_text};
use super::heuristic::{indent_block_end, indent_of, next_non_blank, run_above, span_code, split_top_level};
use super::{AstBackend, ParserOptions};
use crate::item::{AiItem, Construct, ItemType};
use crate::languages::Lang;

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<async>async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$",
    )
    .unwrap()
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*class\s+(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*(?:\((?P<bases>[^)]*)\))?").unwrap()
});

static RETURN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"->\s*(?P<ret>.+?)\s*:\s*(?:#.*)?$").unwrap());

/// Python source parser.
#[derive(Debug)]
pub struct PythonParser {
    pub(super) backend: AstBackend,
}

impl PythonParser {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            backend: AstBackend::new(Lang::Python, false, options.ast),
        }
    }

    #[must_use]
    pub fn parse_source(&self, source: &str, rel_path: &str) -> Vec<AiItem> {
        super::extract_items(&self.backend, Lang::Python, source, rel_path, from_node, from_lines)
    }
}

fn is_private(name: &str) -> bool {
    name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
}

fn from_node(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    let decorated = node.parent().filter(|p| p.kind() == "decorated_definition");
    let span_node = decorated.unwrap_or(node);
    let decorators = decorated
        .map(|d| {
            ast::named_children(d)
                .into_iter()
                .filter(|c| c.kind() == "decorator")
                .map(|c| ast::text(c, source).to_string())
                .collect()
        })
        .unwrap_or_default();
    let enclosing_class = enclosing_scope(span_node).filter(|s| s.kind() == "class_definition");

    let construct = match node.kind() {
        "function_definition" => {
            let kind = if enclosing_class.is_some() {
                ItemType::Method
            } else {
                ItemType::Function
            };
            ast::construct(kind, name.clone(), span_node, source)
                .with("isAsync", ast::has_token(node, "async"))
                .with_list(
                    "parameters",
                    node.child_by_field_name("parameters")
                        .map(|p| ast::named_child_texts(p, source))
                        .unwrap_or_default(),
                )
                .with_opt("returnType", field_text(node, "return_type", source))
        }
        "class_definition" => ast::construct(ItemType::Class, name.clone(), span_node, source).with_list(
            "bases",
            node.child_by_field_name("superclasses")
                .map(|s| ast::named_child_texts(s, source))
                .unwrap_or_default(),
        ),
        _ => return None,
    };

    Some(
        construct
            .with("isPrivate", is_private(&name))
            .with_list("decorators", decorators)
            .with_opt("docstring", docstring(node, source))
            .with_opt(
                "className",
                enclosing_class.and_then(|c| field_text(c, "name", source)),
            ),
    )
}

/// Nearest enclosing function or class definition, looking through `block`
/// and `decorated_definition` wrappers.
fn enclosing_scope(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        match n.kind() {
            "function_definition" | "class_definition" => return Some(n),
            "block" | "decorated_definition" => current = n.parent(),
            _ => return None,
        }
    }
    None
}

fn docstring(node: Node<'_>, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = ast::named_children(body)
        .into_iter()
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = ast::named_children(first).into_iter().next()?;
    if string.kind() != "string" {
        return None;
    }
    clean_docstring(ast::text(string, source))
}

fn clean_docstring(raw: &str) -> Option<String> {
    let raw = raw.trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B']);
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|q| raw.strip_prefix(q).map(|s| s.strip_suffix(q).unwrap_or(s)))?;
    let text = inner
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

/// Docstring opening on the first body line after the header ending at `header_end`.
fn docstring_after(lines: &[&str], header_end: usize, block_end: usize) -> Option<String> {
    let first = next_non_blank(lines, header_end + 1).filter(|&n| n <= block_end)?;
    let opening = lines[first].trim_start();
    let quote = ["\"\"\"", "'''"]
        .into_iter()
        .find(|q| opening.trim_start_matches(['r', 'R', 'u', 'U']).starts_with(q));

    let Some(quote) = quote else {
        if !(opening.starts_with('"') || opening.starts_with('\'')) {
            return None;
        }
        return clean_docstring(opening.trim_end());
    };
    let closing = (first..=block_end).find(|&j| {
        let line = if j == first {
            opening.split_once(quote).map_or("", |(_, rest)| rest)
        } else {
            lines[j]
        };
        line.contains(quote)
    })?;
    clean_docstring(lines[first..=closing].join("\n").trim())
}

enum ScopeKind {
    Class,
    Function,
}

struct Scope {
    kind: ScopeKind,
    indent: usize,
    name: String,
}

fn from_lines(source: &str) -> Vec<Construct> {
    let lines: Vec<&str> = source.lines().collect();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let indent = indent_of(line);
        while scopes.last().is_some_and(|s| s.indent >= indent) {
            scopes.pop();
        }

        let def = DEF_RE.captures(line);
        let class = if def.is_none() { CLASS_RE.captures(line) } else { None };
        if def.is_none() && class.is_none() {
            continue;
        }

        let start = run_above(&lines, i, |l| l.starts_with('@'));
        let decorators: Vec<String> = lines[start..i].iter().map(|l| l.trim().to_string()).collect();
        let end = indent_block_end(&lines, i);
        let header_end = (i..=end)
            .find(|&j| lines[j].split('#').next().unwrap_or("").trim_end().ends_with(':'))
            .unwrap_or(i);
        let code = span_code(&lines, start, end);
        let class_name = match scopes.last() {
            Some(Scope {
                kind: ScopeKind::Class,
                name,
                ..
            }) => Some(name.clone()),
            _ => None,
        };

        let construct = if let Some(caps) = def {
            let name = caps["name"].to_string();
            let kind = if class_name.is_some() {
                ItemType::Method
            } else {
                ItemType::Function
            };
            let header = lines[i..=header_end].join(" ");
            scopes.push(Scope {
                kind: ScopeKind::Function,
                indent,
                name: name.clone(),
            });
            Construct::new(kind, name, (start + 1, end + 1), code)
                .with("isAsync", caps.name("async").is_some())
                .with_list("parameters", split_top_level(caps.name("params").map_or("", |m| m.as_str())))
                .with_opt("returnType", RETURN_RE.captures(&header).map(|c| c["ret"].to_string()))
        } else if let Some(caps) = class {
            let name = caps["name"].to_string();
            scopes.push(Scope {
                kind: ScopeKind::Class,
                indent,
                name: name.clone(),
            });
            Construct::new(ItemType::Class, name, (start + 1, end + 1), code).with_list(
                "bases",
                split_top_level(caps.name("bases").map_or("", |m| m.as_str())),
            )
        } else {
            continue;
        };

        let name = construct.name.clone();
        out.push(
            construct
                .with("isPrivate", is_private(&name))
                .with_list("decorators", decorators)
                .with_opt("docstring", docstring_after(&lines, header_end, end))
                .with_opt("className", class_name),
        );
    }
    out
}
