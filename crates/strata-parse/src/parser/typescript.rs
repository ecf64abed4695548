//! TypeScript and JavaScript: functions, named arrows, classes, methods,
//! interfaces, and type aliases.
//!
//! Every script dialect goes through the TypeScript grammar. `.tsx`/`.jsx`
//! files use the TSX flavour, so one parser instance holds two backends.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use super::ast::{self, field_text, leading_comment};
use super::heuristic::{brace_block_end, comment_above, depth_profile, span_code, split_top_level};
use super::{AstBackend, ParserOptions};
use crate::item::{AiItem, Construct, ItemType};
use crate::languages::{Lang, uses_jsx};

const CLASS_NODES: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

const NOT_A_METHOD: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "with", "super", "new",
];

const IDENT: &str = r"[A-Za-z_$][\w$]*";

static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<export>export\s+)?(?P<default>default\s+)?(?:declare\s+)?(?P<async>async\s+)?function\s*\*?\s*(?P<name>{IDENT})\s*(?:<[^(]*>)?\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$"
    ))
    .unwrap()
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<export>export\s+)?(?P<default>default\s+)?(?:declare\s+)?(?P<abstract>abstract\s+)?class\s+(?P<name>{IDENT})(?P<rest>.*)$"
    ))
    .unwrap()
});

static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<export>export\s+)?(?:declare\s+)?interface\s+(?P<name>{IDENT})(?P<rest>.*)$"
    ))
    .unwrap()
});

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<export>export\s+)?(?:declare\s+)?type\s+(?P<name>{IDENT})\s*(?:<[^=]*>)?\s*=(?P<rest>.*)$"
    ))
    .unwrap()
});

static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<export>export\s+)?(?:const|let|var)\s+(?P<name>{IDENT})\s*(?::[^=]+)?=\s*(?P<async>async\s+)?(?:\((?P<params>[^)]*)\)|(?P<single>{IDENT}))\s*(?::\s*(?P<ret>[^=]+?))?\s*=>"
    ))
    .unwrap()
});

static FIELD_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<mods>(?:(?:public|private|protected|static|readonly|override)\s+)*)(?P<name>#?{IDENT})\s*(?::[^=]+)?=\s*(?P<async>async\s+)?(?:\((?P<params>[^)]*)\)|(?P<single>{IDENT}))\s*(?::\s*(?P<ret>[^=]+?))?\s*=>"
    ))
    .unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?P<mods>(?:(?:public|private|protected|static|async|readonly|abstract|override|get|set)\s+)*)\*?(?P<name>#?{IDENT})\s*(?:<[^(]*>)?\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$"
    ))
    .unwrap()
});

static RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:\s*(?P<ret>[^{;=]+?)\s*(?:\{|;|=>|$)").unwrap());

static EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+([\w$.<>, ]+?)\s*(?:\bimplements\b|\{|$)").unwrap());

static IMPLEMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+([\w$.<>, ]+?)\s*(?:\{|$)").unwrap());

/// TypeScript / JavaScript source parser.
#[derive(Debug)]
pub struct TypeScriptParser {
    ts: AstBackend,
    tsx: AstBackend,
}

impl TypeScriptParser {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            ts: AstBackend::new(Lang::TypeScript, false, options.ast),
            tsx: AstBackend::new(Lang::TypeScript, true, options.ast),
        }
    }

    pub(super) fn backend_for(&self, path: &Path) -> &AstBackend {
        if uses_jsx(path) { &self.tsx } else { &self.ts }
    }

    #[must_use]
    pub fn parse_source(&self, source: &str, rel_path: &str) -> Vec<AiItem> {
        super::extract_items(
            self.backend_for(Path::new(rel_path)),
            Lang::TypeScript,
            source,
            rel_path,
            from_node,
            from_lines,
        )
    }
}

fn from_node(node: Node<'_>, source: &str) -> Option<Construct> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            let name = field_text(node, "name", source)?;
            let construct = signature(ast::construct(ItemType::Function, name, node, source), node, source)
                .with("isGenerator", node.kind() == "generator_function_declaration");
            Some(exported(construct, node, source))
        }
        "arrow_function" => arrow(node, source),
        "method_definition" => method(node, source),
        "class_declaration" | "abstract_class_declaration" => class(node, source),
        "interface_declaration" => {
            let name = field_text(node, "name", source)?;
            let construct = ast::construct(ItemType::Interface, name, node, source)
                .with_opt("typeParameters", field_text(node, "type_parameters", source))
                .with_list(
                    "extends",
                    ast::child_of_kind(node, "extends_type_clause")
                        .map(|c| ast::named_child_texts(c, source))
                        .unwrap_or_default(),
                );
            Some(exported(construct, node, source))
        }
        "type_alias_declaration" => {
            let name = field_text(node, "name", source)?;
            let construct = ast::construct(ItemType::Type, name, node, source)
                .with_opt("typeParameters", field_text(node, "type_parameters", source))
                .with_opt("definition", field_text(node, "value", source));
            Some(exported(construct, node, source))
        }
        _ => None,
    }
}

/// Export flags and `JSDoc`, read from the `export` statement wrapping `outer` if any.
fn exported(construct: Construct, outer: Node<'_>, source: &str) -> Construct {
    let export = outer.parent().filter(|p| p.kind() == "export_statement");
    let anchor = export.unwrap_or(outer);
    construct
        .with("isExported", export.is_some())
        .with("isDefault", export.is_some_and(|e| ast::has_token(e, "default")))
        .with_opt("jsDoc", leading_comment(anchor, source, &["comment"], true))
}

fn signature(construct: Construct, node: Node<'_>, source: &str) -> Construct {
    let parameters = if let Some(list) = node.child_by_field_name("parameters") {
        ast::named_child_texts(list, source)
    } else {
        field_text(node, "parameter", source).into_iter().collect()
    };
    construct
        .with("isAsync", ast::has_token(node, "async"))
        .with_list("parameters", parameters)
        .with_opt(
            "returnType",
            field_text(node, "return_type", source).map(|t| t.trim_start_matches(':').trim().to_string()),
        )
        .with_opt("typeParameters", field_text(node, "type_parameters", source))
}

fn arrow(node: Node<'_>, source: &str) -> Option<Construct> {
    let parent = node.parent()?;
    let name_node = parent.child_by_field_name("name")?;
    if !matches!(name_node.kind(), "identifier" | "property_identifier" | "private_property_identifier") {
        return None;
    }
    let name = ast::text(name_node, source).to_string();

    match parent.kind() {
        "variable_declarator" => {
            // `const f = () => ...` spans the whole declaration when it declares only `f`.
            let outer = parent
                .parent()
                .filter(|d| {
                    matches!(d.kind(), "lexical_declaration" | "variable_declaration")
                        && d.named_child_count() == 1
                })
                .unwrap_or(parent);
            let construct = signature(ast::construct(ItemType::Function, name, outer, source), node, source)
                .with("isArrow", true);
            Some(exported(construct, outer, source))
        }
        "public_field_definition" => {
            let construct = signature(ast::construct(ItemType::Method, name, parent, source), node, source)
                .with("isArrow", true)
                .with("isStatic", ast::has_token(parent, "static"))
                .with_opt("accessibility", accessibility(parent, source))
                .with_opt("className", enclosing_class(parent, source))
                .with_opt("jsDoc", leading_comment(parent, source, &["comment"], true));
            Some(construct)
        }
        _ => None,
    }
}

fn method(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    let accessor = ["get", "set"].into_iter().find(|t| ast::has_token(node, t));
    Some(
        signature(ast::construct(ItemType::Method, name, node, source), node, source)
            .with("isStatic", ast::has_token(node, "static"))
            .with_opt("accessibility", accessibility(node, source))
            .with_opt("accessor", accessor)
            .with_list("decorators", preceding_decorators(node, source))
            .with_opt("className", enclosing_class(node, source))
            .with_opt("jsDoc", leading_comment(node, source, &["comment"], true)),
    )
}

fn class(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    let heritage = ast::child_of_kind(node, "class_heritage");
    let extends = heritage
        .and_then(|h| ast::child_of_kind(h, "extends_clause"))
        .map(|e| ast::text(e, source).trim_start_matches("extends").trim().to_string());
    let implements = heritage
        .and_then(|h| ast::child_of_kind(h, "implements_clause"))
        .map(|c| ast::named_child_texts(c, source))
        .unwrap_or_default();

    let mut decorators = node
        .parent()
        .filter(|p| p.kind() == "export_statement")
        .map(|e| decorator_texts(e, source))
        .unwrap_or_default();
    decorators.extend(decorator_texts(node, source));

    let construct = ast::construct(ItemType::Class, name, node, source)
        .with("isAbstract", node.kind() == "abstract_class_declaration")
        .with_opt("typeParameters", field_text(node, "type_parameters", source))
        .with_opt("extends", extends)
        .with_list("implements", implements)
        .with_list("decorators", decorators)
        .with_opt("className", enclosing_class(node, source));
    Some(exported(construct, node, source))
}

fn accessibility(node: Node<'_>, source: &str) -> Option<String> {
    ast::child_of_kind(node, "accessibility_modifier").map(|m| ast::text(m, source).to_string())
}

fn decorator_texts(node: Node<'_>, source: &str) -> Vec<String> {
    ast::named_children(node)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
        .map(|c| ast::text(c, source).to_string())
        .collect()
}

/// Decorator siblings directly above a class member.
fn preceding_decorators(node: Node<'_>, source: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = node.prev_named_sibling();
    while let Some(prev) = current.filter(|p| p.kind() == "decorator") {
        out.push(ast::text(prev, source).to_string());
        current = prev.prev_named_sibling();
    }
    out.reverse();
    out
}

fn enclosing_class(node: Node<'_>, source: &str) -> Option<String> {
    ast::ancestor_of_kind(node, CLASS_NODES).and_then(|c| field_text(c, "name", source))
}

struct OpenClass {
    name: String,
    body_depth: i32,
    end: usize,
}

fn return_type(rest: &str) -> Option<String> {
    RETURN_RE.captures(rest).map(|c| c["ret"].to_string())
}

fn arrow_params(caps: &regex::Captures<'_>) -> Vec<String> {
    match (caps.name("params"), caps.name("single")) {
        (Some(list), _) => split_top_level(list.as_str()),
        (None, Some(single)) => vec![single.as_str().to_string()],
        (None, None) => Vec::new(),
    }
}

fn from_lines(source: &str) -> Vec<Construct> {
    let lines: Vec<&str> = source.lines().collect();
    let depths = depth_profile(&lines);
    let mut open: Vec<OpenClass> = Vec::new();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        while open.last().is_some_and(|c| c.end < i) {
            open.pop();
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('*') {
            continue;
        }
        let doc = || comment_above(&lines, i, true);

        if let Some(class) = open.last().filter(|c| c.body_depth == depths[i]) {
            if let Some(construct) = class_member(&lines, i, trimmed, &class.name) {
                out.push(construct.with_opt("jsDoc", doc()));
            }
            continue;
        }

        let exported = |caps: &regex::Captures<'_>, construct: Construct| {
            construct
                .with("isExported", caps.name("export").is_some())
                .with("isDefault", caps.name("default").is_some())
                .with_opt("jsDoc", doc())
        };

        if let Some(caps) = CLASS_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let rest = &caps["rest"];
            let construct = Construct::new(ItemType::Class, &caps["name"], (i + 1, end + 1), span_code(&lines, i, end))
                .with("isAbstract", caps.name("abstract").is_some())
                .with_opt("extends", EXTENDS_RE.captures(rest).map(|c| c[1].trim().to_string()))
                .with_list(
                    "implements",
                    IMPLEMENTS_RE.captures(rest).map(|c| split_top_level(&c[1])).unwrap_or_default(),
                )
                .with_opt("className", open.last().map(|c| c.name.clone()));
            out.push(exported(&caps, construct));
            open.push(OpenClass {
                name: caps["name"].to_string(),
                body_depth: depths[i] + 1,
                end,
            });
        } else if let Some(caps) = FUNC_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let construct =
                Construct::new(ItemType::Function, &caps["name"], (i + 1, end + 1), span_code(&lines, i, end))
                    .with("isAsync", caps.name("async").is_some())
                    .with_list("parameters", split_top_level(caps.name("params").map_or("", |m| m.as_str())))
                    .with_opt("returnType", return_type(&caps["rest"]));
            out.push(exported(&caps, construct));
        } else if let Some(caps) = INTERFACE_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let construct =
                Construct::new(ItemType::Interface, &caps["name"], (i + 1, end + 1), span_code(&lines, i, end))
                    .with_list(
                        "extends",
                        EXTENDS_RE.captures(&caps["rest"]).map(|c| split_top_level(&c[1])).unwrap_or_default(),
                    );
            out.push(exported(&caps, construct));
        } else if let Some(caps) = TYPE_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let construct =
                Construct::new(ItemType::Type, &caps["name"], (i + 1, end + 1), span_code(&lines, i, end))
                    .with("definition", caps["rest"].trim().trim_end_matches(';').trim());
            out.push(exported(&caps, construct));
        } else if let Some(caps) = ARROW_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let construct =
                Construct::new(ItemType::Function, &caps["name"], (i + 1, end + 1), span_code(&lines, i, end))
                    .with("isArrow", true)
                    .with("isAsync", caps.name("async").is_some())
                    .with_list("parameters", arrow_params(&caps))
                    .with_opt("returnType", caps.name("ret").map(|m| m.as_str().trim().to_string()));
            out.push(exported(&caps, construct));
        }
    }
    out
}

/// Method or arrow-valued field declared directly in a class body.
fn class_member(lines: &[&str], i: usize, trimmed: &str, class_name: &str) -> Option<Construct> {
    if let Some(caps) = FIELD_ARROW_RE.captures(lines[i]) {
        let end = brace_block_end(lines, i);
        let mods = &caps["mods"];
        return Some(
            Construct::new(ItemType::Method, &caps["name"], (i + 1, end + 1), span_code(lines, i, end))
                .with("isArrow", true)
                .with("isAsync", caps.name("async").is_some())
                .with("isStatic", mods.split_whitespace().any(|m| m == "static"))
                .with_opt("accessibility", accessibility_word(mods))
                .with_list("parameters", arrow_params(&caps))
                .with_opt("returnType", caps.name("ret").map(|m| m.as_str().trim().to_string()))
                .with("className", class_name),
        );
    }

    if trimmed.ends_with(';') {
        return None;
    }
    if let Some(paren) = trimmed.find('(')
        && trimmed[..paren].contains('=')
    {
        return None;
    }
    let caps = METHOD_RE.captures(lines[i])?;
    if NOT_A_METHOD.contains(&&caps["name"]) {
        return None;
    }

    let end = brace_block_end(lines, i);
    let mods: Vec<&str> = caps["mods"].split_whitespace().collect();
    let accessor = mods.iter().copied().find(|m| matches!(*m, "get" | "set"));
    Some(
        Construct::new(ItemType::Method, &caps["name"], (i + 1, end + 1), span_code(lines, i, end))
            .with("isAsync", mods.contains(&"async"))
            .with("isStatic", mods.contains(&"static"))
            .with_opt("accessibility", accessibility_word(&caps["mods"]))
            .with_opt("accessor", accessor)
            .with_list("parameters", split_top_level(caps.name("params").map_or("", |m| m.as_str())))
            .with_opt("returnType", return_type(&caps["rest"]))
            .with("className", class_name),
    )
}

fn accessibility_word(mods: &str) -> Option<&str> {
    mods.split_whitespace()
        .find(|m| matches!(*m, "public" | "private" | "protected"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"import { x } from "./x";

/** Adds numbers. */
export function add(a: number, b: number): number {
  return a + b;
}

export const double = (n: number): number => n * 2;

export default class Counter extends Base implements Tickable {
  private count = 0;

  /** Increment. */
  public async tick(step: number): Promise<void> {
    this.count += step;
  }

  static create(): Counter {
    return new Counter();
  }

  reset = () => {
    this.count = 0;
  };
}

export interface Tickable extends Named {
  tick(step: number): Promise<void>;
}

type Id = string | number;
"#;

    fn summary(items: &[AiItem]) -> Vec<(ItemType, &str, usize, usize)> {
        items
            .iter()
            .map(|i| (i.item_type, i.name.as_str(), i.start_line(), i.end_line()))
            .collect()
    }

    fn expected() -> Vec<(ItemType, &'static str, usize, usize)> {
        vec![
            (ItemType::Function, "add", 4, 6),
            (ItemType::Function, "double", 8, 8),
            (ItemType::Class, "Counter", 10, 25),
            (ItemType::Method, "tick", 14, 16),
            (ItemType::Method, "create", 18, 20),
            (ItemType::Method, "reset", 22, 24),
            (ItemType::Interface, "Tickable", 27, 29),
            (ItemType::Type, "Id", 31, 31),
        ]
    }

    fn check_metadata(items: &[AiItem]) {
        let add = &items[0];
        assert_eq!(add.id, "counter.add_L4");
        assert_eq!(add.language, Lang::TypeScript);
        assert_eq!(add.metadata["isExported"], true);
        assert_eq!(add.metadata["jsDoc"], "Adds numbers.");
        assert_eq!(add.metadata["returnType"], "number");
        assert_eq!(add.metadata["parameters"], serde_json::json!(["a: number", "b: number"]));

        assert_eq!(items[1].metadata["isArrow"], true);
        assert_eq!(items[1].metadata["returnType"], "number");

        let counter = &items[2];
        assert_eq!(counter.metadata["isDefault"], true);
        assert_eq!(counter.metadata["extends"], "Base");
        assert_eq!(counter.metadata["implements"], serde_json::json!(["Tickable"]));

        let tick = &items[3];
        assert_eq!(tick.metadata["isAsync"], true);
        assert_eq!(tick.metadata["accessibility"], "public");
        assert_eq!(tick.metadata["returnType"], "Promise<void>");
        assert_eq!(tick.metadata["className"], "Counter");
        assert_eq!(tick.metadata["jsDoc"], "Increment.");

        assert_eq!(items[4].metadata["isStatic"], true);
        assert_eq!(items[5].metadata["isArrow"], true);
        assert_eq!(items[6].metadata["extends"], serde_json::json!(["Named"]));
        assert_eq!(items[7].metadata["isExported"], false);
    }

    #[cfg(feature = "lang-ts")]
    #[test]
    fn ast_extracts_typescript_constructs() {
        let items = TypeScriptParser::new(ParserOptions::default()).parse_source(COUNTER, "src/counter.ts");
        assert_eq!(summary(&items), expected());
        check_metadata(&items);
        assert_eq!(items[7].metadata["definition"], "string | number");
    }

    #[test]
    fn heuristic_extracts_typescript_constructs() {
        let items = TypeScriptParser::new(ParserOptions { ast: false }).parse_source(COUNTER, "src/counter.ts");
        assert_eq!(summary(&items), expected());
        check_metadata(&items);
        assert_eq!(items[7].metadata["definition"], "string | number");
    }

    #[cfg(feature = "lang-ts")]
    #[test]
    fn javascript_file_reports_javascript_language() {
        let source = "function hello(name) {\n  return `hi ${name}`;\n}\n\n[1, 2].map((n) => n * 2);\n";
        let items = TypeScriptParser::new(ParserOptions::default()).parse_source(source, "lib/app.js");
        assert_eq!(items.len(), 1, "anonymous arrows are not items");
        assert_eq!(items[0].language, Lang::JavaScript);
        assert_eq!(items[0].id, "app.hello_L1");
    }

    #[cfg(feature = "lang-ts")]
    #[test]
    fn tsx_files_use_the_tsx_grammar() {
        let parser = TypeScriptParser::new(ParserOptions::default());
        assert!(!std::ptr::eq(
            parser.backend_for(Path::new("view.tsx")),
            parser.backend_for(Path::new("view.ts"))
        ));
        let items = parser.parse_source("export const View = () => <div>hi</div>;\n", "ui/view.tsx");
        assert_eq!(summary(&items), vec![(ItemType::Function, "View", 1, 1)]);
        assert_eq!(items[0].metadata["isExported"], true);
    }

    #[test]
    fn heuristic_skips_calls_and_field_initializers() {
        let source = "class A {\n  value = compute(1);\n  run() {\n    if (x) {\n      go();\n    }\n  }\n}\n";
        let items = TypeScriptParser::new(ParserOptions { ast: false }).parse_source(source, "a.ts");
        assert_eq!(
            summary(&items),
            vec![(ItemType::Class, "A", 1, 8), (ItemType::Method, "run", 3, 7)]
        );
    }
}
