//! Java: type declarations, methods, and constructors, including nested ones.

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use super::ast::{self, field_text, leading_comment};
use super::heuristic::{brace_block_end, comment_above, depth_profile, run_above, span_code, split_top_level};
use super::{AstBackend, ParserOptions};
use crate::item::{AiItem, Construct, ItemType};
use crate::languages::Lang;

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "record_declaration",
    "interface_declaration",
    "enum_declaration",
    "annotation_type_declaration",
];

const NOT_A_METHOD: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "return", "new", "else", "throw",
    "case", "do", "try", "assert",
];

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<mods>(?:(?:public|protected|private|static|abstract|final|sealed|non-sealed|strictfp)\s+)*)(?P<kw>class|interface|enum|record|@interface)\s+(?P<name>[A-Za-z_$][\w$]*)(?P<rest>.*)$",
    )
    .unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<mods>(?:(?:public|protected|private|static|abstract|final|synchronized|native|default|strictfp)\s+)*)(?:<[^>]*>\s*)?(?P<ret>[\w$.\[\]?]+(?:<[^()]*>)?(?:\[\])*)\s+(?P<name>[A-Za-z_$][\w$]*)\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$",
    )
    .unwrap()
});

static CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<mods>(?:(?:public|protected|private)\s+)*)(?P<name>[A-Z][\w$]*)\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$",
    )
    .unwrap()
});

static EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+([\w$.<>, ]+?)\s*(?:\bimplements\b|\{|$)").unwrap());

static IMPLEMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+([\w$.<>, ]+?)\s*(?:\{|$)").unwrap());

/// Java source parser.
#[derive(Debug)]
pub struct JavaParser {
    pub(super) backend: AstBackend,
}

impl JavaParser {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            backend: AstBackend::new(Lang::Java, false, options.ast),
        }
    }

    #[must_use]
    pub fn parse_source(&self, source: &str, rel_path: &str) -> Vec<AiItem> {
        super::extract_items(&self.backend, Lang::Java, source, rel_path, from_node, from_lines)
    }
}

fn from_node(node: Node<'_>, source: &str) -> Option<Construct> {
    let kind = match node.kind() {
        "class_declaration" | "record_declaration" => ItemType::Class,
        "interface_declaration" => ItemType::Interface,
        "enum_declaration" => ItemType::Enum,
        "annotation_type_declaration" => ItemType::Annotation,
        "method_declaration" => ItemType::Method,
        "constructor_declaration" => ItemType::Constructor,
        _ => return None,
    };
    let name = field_text(node, "name", source)?;
    let modifiers = ast::child_of_kind(node, "modifiers");
    let has = |token: &str| modifiers.is_some_and(|m| ast::has_token(m, token));

    let mut construct = ast::construct(kind, name, node, source)
        .with("visibility", visibility(&has))
        .with("isStatic", has("static"))
        .with("isAbstract", has("abstract"))
        .with("isFinal", has("final"))
        .with_list("annotations", annotations(modifiers, source))
        .with_opt("javadoc", leading_comment(node, source, &["block_comment"], true))
        .with_opt("className", enclosing_type(node, source));

    match kind {
        ItemType::Method | ItemType::Constructor => {
            construct = construct
                .with_list("parameters", parameters(node, source))
                .with_opt("returnType", field_text(node, "type", source))
                .with_opt("typeParameters", field_text(node, "type_parameters", source))
                .with_list(
                    "throws",
                    ast::child_of_kind(node, "throws")
                        .map(|t| ast::named_child_texts(t, source))
                        .unwrap_or_default(),
                );
        }
        _ => {
            let type_list = |wrapper: &str| {
                ast::child_of_kind(node, wrapper)
                    .and_then(|w| ast::child_of_kind(w, "type_list"))
                    .map(|l| ast::named_child_texts(l, source))
                    .unwrap_or_default()
            };
            construct = construct
                .with_opt("typeParameters", field_text(node, "type_parameters", source))
                .with_opt(
                    "extends",
                    ast::child_of_kind(node, "superclass")
                        .and_then(|s| ast::named_children(s).into_iter().next())
                        .map(|t| ast::text(t, source).to_string()),
                )
                .with_list("implements", type_list("super_interfaces"))
                .with_list("extendsInterfaces", type_list("extends_interfaces"))
                .with_list("constants", enum_constants(node, source));
            if node.kind() == "record_declaration" {
                construct = construct
                    .with("isRecord", true)
                    .with_list("recordComponents", parameters(node, source));
            }
        }
    }
    Some(construct)
}

fn visibility(has: &impl Fn(&str) -> bool) -> &'static str {
    if has("public") {
        "public"
    } else if has("protected") {
        "protected"
    } else if has("private") {
        "private"
    } else {
        "package"
    }
}

fn annotations(modifiers: Option<Node<'_>>, source: &str) -> Vec<String> {
    modifiers
        .map(|m| {
            ast::named_children(m)
                .into_iter()
                .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
                .map(|c| ast::text(c, source).to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn parameters(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(list) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    ast::named_children(list)
        .into_iter()
        .filter(|p| matches!(p.kind(), "formal_parameter" | "spread_parameter"))
        .map(|p| ast::text(p, source).split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

fn enum_constants(node: Node<'_>, source: &str) -> Vec<String> {
    if node.kind() != "enum_declaration" {
        return Vec::new();
    }
    node.child_by_field_name("body")
        .map(|body| {
            ast::named_children(body)
                .into_iter()
                .filter(|c| c.kind() == "enum_constant")
                .filter_map(|c| field_text(c, "name", source))
                .collect()
        })
        .unwrap_or_default()
}

fn enclosing_type(node: Node<'_>, source: &str) -> Option<String> {
    ast::ancestor_of_kind(node, TYPE_DECLARATIONS).and_then(|t| field_text(t, "name", source))
}

struct OpenType {
    name: String,
    body_depth: i32,
    end: usize,
}

fn from_lines(source: &str) -> Vec<Construct> {
    let lines: Vec<&str> = source.lines().collect();
    let depths = depth_profile(&lines);
    let mut open: Vec<OpenType> = Vec::new();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        while open.last().is_some_and(|t| t.end < i) {
            open.pop();
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || (trimmed.starts_with('@') && !trimmed.starts_with("@interface")) {
            continue;
        }

        if let Some(caps) = TYPE_RE.captures(line) {
            let end = brace_block_end(&lines, i);
            let kind = match &caps["kw"] {
                "interface" => ItemType::Interface,
                "enum" => ItemType::Enum,
                "@interface" => ItemType::Annotation,
                _ => ItemType::Class,
            };
            let rest = &caps["rest"];
            let mods = &caps["mods"];
            let implements = IMPLEMENTS_RE
                .captures(rest)
                .map(|c| split_top_level(&c[1]))
                .unwrap_or_default();
            let extends = EXTENDS_RE.captures(rest).map(|c| c[1].trim().to_string());
            let (extends, extends_interfaces) = if kind == ItemType::Interface {
                (None, extends.map(|e| split_top_level(&e)).unwrap_or_default())
            } else {
                (extends, Vec::new())
            };

            let mut construct = header_construct(&lines, i, end, kind, &caps["name"], mods)
                .with_opt("className", open.last().map(|t| t.name.clone()))
                .with_opt("extends", extends)
                .with_list("implements", implements)
                .with_list("extendsInterfaces", extends_interfaces);
            if &caps["kw"] == "record" {
                construct = construct.with("isRecord", true);
            }
            out.push(construct);
            open.push(OpenType {
                name: caps["name"].to_string(),
                body_depth: depths[i] + 1,
                end,
            });
            continue;
        }

        let Some(enclosing) = open.last() else {
            continue;
        };
        if depths[i] != enclosing.body_depth || (trimmed.contains('=') && !trimmed.contains('(')) {
            continue;
        }
        // `x = call(...)` is a statement, not a declaration.
        if let Some(paren) = trimmed.find('(')
            && trimmed[..paren].contains('=')
        {
            continue;
        }

        let member = CTOR_RE
            .captures(line)
            .filter(|c| c["name"] == enclosing.name)
            .map(|c| (ItemType::Constructor, c, None))
            .or_else(|| {
                METHOD_RE
                    .captures(line)
                    .filter(|c| {
                        !NOT_A_METHOD.contains(&&c["ret"]) && !NOT_A_METHOD.contains(&&c["name"])
                    })
                    .map(|c| {
                        let ret = c["ret"].to_string();
                        (ItemType::Method, c, Some(ret))
                    })
            });
        let Some((kind, caps, return_type)) = member else {
            continue;
        };

        let end = brace_block_end(&lines, i);
        let throws = caps["rest"]
            .split_once("throws")
            .map(|(_, t)| split_top_level(t.split(['{', ';']).next().unwrap_or("")))
            .unwrap_or_default();
        out.push(
            header_construct(&lines, i, end, kind, &caps["name"], &caps["mods"])
                .with("className", enclosing.name.clone())
                .with_list("parameters", split_top_level(caps.name("params").map_or("", |m| m.as_str())))
                .with_opt("returnType", return_type)
                .with_list("throws", throws),
        );
    }
    out
}

/// Construct for a declaration header at `i`, extended upward over its annotations.
fn header_construct(
    lines: &[&str],
    i: usize,
    end: usize,
    kind: ItemType,
    name: &str,
    mods: &str,
) -> Construct {
    let start = run_above(lines, i, |l| l.starts_with('@') && !l.starts_with("@interface"));
    let annotations = lines[start..i].iter().map(|l| l.trim().to_string()).collect();
    let has = |m: &str| mods.split_whitespace().any(|w| w == m);

    Construct::new(kind, name, (start + 1, end + 1), span_code(lines, start, end))
        .with("visibility", visibility(&has))
        .with("isStatic", has("static"))
        .with("isAbstract", has("abstract"))
        .with("isFinal", has("final"))
        .with_list("annotations", annotations)
        .with_opt("javadoc", comment_above(lines, start, true))
}
