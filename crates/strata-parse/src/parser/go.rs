//! Go: functions, methods, and type declarations (struct / interface / other).

use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::Node;

use super::ast::{self, field_text, leading_comment};
use super::heuristic::{brace_block_end, comment_above, span_code, split_top_level};
use super::{AstBackend, ParserOptions};
use crate::item::{AiItem, Construct, ItemType};
use crate::languages::Lang;

static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^func\s*(?:\((?P<recv>[^)]*)\)\s*)?(?P<name>[A-Za-z_]\w*)\s*(?P<tparams>\[[^\]]*\])?\s*\((?P<params>[^)]*)\)?(?P<rest>.*)$",
    )
    .unwrap()
});

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s*(?P<alias>=)?\s*(?:(?P<kind>struct|interface)\b)?(?P<rest>.*)$",
    )
    .unwrap()
});

/// Go source parser.
#[derive(Debug)]
pub struct GoParser {
    pub(super) backend: AstBackend,
}

impl GoParser {
    #[must_use]
    pub fn new(options: ParserOptions) -> Self {
        Self {
            backend: AstBackend::new(Lang::Go, false, options.ast),
        }
    }

    #[must_use]
    pub fn parse_source(&self, source: &str, rel_path: &str) -> Vec<AiItem> {
        super::extract_items(&self.backend, Lang::Go, source, rel_path, from_node, from_lines)
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn from_node(node: Node<'_>, source: &str) -> Option<Construct> {
    match node.kind() {
        "function_declaration" => function(node, source),
        "method_declaration" => method(node, source),
        "type_spec" | "type_alias" => type_spec(node, source),
        _ => None,
    }
}

fn function(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    Some(
        ast::construct(ItemType::Function, name.clone(), node, source)
            .with("isExported", is_exported(&name))
            .with_list("parameters", parameters(node.child_by_field_name("parameters"), source))
            .with_opt("returnType", field_text(node, "result", source))
            .with_opt("typeParameters", field_text(node, "type_parameters", source))
            .with_opt("docComment", leading_comment(node, source, &["comment"], false)),
    )
}

fn method(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    let receiver = node.child_by_field_name("receiver");
    let receiver_type = receiver
        .and_then(|r| ast::named_children(r).into_iter().next())
        .and_then(|decl| field_text(decl, "type", source))
        .map(|t| base_type_name(&t));

    Some(
        ast::construct(ItemType::Method, name.clone(), node, source)
            .with("isExported", is_exported(&name))
            .with_opt("receiver", receiver.map(|r| ast::text(r, source).to_string()))
            .with_opt("receiverType", receiver_type)
            .with_list("parameters", parameters(node.child_by_field_name("parameters"), source))
            .with_opt("returnType", field_text(node, "result", source))
            .with_opt("docComment", leading_comment(node, source, &["comment"], false)),
    )
}

fn type_spec(node: Node<'_>, source: &str) -> Option<Construct> {
    let name = field_text(node, "name", source)?;
    let type_node = node.child_by_field_name("type")?;

    // A lone spec covers its whole `type` declaration; grouped specs cover themselves.
    let span_node = node
        .parent()
        .filter(|p| {
            p.kind() == "type_declaration"
                && ast::named_children(*p)
                    .iter()
                    .filter(|c| matches!(c.kind(), "type_spec" | "type_alias"))
                    .count()
                    == 1
        })
        .unwrap_or(node);

    let is_alias = node.kind() == "type_alias";
    let kind = match type_node.kind() {
        "struct_type" if !is_alias => ItemType::Struct,
        "interface_type" if !is_alias => ItemType::Interface,
        _ => ItemType::Type,
    };

    let mut construct = ast::construct(kind, name.clone(), span_node, source)
        .with("isExported", is_exported(&name))
        .with_opt("typeParameters", field_text(node, "type_parameters", source))
        .with_opt("docComment", leading_comment(span_node, source, &["comment"], false));

    match kind {
        ItemType::Struct => {
            let (fields, embedded) = struct_fields(type_node, source);
            construct = construct.with_list("fields", fields).with_list("embedded", embedded);
        }
        ItemType::Interface => {
            let (methods, embedded) = interface_members(type_node, source);
            construct = construct.with_list("methods", methods).with_list("embedded", embedded);
        }
        _ => {
            construct = construct
                .with("underlyingType", ast::text(type_node, source))
                .with("isAlias", is_alias);
        }
    }
    Some(construct)
}

fn parameters(list: Option<Node<'_>>, source: &str) -> Vec<String> {
    let Some(list) = list else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for decl in ast::named_children(list) {
        if !decl.kind().ends_with("parameter_declaration") {
            continue;
        }
        let mut ty = field_text(decl, "type", source).unwrap_or_default();
        if decl.kind() == "variadic_parameter_declaration" {
            ty = format!("...{ty}");
        }
        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| ast::text(n, source).to_string())
            .collect();
        if names.is_empty() {
            out.push(ty);
        } else {
            out.extend(names.into_iter().map(|n| format!("{n} {ty}")));
        }
    }
    out
}

fn struct_fields(struct_node: Node<'_>, source: &str) -> (Vec<String>, Vec<String>) {
    let mut fields = Vec::new();
    let mut embedded = Vec::new();
    let Some(list) = ast::child_of_kind(struct_node, "field_declaration_list") else {
        return (fields, embedded);
    };
    for decl in ast::named_children(list) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| ast::text(n, source).to_string())
            .collect();
        if names.is_empty() {
            if let Some(ty) = field_text(decl, "type", source) {
                embedded.push(ty);
            }
        } else {
            fields.extend(names);
        }
    }
    (fields, embedded)
}

fn interface_members(iface: Node<'_>, source: &str) -> (Vec<String>, Vec<String>) {
    let mut methods = Vec::new();
    let mut embedded = Vec::new();
    for member in ast::named_children(iface) {
        match member.kind() {
            "method_elem" | "method_spec" => {
                if let Some(name) = field_text(member, "name", source) {
                    methods.push(name);
                }
            }
            "type_elem" | "constraint_elem" => embedded.push(ast::text(member, source).to_string()),
            _ => {}
        }
    }
    (methods, embedded)
}

/// `*pkg.Server[T]` → `Server`.
fn base_type_name(ty: &str) -> String {
    let ty = ty.trim_start_matches('*');
    let ty = ty.split('[').next().unwrap_or(ty);
    ty.rsplit('.').next().unwrap_or(ty).trim().to_string()
}

fn from_lines(source: &str) -> Vec<Construct> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = FUNC_RE.captures(line) {
            let name = caps["name"].to_string();
            let end = brace_block_end(&lines, i);
            let receiver = caps.name("recv").map(|m| m.as_str().trim().to_string());
            let kind = if receiver.is_some() {
                ItemType::Method
            } else {
                ItemType::Function
            };
            let return_type = caps
                .name("rest")
                .map(|m| m.as_str().split('{').next().unwrap_or("").trim().to_string())
                .filter(|r| !r.is_empty());
            let receiver_type = receiver
                .as_deref()
                .and_then(|r| r.split_whitespace().last())
                .map(base_type_name);

            out.push(
                Construct::new(kind, name.clone(), (i + 1, end + 1), span_code(&lines, i, end))
                    .with("isExported", is_exported(&name))
                    .with_opt("receiver", receiver.map(|r| format!("({r})")))
                    .with_opt("receiverType", receiver_type)
                    .with_list("parameters", split_top_level(caps.name("params").map_or("", |m| m.as_str())))
                    .with_opt("returnType", return_type)
                    .with_opt("docComment", comment_above(&lines, i, false)),
            );
            continue;
        }

        if let Some(caps) = TYPE_RE.captures(line.trim_start()) {
            let name = caps["name"].to_string();
            let end = brace_block_end(&lines, i);
            let is_alias = caps.name("alias").is_some();
            let kind = match caps.name("kind").map(|m| m.as_str()) {
                Some("struct") if !is_alias => ItemType::Struct,
                Some("interface") if !is_alias => ItemType::Interface,
                _ => ItemType::Type,
            };
            let mut construct =
                Construct::new(kind, name.clone(), (i + 1, end + 1), span_code(&lines, i, end))
                    .with("isExported", is_exported(&name))
                    .with_opt("docComment", comment_above(&lines, i, false));
            if kind == ItemType::Type {
                construct = construct
                    .with("underlyingType", caps["rest"].trim())
                    .with("isAlias", is_alias);
            }
            out.push(construct);
        }
    }
    out
}
