//! Tree-sitter helpers shared by every language variant.

use tree_sitter::Node;

use crate::item::{Construct, ItemType};

/// Depth-first, pre-order walk over the whole tree.
///
/// `extract` is called for every named node whose kind is in `kinds`. Children
/// are visited whether or not the parent produced a construct, so nested
/// declarations each yield their own entry.
pub(crate) fn walk_constructs<'tree>(
    root: Node<'tree>,
    kinds: &[&str],
    mut extract: impl FnMut(Node<'tree>) -> Option<Construct>,
) -> Vec<Construct> {
    let mut out = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        if node.is_named()
            && kinds.contains(&node.kind())
            && let Some(construct) = extract(node)
        {
            out.push(construct);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}

pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

pub(crate) fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| text(n, source).to_string())
}

/// 1-based inclusive line range of a node.
pub(crate) fn line_span(node: Node<'_>) -> (usize, usize) {
    (node.start_position().row + 1, node.end_position().row + 1)
}

/// Construct covering `span_node` exactly.
pub(crate) fn construct(kind: ItemType, name: String, span_node: Node<'_>, source: &str) -> Construct {
    Construct::new(kind, name, line_span(span_node), text(span_node, source))
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let count = u32::try_from(node.named_child_count()).unwrap_or(u32::MAX);
    (0..count).filter_map(|i| node.named_child(i)).collect()
}

/// All children, anonymous tokens included.
pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let count = u32::try_from(node.child_count()).unwrap_or(u32::MAX);
    (0..count).filter_map(|i| node.child(i)).collect()
}

pub(crate) fn child_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    children(node).into_iter().find(|c| c.kind() == kind)
}

/// Whether an anonymous keyword token (e.g. `async`, `static`) is a direct child.
pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    children(node)
        .iter()
        .any(|c| !c.is_named() && c.kind() == token)
}

/// Texts of the named children of `node`, skipping comments.
pub(crate) fn named_child_texts(node: Node<'_>, source: &str) -> Vec<String> {
    named_children(node)
        .into_iter()
        .filter(|c| !c.kind().contains("comment"))
        .map(|c| text(c, source).to_string())
        .collect()
}

/// Nearest ancestor whose kind is one of `kinds`.
pub(crate) fn ancestor_of_kind<'tree>(node: Node<'tree>, kinds: &[&str]) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Contiguous comment siblings directly above `node`, cleaned of markers.
///
/// `doc_only` keeps only `/** ... */` style blocks (Javadoc, `JSDoc`).
pub(crate) fn leading_comment(
    node: Node<'_>,
    source: &str,
    comment_kinds: &[&str],
    doc_only: bool,
) -> Option<String> {
    let mut blocks = Vec::new();
    let mut next_start = node.start_position().row;
    let mut current = node.prev_named_sibling();

    while let Some(prev) = current {
        if !comment_kinds.contains(&prev.kind()) || prev.end_position().row + 1 < next_start {
            break;
        }
        let raw = text(prev, source);
        if doc_only && !raw.starts_with("/**") {
            break;
        }
        blocks.push(raw);
        next_start = prev.start_position().row;
        current = prev.prev_named_sibling();
    }

    if blocks.is_empty() {
        return None;
    }
    blocks.reverse();
    let cleaned = clean_comment(&blocks.join("\n"));
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Strip comment markers (`//`, `#`, `/* */`, leading `*`) from comment text.
pub(crate) fn clean_comment(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let line = line.trim();
            let line = line
                .strip_prefix("/**")
                .or_else(|| line.strip_prefix("/*"))
                .or_else(|| line.strip_prefix("//"))
                .or_else(|| line.strip_prefix('#'))
                .unwrap_or(line);
            let line = line.strip_suffix("*/").unwrap_or(line);
            let line = line.trim();
            line.strip_prefix('*').map_or(line, str::trim)
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_comment_line_style() {
        assert_eq!(clean_comment("// Add sums.\n// Second line."), "Add sums.\nSecond line.");
    }

    #[test]
    fn clean_comment_block_style() {
        let raw = "/**\n * Returns the user.\n * @param id the id\n */";
        assert_eq!(clean_comment(raw), "Returns the user.\n@param id the id");
    }

    #[test]
    fn clean_comment_hash_style() {
        assert_eq!(clean_comment("# helper"), "helper");
    }

    #[test]
    fn clean_comment_empty_block() {
        assert_eq!(clean_comment("/** */"), "");
    }
}
