use crate::{Error, Result};
use log::debug;
use tree_sitter::{Language, Node, Parser, Tree};

pub(crate) fn language() -> Language {
    tree_sitter_go::LANGUAGE.into()
}

pub(crate) fn parse_tree(content: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&language())
        .map_err(|error| Error::Parse(format!("failed to load Go grammar: {error}")))?;
    let tree = parser
        .parse(content, None)
        .ok_or_else(|| Error::Parse(String::from("failed to parse content to tree")))?;
    if tree.root_node().has_error() {
        debug!("syntax tree contains errors; continuing with partial tree");
    }
    Ok(tree)
}

pub(crate) fn node_text<'a>(node: Node, content: &'a str) -> &'a str {
    content.get(node.byte_range()).unwrap_or_default()
}

/// Named children, minus comments.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// `literal_element` wraps the expression or nested literal it holds.
pub(crate) fn unwrap_literal_element(node: Node<'_>) -> Node<'_> {
    if node.kind() == "literal_element" {
        named_children(node).into_iter().next().unwrap_or(node)
    } else {
        node
    }
}

/// The value of a Go string literal, without its quotes and with escapes decoded.
pub(crate) fn string_literal(node: Node, content: &str) -> Option<String> {
    let text = node_text(node, content);
    match node.kind() {
        "interpreted_string_literal" => text
            .strip_prefix('"')
            .and_then(|text| text.strip_suffix('"'))
            .and_then(unescape),
        "raw_string_literal" => text
            .strip_prefix('`')
            .and_then(|text| text.strip_suffix('`'))
            .map(|text| text.replace('\r', "")),
        _ => None,
    }
}

/// Decode the escape sequences of an interpreted string. `None` for a malformed escape or one
/// that does not yield valid UTF-8.
fn unescape(text: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let escaped = chars.next()?;
        let simple = match escaped {
            'a' => Some(b'\x07'),
            'b' => Some(b'\x08'),
            'f' => Some(b'\x0c'),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(b'\x0b'),
            '\\' => Some(b'\\'),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(byte) = simple {
            bytes.push(byte);
            continue;
        }
        match escaped {
            'x' => bytes.push(u8::from_str_radix(&take(&mut chars, 2)?, 16).ok()?),
            '0'..='7' => {
                let digits = format!("{escaped}{}", take(&mut chars, 2)?);
                bytes.push(u8::from_str_radix(&digits, 8).ok()?);
            }
            'u' | 'U' => {
                let width = if escaped == 'u' { 4 } else { 8 };
                let code = u32::from_str_radix(&take(&mut chars, width)?, 16).ok()?;
                let mut buf = [0; 4];
                bytes.extend_from_slice(char::from_u32(code)?.encode_utf8(&mut buf).as_bytes());
            }
            _ => return None,
        }
    }
    String::from_utf8(bytes).ok()
}

fn take(chars: &mut std::str::Chars, count: usize) -> Option<String> {
    let taken = chars.by_ref().take(count).collect::<String>();
    (taken.chars().count() == count).then_some(taken)
}

/// Whether `node` and `other` are the same syntax node.
pub(crate) fn same_node(node: Node, other: Node) -> bool {
    node.id() == other.id()
}

/// Ancestors of `node`, innermost first, stopping before `limit`.
pub(crate) fn ancestors_within<'tree>(node: Node<'tree>, limit: Node<'tree>) -> Vec<Node<'tree>> {
    let mut ancestors = Vec::new();
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if same_node(ancestor, limit) {
            break;
        }
        ancestors.push(ancestor);
        current = ancestor.parent();
    }
    ancestors
}

pub(crate) fn root_of(node: Node<'_>) -> Node<'_> {
    let mut root = node;
    while let Some(parent) = root.parent() {
        root = parent;
    }
    root
}

/// Every descendant of `node` (excluding `node`) of the given kind, in source order.
pub(crate) fn descendants_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Vec<Node<'tree>> {
    let mut found = Vec::new();
    let mut stack = named_children(node);
    stack.reverse();
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            found.push(current);
        }
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
    found
}
