use super::syntax::node_text;
use tree_sitter::Node;

const MODERN_PREFIX: &str = "//go:build";
const LEGACY_PREFIX: &str = "// +build";
const LEGACY_PREFIX_COMPACT: &str = "//+build";

/// Build constraint of the file, as alternatives of space-separated tag sets.
///
/// Only comments preceding the `package` clause are considered. A `//go:build` line takes
/// precedence over `// +build` lines. Negated tags are dropped.
pub(crate) fn build_tags(root: Node, content: &str) -> Option<Vec<String>> {
    let mut legacy: Option<Vec<String>> = None;
    for child in header_comments(root) {
        let text = node_text(child, content).trim();
        if let Some(expr) = text.strip_prefix(MODERN_PREFIX) {
            return Some(modern_build_tags(expr));
        }
        if let Some(expr) = text
            .strip_prefix(LEGACY_PREFIX)
            .or_else(|| text.strip_prefix(LEGACY_PREFIX_COMPACT))
        {
            legacy.get_or_insert_with(Vec::new).extend(legacy_build_tags(expr));
        }
    }
    legacy
}

fn header_comments(root: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .take_while(|child| child.kind() != "package_clause")
        .filter(|child| child.kind() == "comment")
        .collect()
}

/// `// +build a,b c`: spaces separate alternatives, commas join tags.
fn legacy_build_tags(expr: &str) -> Vec<String> {
    expr.split_whitespace()
        .filter_map(|alternative| {
            let tags = alternative
                .split(',')
                .filter(|tag| !tag.is_empty() && !tag.starts_with('!'))
                .collect::<Vec<_>>();
            if tags.is_empty() {
                None
            } else {
                Some(tags.join(" "))
            }
        })
        .collect()
}

/// `//go:build a && (b || !c)`: `&&` joins tags, `||` starts a new alternative.
///
/// Negated terms, including negated groups, are dropped.
fn modern_build_tags(expr: &str) -> Vec<String> {
    let expr = expr
        .replace('(', " ( ")
        .replace(')', " ) ")
        .replace("&&", " && ")
        .replace("||", " || ")
        .replace('!', " ! ");
    let mut parser = ConstraintParser {
        tokens: expr.split_whitespace().collect(),
        position: 0,
    };
    parser
        .or()
        .and_then(|constraint| constraint.alternatives())
        .unwrap_or_default()
        .into_iter()
        .filter(|alternative| !alternative.is_empty())
        .map(|alternative| alternative.join(" "))
        .collect()
}

enum Constraint<'a> {
    Tag(&'a str),
    Not,
    And(Vec<Constraint<'a>>),
    Or(Vec<Constraint<'a>>),
}

impl<'a> Constraint<'a> {
    /// Each alternative is a set of tags that must all hold. `None` when nothing remains after
    /// dropping negations.
    fn alternatives(&self) -> Option<Vec<Vec<&'a str>>> {
        match self {
            Constraint::Tag(tag) => Some(vec![vec![*tag]]),
            Constraint::Not => None,
            Constraint::Or(operands) => {
                let alternatives = operands
                    .iter()
                    .filter_map(Constraint::alternatives)
                    .flatten()
                    .collect::<Vec<_>>();
                if alternatives.is_empty() {
                    None
                } else {
                    Some(alternatives)
                }
            }
            Constraint::And(operands) => operands
                .iter()
                .filter_map(Constraint::alternatives)
                .reduce(|left, right| {
                    let mut product = Vec::with_capacity(left.len() * right.len());
                    for left in &left {
                        for right in &right {
                            product.push(left.iter().chain(right).copied().collect());
                        }
                    }
                    product
                }),
        }
    }
}

/// Recursive descent over `||` (loosest), `&&`, then `!` and parentheses.
struct ConstraintParser<'a> {
    tokens: Vec<&'a str>,
    position: usize,
}

impl<'a> ConstraintParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    fn or(&mut self) -> Option<Constraint<'a>> {
        let mut operands = vec![self.and()?];
        while self.peek() == Some("||") {
            self.position += 1;
            operands.push(self.and()?);
        }
        Some(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Constraint::Or(operands)
        })
    }

    fn and(&mut self) -> Option<Constraint<'a>> {
        let mut operands = vec![self.unary()?];
        while self.peek() == Some("&&") {
            self.position += 1;
            operands.push(self.unary()?);
        }
        Some(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Constraint::And(operands)
        })
    }

    fn unary(&mut self) -> Option<Constraint<'a>> {
        match self.advance()? {
            "!" => {
                self.unary()?;
                Some(Constraint::Not)
            }
            "(" => {
                let inner = self.or()?;
                // An unclosed group still yields what it holds.
                if self.peek() == Some(")") {
                    self.position += 1;
                }
                Some(inner)
            }
            ")" | "&&" | "||" => None,
            tag => Some(Constraint::Tag(tag)),
        }
    }
}
