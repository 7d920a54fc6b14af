//! Discovery of `t.Run` subtests inside a test function.
//!
//! Three shapes of subtest name are understood:
//!
//! - a string literal: `t.Run("case_a", func(t *testing.T) { ... })`
//! - a field of a table row: `for _, tt := range cases { t.Run(tt.description, ...) }`
//! - the key of a map: `for name, tc := range map[string]T{...} { t.Run(name, ...) }`
//!
//! Subtests with literal names are searched recursively; table rows are not, as their nested
//! names are only known at runtime.

use super::syntax::{
    ancestors_within, descendants_of_kind, named_children, node_text, root_of, string_literal,
    unwrap_literal_element,
};
use crate::types::{CursorPosition, Runnable};
use log::debug;
use std::ops::Range;
use tree_sitter::Node;

/// All subtests of the test function `function`, in source order, named below `parent`.
pub(crate) fn subtests(function: Node, content: &str, parent: &Runnable) -> Vec<Runnable> {
    let Some(body) = function.child_by_field_name("body") else {
        return Vec::new();
    };
    let finder = Finder {
        function,
        content,
        parent,
    };
    let mut found = Vec::new();
    finder.collect(body, &parent.name, &mut found);
    debug!("found {} subtests of `{}`", found.len(), parent.name);
    found
}

struct Finder<'a, 'tree> {
    function: Node<'tree>,
    content: &'a str,
    parent: &'a Runnable,
}

/// A call of the form `x.Run(name, func(...) { ... })`.
struct RunCall<'tree> {
    call: Node<'tree>,
    name: Node<'tree>,
    body: Option<Node<'tree>>,
}

impl<'tree> RunCall<'tree> {
    fn parse(node: Node<'tree>, content: &str) -> Option<Self> {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        if function.kind() != "selector_expression"
            || node_text(function.child_by_field_name("field")?, content) != "Run"
        {
            return None;
        }
        let arguments = named_children(node.child_by_field_name("arguments")?);
        let [name, func] = arguments[..] else {
            return None;
        };
        if func.kind() != "func_literal" {
            return None;
        }
        Some(Self {
            call: node,
            name,
            body: func.child_by_field_name("body"),
        })
    }

    /// The statement holding the call, or the call itself.
    fn statement(&self) -> Node<'tree> {
        self.call
            .parent()
            .filter(|parent| parent.kind() == "expression_statement")
            .unwrap_or(self.call)
    }
}

impl<'tree> Finder<'_, 'tree> {
    fn collect(&self, node: Node<'tree>, prefix: &str, found: &mut Vec<Runnable>) {
        for child in named_children(node) {
            let Some(run) = RunCall::parse(child, self.content) else {
                self.collect(child, prefix, found);
                continue;
            };
            match run.name.kind() {
                "interpreted_string_literal" | "raw_string_literal" => {
                    let Some(value) = string_literal(run.name, self.content) else {
                        continue;
                    };
                    let name = format!("{prefix}/{value}");
                    found.push(self.runnable(name.clone(), run.statement()));
                    if let Some(body) = run.body {
                        self.collect(body, &name, found);
                    }
                }
                "selector_expression" => self.table_rows(&run, prefix, found),
                "identifier" => self.map_keys(&run, prefix, found),
                kind => debug!("skipping `Run` call with `{kind}` name"),
            }
        }
    }

    /// `for _, tt := range CASES { t.Run(tt.field, ...) }`
    fn table_rows(&self, run: &RunCall<'tree>, prefix: &str, found: &mut Vec<Runnable>) {
        let (Some(operand), Some(field)) = (
            run.name.child_by_field_name("operand"),
            run.name.child_by_field_name("field"),
        ) else {
            return;
        };
        if operand.kind() != "identifier" {
            return;
        }
        let variable = node_text(operand, self.content);
        let field = node_text(field, self.content);
        let Some(range_clause) = self.enclosing_range_clause(run.call, |left| {
            left.get(1)
                .is_some_and(|value| node_text(*value, self.content) == variable)
        }) else {
            return;
        };
        let Some(cases) = range_clause
            .child_by_field_name("right")
            .and_then(|right| self.resolve_literal(right))
        else {
            return;
        };
        let field_index = cases
            .child_by_field_name("type")
            .and_then(element_type)
            .and_then(|element| self.struct_fields(element))
            .and_then(|fields| fields.iter().position(|name| name == field));
        let Some(body) = cases.child_by_field_name("body") else {
            return;
        };
        for row in named_children(body).into_iter().filter_map(row_literal) {
            if let Some(value) = self.row_value(row, field, field_index) {
                found.push(self.runnable(format!("{prefix}/{value}"), row));
            }
        }
    }

    /// `for name, tc := range map[string]T{"a": {...}} { t.Run(name, ...) }`
    fn map_keys(&self, run: &RunCall<'tree>, prefix: &str, found: &mut Vec<Runnable>) {
        let variable = node_text(run.name, self.content);
        let Some(range_clause) = self.enclosing_range_clause(run.call, |left| {
            left.first()
                .is_some_and(|key| node_text(*key, self.content) == variable)
        }) else {
            return;
        };
        let Some(cases) = range_clause
            .child_by_field_name("right")
            .and_then(|right| self.resolve_literal(right))
        else {
            return;
        };
        if cases
            .child_by_field_name("type")
            .is_none_or(|ty| ty.kind() != "map_type")
        {
            return;
        }
        let Some(body) = cases.child_by_field_name("body") else {
            return;
        };
        for element in named_children(body) {
            if element.kind() != "keyed_element" {
                continue;
            }
            let Some(key) = named_children(element).into_iter().next() else {
                continue;
            };
            if let Some(value) = string_literal(unwrap_literal_element(key), self.content) {
                found.push(self.runnable(format!("{prefix}/{value}"), element));
            }
        }
    }

    /// The innermost `range` clause around `call` whose loop variables satisfy `accept`.
    fn enclosing_range_clause(
        &self,
        call: Node<'tree>,
        accept: impl Fn(&[Node<'tree>]) -> bool,
    ) -> Option<Node<'tree>> {
        ancestors_within(call, self.function)
            .into_iter()
            .filter(|ancestor| ancestor.kind() == "for_statement")
            .filter_map(|for_statement| {
                named_children(for_statement)
                    .into_iter()
                    .find(|child| child.kind() == "range_clause")
            })
            .find(|range_clause| {
                range_clause
                    .child_by_field_name("left")
                    .is_some_and(|left| accept(&named_children(left)))
            })
    }

    /// The composite literal `expr` denotes, following a variable bound in the test function or
    /// at file level.
    fn resolve_literal(&self, expr: Node<'tree>) -> Option<Node<'tree>> {
        match expr.kind() {
            "composite_literal" => Some(expr),
            "parenthesized_expression" => named_children(expr)
                .into_iter()
                .next()
                .and_then(|inner| self.resolve_literal(inner)),
            "identifier" => {
                let name = node_text(expr, self.content);
                // The closest preceding binding in the function shadows file-level ones.
                let value = match bindings(self.function, name, self.content)
                    .into_iter()
                    .rfind(|value| value.start_byte() < expr.start_byte())
                {
                    Some(value) => value,
                    None => top_level(self.function, "var_declaration")
                        .into_iter()
                        .find_map(|declaration| {
                            bindings(declaration, name, self.content).into_iter().next()
                        })?,
                };
                Some(value).filter(|value| value.kind() == "composite_literal")
            }
            _ => None,
        }
    }

    /// Field names of the struct `ty` denotes, in declaration order.
    fn struct_fields(&self, ty: Node<'tree>) -> Option<Vec<String>> {
        match ty.kind() {
            "struct_type" => Some(field_names(ty, self.content)),
            "type_identifier" => {
                let name = node_text(ty, self.content);
                self.type_definition(self.function, name)
                    .or_else(|| {
                        top_level(self.function, "type_declaration")
                            .into_iter()
                            .find_map(|declaration| self.type_definition(declaration, name))
                    })
                    .filter(|definition| definition.kind() == "struct_type")
                    .map(|definition| field_names(definition, self.content))
            }
            _ => None,
        }
    }

    fn type_definition(&self, scope: Node<'tree>, name: &str) -> Option<Node<'tree>> {
        descendants_of_kind(scope, "type_spec")
            .into_iter()
            .find(|spec| {
                spec.child_by_field_name("name")
                    .is_some_and(|node| node_text(node, self.content) == name)
            })
            .and_then(|spec| spec.child_by_field_name("type"))
    }

    /// The string value of `field` in `row`, by key or else by position.
    fn row_value(&self, row: Node, field: &str, field_index: Option<usize>) -> Option<String> {
        let elements = named_children(row);
        if elements.iter().any(|element| element.kind() == "keyed_element") {
            return elements
                .into_iter()
                .filter(|element| element.kind() == "keyed_element")
                .find_map(|element| {
                    let [key, value] = named_children(element)[..] else {
                        return None;
                    };
                    if node_text(unwrap_literal_element(key), self.content) != field {
                        return None;
                    }
                    string_literal(unwrap_literal_element(value), self.content)
                });
        }
        let element = elements.get(field_index?)?;
        string_literal(unwrap_literal_element(*element), self.content)
    }

    fn runnable(&self, name: String, node: Node) -> Runnable {
        Runnable {
            name,
            framework: self.parent.framework,
            filepath: self.parent.filepath.clone(),
            range: node_range(node),
            meta: self.parent.meta.clone(),
        }
    }
}

/// Values bound to `name` by `:=` or `var` within `scope`, in source order.
fn bindings<'tree>(scope: Node<'tree>, name: &str, content: &str) -> Vec<Node<'tree>> {
    let short_var_declarations = descendants_of_kind(scope, "short_var_declaration")
        .into_iter()
        .filter_map(|declaration| {
            let left = named_children(declaration.child_by_field_name("left")?);
            let right = named_children(declaration.child_by_field_name("right")?);
            Some((left, right))
        });
    let var_specs = descendants_of_kind(scope, "var_spec")
        .into_iter()
        .filter_map(|spec| {
            let mut cursor = spec.walk();
            let names = spec
                .children_by_field_name("name", &mut cursor)
                .collect::<Vec<_>>();
            let values = named_children(spec.child_by_field_name("value")?);
            Some((names, values))
        });
    let mut values = short_var_declarations
        .chain(var_specs)
        .filter_map(|(names, values)| {
            let index = names
                .iter()
                .position(|candidate| node_text(*candidate, content) == name)?;
            values.get(index).copied()
        })
        .collect::<Vec<_>>();
    values.sort_by_key(Node::start_byte);
    values
}

/// Declarations of `kind` directly under the file's root.
fn top_level<'tree>(node: Node<'tree>, kind: &str) -> Vec<Node<'tree>> {
    named_children(root_of(node))
        .into_iter()
        .filter(|child| child.kind() == kind)
        .collect()
}

pub(crate) fn node_range(node: Node) -> Range<CursorPosition> {
    CursorPosition::from_point(node.start_position())..CursorPosition::from_point(node.end_position())
}

/// The element type of a slice or array type.
fn element_type(ty: Node<'_>) -> Option<Node<'_>> {
    match ty.kind() {
        "slice_type" | "array_type" | "implicit_length_array_type" => {
            ty.child_by_field_name("element")
        }
        _ => None,
    }
}

/// The `{...}` of one table row, whether written `{...}` or `Scenario{...}`.
fn row_literal(element: Node<'_>) -> Option<Node<'_>> {
    let element = unwrap_literal_element(element);
    match element.kind() {
        "literal_value" => Some(element),
        "composite_literal" => element.child_by_field_name("body"),
        _ => None,
    }
}

fn field_names(struct_type: Node, content: &str) -> Vec<String> {
    let mut names = Vec::new();
    for list in named_children(struct_type)
        .into_iter()
        .filter(|child| child.kind() == "field_declaration_list")
    {
        for declaration in named_children(list)
            .into_iter()
            .filter(|child| child.kind() == "field_declaration")
        {
            let mut cursor = declaration.walk();
            let declared = declaration
                .children_by_field_name("name", &mut cursor)
                .map(|name| node_text(name, content).to_owned())
                .collect::<Vec<_>>();
            if declared.is_empty() {
                // Embedded field: named after its type.
                if let Some(ty) = declaration.child_by_field_name("type") {
                    let ty = node_text(ty, content);
                    names.push(ty.rsplit(['.', '*']).next().unwrap_or(ty).to_owned());
                }
            } else {
                names.extend(declared);
            }
        }
    }
    names
}
