use super::syntax::{named_children, node_text};
use crate::types::CursorPosition;
use tree_sitter::Node;

/// A top-level `func TestXxx(t *testing.T)`.
pub(crate) struct TestFunction<'tree> {
    pub(crate) name: String,
    pub(crate) node: Node<'tree>,
}

/// Go's rule: `Test` followed by nothing or by a character that is not a lowercase letter.
pub(crate) fn is_test_name(name: &str) -> bool {
    name.strip_prefix("Test")
        .is_some_and(|rest| !rest.chars().next().is_some_and(char::is_lowercase))
}

/// Every test function declared at the top level, in source order.
///
/// `testing_name` is the name `testing` is imported under.
pub(crate) fn test_functions<'tree>(
    root: Node<'tree>,
    content: &str,
    testing_name: &str,
) -> Vec<TestFunction<'tree>> {
    named_children(root)
        .into_iter()
        .filter(|node| node.kind() == "function_declaration")
        .filter_map(|node| {
            let name = node_text(node.child_by_field_name("name")?, content);
            if !is_test_name(name) || !takes_testing_t(node, content, testing_name) {
                return None;
            }
            Some(TestFunction {
                name: name.to_owned(),
                node,
            })
        })
        .collect()
}

/// The test function whose rows contain `position`.
pub(crate) fn test_at<'tree>(
    root: Node<'tree>,
    content: &str,
    testing_name: &str,
    position: CursorPosition,
) -> Option<TestFunction<'tree>> {
    test_functions(root, content, testing_name)
        .into_iter()
        .find(|function| {
            function.node.start_position().row <= position.row
                && position.row <= function.node.end_position().row
        })
}

fn takes_testing_t(function: Node, content: &str, testing_name: &str) -> bool {
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return false;
    };
    named_children(parameters)
        .into_iter()
        .filter(|parameter| parameter.kind() == "parameter_declaration")
        .filter_map(|parameter| parameter.child_by_field_name("type"))
        .any(|ty| is_pointer_to(ty, content, testing_name, "T"))
}

fn is_pointer_to(ty: Node, content: &str, package: &str, name: &str) -> bool {
    if ty.kind() != "pointer_type" {
        return false;
    }
    let Some(pointee) = named_children(ty).into_iter().next() else {
        return false;
    };
    pointee.kind() == "qualified_type"
        && pointee
            .child_by_field_name("package")
            .is_some_and(|node| node_text(node, content) == package)
        && pointee
            .child_by_field_name("name")
            .is_some_and(|node| node_text(node, content) == name)
}
