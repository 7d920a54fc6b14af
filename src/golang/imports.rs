use super::syntax::{language, node_text, string_literal};
use tree_sitter::{Node, Query, QueryCursor};

// Matches both `import "testing"` and specs inside `import ( ... )`.
const IMPORT_SPEC_QUERY: &str = r"
(import_spec
  path: (_) @import.path) @import.spec
";

/// The name under which `package` is visible in the file, or `None` if it is not imported.
///
/// An aliased import (`import tst "testing"`) yields the alias; a plain import yields the last
/// path segment.
pub(crate) fn imported_name(root: Node, content: &str, package: &str) -> Option<String> {
    let query = Query::new(&language(), IMPORT_SPEC_QUERY).ok()?;
    let path_index = query.capture_index_for_name("import.path")?;
    let spec_index = query.capture_index_for_name("import.spec")?;
    let mut cursor = QueryCursor::new();
    for query_match in cursor.matches(&query, root, content.as_bytes()) {
        let capture = |index| {
            query_match
                .captures
                .iter()
                .find(|capture| capture.index == index)
                .map(|capture| capture.node)
        };
        let (Some(path), Some(spec)) = (capture(path_index), capture(spec_index)) else {
            continue;
        };
        if string_literal(path, content).as_deref() != Some(package) {
            continue;
        }
        let name = spec.child_by_field_name("name").map_or_else(
            || package.rsplit('/').next().unwrap_or(package).to_owned(),
            |alias| node_text(alias, content).to_owned(),
        );
        return Some(name);
    }
    None
}
