mod build_tags;
mod functions;
mod imports;
mod subtests;
mod syntax;

use crate::{
    Error, Result,
    command::{TestCommand, build_go_test_command},
    config::Config,
    framework::{Framework, FrameworkProvider},
    types::{Capability, CapabilityDetails, Language, Runnable, RunnableMeta, Search, Target},
};
use functions::{TestFunction, test_at, test_functions};
use log::debug;
use std::collections::HashSet;
use subtests::{node_range, subtests};
use syntax::{named_children, node_text, parse_tree};
use tree_sitter::Node;

const NAME: &str = "gotest";
const FILE_SUFFIX: &str = "_test.go";
const TESTING_PACKAGE: &str = "testing";

pub struct GotestProvider {
    capabilities: HashSet<CapabilityDetails>,
}

impl Default for GotestProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GotestProvider {
    #[must_use]
    pub fn new() -> Self {
        let capabilities = [
            (Search::Nearest, "Test Nearest"),
            (Search::Method, "Test Function"),
            (Search::File, "Test File"),
        ]
        .into_iter()
        .map(|(search, description)| CapabilityDetails {
            capability: Capability::TestRunner,
            search,
            description: description.to_owned(),
        })
        .collect();
        Self { capabilities }
    }
}

impl FrameworkProvider for GotestProvider {
    fn create(&self) -> Box<dyn Framework> {
        Box::new(GotestProvider::new())
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn language(&self) -> Language {
        Language::Golang
    }

    fn capability(&self) -> Capability {
        Capability::TestRunner
    }
}

impl Framework for GotestProvider {
    fn detect(&self, target: &Target) -> bool {
        if target.capability != self.capability() {
            return false;
        }
        if !target
            .buffer
            .filepath
            .to_string_lossy()
            .ends_with(FILE_SUFFIX)
        {
            return false;
        }
        let Ok(tree) = parse_tree(target.buffer.content) else {
            return false;
        };
        imports::imported_name(tree.root_node(), target.buffer.content, TESTING_PACKAGE).is_some()
    }

    fn runnables(&self, target: &Target) -> Result<Vec<Runnable>> {
        let content = target.buffer.content;
        let tree = parse_tree(content)?;
        let root = tree.root_node();
        let testing_name = imports::imported_name(root, content, TESTING_PACKAGE)
            .unwrap_or_else(|| TESTING_PACKAGE.to_owned());
        let meta = RunnableMeta {
            package: package_name(root, content).unwrap_or_default(),
            build_tags: build_tags::build_tags(root, content).unwrap_or_default(),
        };
        let runnable = |function: &TestFunction| Runnable {
            name: function.name.clone(),
            framework: NAME,
            filepath: target.buffer.filepath.clone(),
            range: node_range(function.node),
            meta: meta.clone(),
        };

        let position = target.buffer.position;
        let runnables = match target.search {
            Search::File | Search::Directory => {
                let functions = test_functions(root, content, &testing_name);
                if functions.is_empty() {
                    return Err(Error::NotFound(String::from(
                        "Go Test Function not found no tests in this file",
                    )));
                }
                let mut runnables = Vec::new();
                for function in &functions {
                    let parent = runnable(function);
                    let children = subtests(function.node, content, &parent);
                    if children.is_empty() {
                        runnables.push(parent);
                    } else {
                        runnables.extend(children);
                    }
                }
                runnables
            }
            Search::Method => {
                let function = test_at(root, content, &testing_name, position).ok_or_else(|| {
                    Error::NotFound(String::from("Go Test Function not found at position"))
                })?;
                vec![runnable(&function)]
            }
            Search::Nearest => {
                let function = test_at(root, content, &testing_name, position).ok_or_else(|| {
                    Error::NotFound(String::from("Go Test Function not found at position"))
                })?;
                let parent = runnable(&function);
                let nearest = subtests(function.node, content, &parent)
                    .into_iter()
                    .filter(|subtest| position.in_rows(&subtest.range))
                    .max_by(|left, right| {
                        left.depth()
                            .cmp(&right.depth())
                            .then_with(|| row_span(right).cmp(&row_span(left)))
                    });
                vec![nearest.unwrap_or(parent)]
            }
        };
        debug!(
            "{}: {} runnable(s) for {} search",
            target.buffer.filepath.display(),
            runnables.len(),
            target.search
        );
        Ok(runnables)
    }

    fn generate_command(&self, runnable: &Runnable, config: &Config) -> TestCommand {
        let mut tags: Vec<String> = Vec::new();
        let file_tags = runnable
            .meta
            .build_tags
            .first()
            .map(|alternative| alternative.split_whitespace().map(ToOwned::to_owned));
        for tag in file_tags
            .into_iter()
            .flatten()
            .chain(config.extra_tags.iter().cloned())
        {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        let command = build_go_test_command(
            &config.go_program,
            config.verbose,
            &runnable.name,
            &runnable.filepath,
            &tags,
        );
        debug!("{}: {command}", runnable.name);
        command
    }

    fn capabilities(&self) -> &HashSet<CapabilityDetails> {
        &self.capabilities
    }
}

fn package_name(root: Node, content: &str) -> Option<String> {
    let clause = named_children(root)
        .into_iter()
        .find(|child| child.kind() == "package_clause")?;
    let identifier = named_children(clause).into_iter().next()?;
    Some(node_text(identifier, content).to_owned())
}

fn row_span(runnable: &Runnable) -> usize {
    runnable.range.end.row - runnable.range.start.row
}

#[cfg(test)]
mod test {
    use super::GotestProvider;
    use crate::{
        Error,
        config::Config,
        framework::Framework,
        types::{Buffer, Capability, CursorPosition, Search, Target},
    };
    use std::path::Path;

    fn runnable_names(content: &str, search: Search, row: usize) -> Vec<String> {
        let buffer = Buffer::new(content, "run_test.go", CursorPosition::new(row, 3));
        let mut target = Target::new(Capability::TestRunner, buffer);
        target.override_search_strategy(search);
        GotestProvider::new()
            .runnables(&target)
            .unwrap()
            .into_iter()
            .map(|runnable| runnable.name)
            .collect()
    }

    fn assert_cases(content: &str, cases: &[(Search, usize, &[&str])]) {
        for &(search, row, expected) in cases {
            assert_eq!(
                expected,
                runnable_names(content, search, row),
                "{search} search at row {row}"
            );
        }
    }

    const NO_TESTS: &str = r#"
        package golang

        func sample_add(a, b int) int {
          return a + b
        }
        "#;

    #[test]
    fn test_not_found() {
        let buffer = Buffer::new(NO_TESTS, "sample_test.go", CursorPosition::new(3, 3));
        let mut target = Target::new(Capability::TestRunner, buffer);
        target.override_search_strategy(Search::Method);
        let res = GotestProvider::new().runnables(&target);
        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_cursor_position_not_in_content() {
        let buffer = Buffer::new(NO_TESTS, "sample_test.go", CursorPosition::new(10, 3));
        let mut target = Target::new(Capability::TestRunner, buffer);
        target.override_search_strategy(Search::Method);
        let res = GotestProvider::new().runnables(&target);
        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[test]
    fn file_without_tests_is_not_found() {
        let buffer = Buffer::new(NO_TESTS, "sample_test.go", CursorPosition::default());
        let mut target = Target::new(Capability::TestRunner, buffer);
        target.override_search_strategy(Search::File);
        let res = GotestProvider::new().runnables(&target);
        assert!(matches!(res, Err(Error::NotFound(_))));
    }

    #[test]
    fn get_sub_test_string_literal() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestSample(t *testing.T) {
            t.Run("case_a", func(t *testing.T){
              assert.Equal(t, 1, sample_add(1, 0))
            })
            t.Run("case_b", func(t *testing.T){
              assert.Equal(t, 2, sample_add(1, 2))
            })
        }
        "#;
        assert_cases(
            content,
            &[
                (
                    Search::File,
                    16,
                    &["TestSample/case_a", "TestSample/case_b"],
                ),
                (Search::Method, 16, &["TestSample"]),
                (Search::Nearest, 16, &["TestSample/case_b"]),
                (Search::Nearest, 13, &["TestSample/case_a"]),
                (Search::Nearest, 12, &["TestSample"]),
            ],
        );
    }

    #[test]
    fn get_sub_test_string_literal_no_subtest() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestSample(t *testing.T) {
           assert.Equal(t, 1, sample_add(1, 0))
           assert.Equal(t, 2, sample_add(1, 2))
        }
        "#;
        assert_cases(content, &[(Search::Nearest, 13, &["TestSample"])]);
    }

    #[test]
    fn nested_string_literal_subtests() {
        let content = r#"
        package golang
        import "testing"

        func TestOuter(t *testing.T) {
          t.Run("outer", func(t *testing.T) {
            t.Run("inner a", func(t *testing.T) {
              t.Log("a")
            })
            t.Run("inner b", func(t *testing.T) {
              t.Log("b")
            })
          })
        }
        "#;
        assert_cases(
            content,
            &[
                (
                    Search::File,
                    0,
                    &[
                        "TestOuter/outer",
                        "TestOuter/outer/inner a",
                        "TestOuter/outer/inner b",
                    ],
                ),
                (Search::Nearest, 5, &["TestOuter/outer"]),
                (Search::Nearest, 7, &["TestOuter/outer/inner a"]),
                (Search::Nearest, 10, &["TestOuter/outer/inner b"]),
            ],
        );
    }

    #[test]
    fn get_in_loop_with_unnamed_subtests() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestInLoopWithUnnamedSubtest(t *testing.T) {
          for _, tt := range []struct {
            description string
            a           int
            b           int
            expected    int
          }{
            {
              "base case",
              0,
              3,
              3,
            },
            {
              "case 1",
              1,
              3,
              4,
            },
          } {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestInLoopWithUnnamedSubtest/base case";
        let case_1 = "TestInLoopWithUnnamedSubtest/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (Search::Method, 19, &["TestInLoopWithUnnamedSubtest"]),
                (Search::Nearest, 19, &[base]),
                (Search::Nearest, 20, &[base]),
                (Search::Nearest, 24, &[base]),
                (Search::Nearest, 25, &[case_1]),
                (Search::Nearest, 30, &[case_1]),
            ],
        );
    }

    #[test]
    fn get_in_loop_with_named_subtests() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestInLoopWithNamedSubtest(t *testing.T) {
          for _, tt := range []struct {
            description string
            a           int
            b           int
            expected    int
          }{
            {
              description: "base case",
              a:           0,
              b:           3,
              expected:    3,
            },
            {
              description: "case 1",
              a:           1,
              b:           3,
              expected:    4,
            },
          } {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestInLoopWithNamedSubtest/base case";
        let case_1 = "TestInLoopWithNamedSubtest/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (Search::Method, 19, &["TestInLoopWithNamedSubtest"]),
                (Search::Nearest, 19, &[base]),
                (Search::Nearest, 20, &[base]),
                (Search::Nearest, 24, &[base]),
                (Search::Nearest, 25, &[case_1]),
                (Search::Nearest, 30, &[case_1]),
                (Search::Nearest, 33, &["TestInLoopWithNamedSubtest"]),
            ],
        );
    }

    #[test]
    fn get_in_loop_typed_subcase_with_unnamed_case_fields() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestGetInLoopTypedSubcaseWithUnnamedCaseFields(t *testing.T) {
          type Scenario struct {
            description string
            a           int
            b           int
            expected    int
          }
          for _, tt := range []Scenario{
            {
              "base case",
              0,
              3,
              3,
            },
            {
              "case 1",
              1,
              3,
              4,
            },
          } {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestGetInLoopTypedSubcaseWithUnnamedCaseFields/base case";
        let case_1 = "TestGetInLoopTypedSubcaseWithUnnamedCaseFields/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (
                    Search::Method,
                    20,
                    &["TestGetInLoopTypedSubcaseWithUnnamedCaseFields"],
                ),
                (Search::Nearest, 20, &[base]),
                (Search::Nearest, 21, &[base]),
                (Search::Nearest, 25, &[base]),
                (Search::Nearest, 26, &[case_1]),
                (Search::Nearest, 31, &[case_1]),
            ],
        );
    }

    #[test]
    fn get_in_loop_typed_subcase_with_named_case_fields() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestGetInLoopTypedSubcaseWithNamedCaseFields(t *testing.T) {
          type Scenario struct {
              description string
                a			int
                b			int
                expected	int
            }

          for _, tt := range []Scenario{
            {
              description: "base case",
              a:          0,
              b:          3,
              c:          3,
            },
            {
              description: "case 1",
              a:           1,
              b:           3,
              expected:    4,
            },
          }  {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestGetInLoopTypedSubcaseWithNamedCaseFields/base case";
        let case_1 = "TestGetInLoopTypedSubcaseWithNamedCaseFields/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (
                    Search::Method,
                    21,
                    &["TestGetInLoopTypedSubcaseWithNamedCaseFields"],
                ),
                (Search::Nearest, 21, &[base]),
                (Search::Nearest, 22, &[base]),
                (Search::Nearest, 26, &[base]),
                (Search::Nearest, 27, &[case_1]),
                (Search::Nearest, 32, &[case_1]),
            ],
        );
    }

    #[test]
    fn get_out_of_loop_named_subtests() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestGetOutOfLoopNamedSubtests(t *testing.T) {
          scenarios := []struct {
            description string
            a           int
            b           int
            expected    int
          }{
            {
              description: 	"base case",
              a: 				0,
              b: 				3,
              expected:		3,
            },
            {
              description: "case 1",
              a:           1,
              b:           3,
              expected:    4,
            },
          }

          for _, tt := range scenarios {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestGetOutOfLoopNamedSubtests/base case";
        let case_1 = "TestGetOutOfLoopNamedSubtests/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (Search::Method, 19, &["TestGetOutOfLoopNamedSubtests"]),
                (Search::Nearest, 19, &[base]),
                (Search::Nearest, 20, &[base]),
                (Search::Nearest, 24, &[base]),
                (Search::Nearest, 26, &[case_1]),
                (Search::Nearest, 30, &[case_1]),
            ],
        );
    }

    #[test]
    fn get_out_of_loop_unnamed_subtests() {
        let content = r#"
        package golang
        import (
          "testing"

          "github.com/stretchr/testify/assert"
        )

        func sample_add(a, b int) int {
          return a + b
        }

        func TestGetOutOfLoopUnNamedSubtests(t *testing.T) {
          scenarios := []struct {
            description string
            a           int
            b           int
            expected    int
          }{
            {
              "base case",
              0,
              3,
              3,
            },
            {
              "case 1",
              1,
              3,
              4,
            },
          }

          for _, tt := range scenarios {
            t.Run(tt.description, func(t *testing.T) {
              actual := sample_add(tt.a, tt.b)
              assert.Equal(t, tt.expected, actual)
            })
          }
        }
        "#;
        let base = "TestGetOutOfLoopUnNamedSubtests/base case";
        let case_1 = "TestGetOutOfLoopUnNamedSubtests/case 1";
        assert_cases(
            content,
            &[
                (Search::File, 19, &[base, case_1]),
                (Search::Method, 19, &["TestGetOutOfLoopUnNamedSubtests"]),
                (Search::Nearest, 20, &[base]),
                (Search::Nearest, 24, &[base]),
                (Search::Nearest, 26, &[case_1]),
                (Search::Nearest, 30, &[case_1]),
            ],
        );
    }

    #[test]
    fn map_driven_subtests() {
        let content = r#"
        package golang
        import "testing"

        func TestMapCases(t *testing.T) {
          cases := map[string]struct {
            a, b, expected int
          }{
            "zero": {0, 3, 3},
            "one":  {1, 3, 4},
          }
          for name, tc := range cases {
            t.Run(name, func(t *testing.T) {
              if tc.a+tc.b != tc.expected {
                t.Fail()
              }
            })
          }
        }
        "#;
        assert_cases(
            content,
            &[
                (Search::File, 0, &["TestMapCases/zero", "TestMapCases/one"]),
                (Search::Nearest, 9, &["TestMapCases/one"]),
                (Search::Nearest, 12, &["TestMapCases"]),
            ],
        );
    }

    #[test]
    fn file_level_table_with_multi_name_fields() {
        let content = r#"
        package golang
        import "testing"

        type scenario struct {
          a, b     int
          name     string
          expected int
        }

        var scenarios = []scenario{
          {0, 3, "base case", 3},
          {1, 3, "case 1", 4},
        }

        func TestFileLevelTable(t *testing.T) {
          for _, tt := range scenarios {
            t.Run(tt.name, func(t *testing.T) {
              if tt.a+tt.b != tt.expected {
                t.Fail()
              }
            })
          }
        }
        "#;
        assert_cases(
            content,
            &[(
                Search::File,
                0,
                &["TestFileLevelTable/base case", "TestFileLevelTable/case 1"],
            )],
        );
    }

    #[test]
    fn escaped_subtest_names_are_decoded() {
        let content = r#"
        package golang
        import "testing"

        func TestQuoted(t *testing.T) {
          t.Run("say \"hi\"", func(t *testing.T) {})
        }
        "#;
        assert_cases(content, &[(Search::Nearest, 5, &[r#"TestQuoted/say "hi""#])]);
    }

    #[test]
    fn table_variables_do_not_leak_between_tests() {
        let content = r#"
        package golang
        import "testing"

        func makeCases() []struct{ name string } {
          return nil
        }

        func TestA(t *testing.T) {
          tests := []struct{ name string }{{name: "from A"}}
          for _, tt := range tests {
            t.Run(tt.name, func(t *testing.T) {})
          }
        }

        func TestB(t *testing.T) {
          tests := makeCases()
          for _, tt := range tests {
            t.Run(tt.name, func(t *testing.T) {})
          }
        }
        "#;
        assert_cases(content, &[(Search::File, 0, &["TestA/from A", "TestB"])]);
    }

    #[test]
    fn local_table_shadows_file_level_table() {
        let content = r#"
        package golang
        import "testing"

        var tests = []struct{ name string }{{name: "file level"}}

        func TestShadowed(t *testing.T) {
          tests := []struct{ name string }{{name: "local"}}
          for _, tt := range tests {
            t.Run(tt.name, func(t *testing.T) {})
          }
        }

        func TestFileLevel(t *testing.T) {
          for _, tt := range tests {
            t.Run(tt.name, func(t *testing.T) {})
          }
        }
        "#;
        assert_cases(
            content,
            &[(
                Search::File,
                0,
                &["TestShadowed/local", "TestFileLevel/file level"],
            )],
        );
    }

    #[test]
    fn file_search_mixes_plain_tests_and_subtests() {
        let content = r#"
        package golang
        import "testing"

        func TestPlain(t *testing.T) {}

        func TestWithSubtest(t *testing.T) {
          t.Run("only", func(t *testing.T) {})
        }
        "#;
        assert_cases(
            content,
            &[(
                Search::File,
                0,
                &["TestPlain", "TestWithSubtest/only"],
            )],
        );
    }

    #[test]
    fn runnables_carry_package_and_build_tags() {
        let content = "//go:build unix && postgres\n\npackage adder\n\nimport \"testing\"\n\nfunc TestAdd(t *testing.T) {}\n";
        let buffer = Buffer::new(content, "pkg/adder/add_test.go", CursorPosition::new(6, 0));
        let target = Target::new(Capability::TestRunner, buffer);
        let provider = GotestProvider::new();
        let runnables = provider.runnables(&target).unwrap();
        let [runnable] = &runnables[..] else {
            panic!("expected one runnable: {runnables:?}");
        };
        assert_eq!("adder", runnable.meta.package);
        assert_eq!(vec!["unix postgres"], runnable.meta.build_tags);

        let config = Config {
            extra_tags: vec![String::from("postgres"), String::from("integration")],
            ..Config::default()
        };
        let command = provider.generate_command(runnable, &config);
        assert_eq!(Path::new("pkg/adder"), command.dir);
        assert_eq!(
            "go test -v -run ^TestAdd$ -tags=unix,postgres,integration .",
            command.to_string()
        );
    }

    #[test]
    fn detect_requires_test_suffix_and_testing_import() {
        let with_testing = "package golang\n\nimport \"testing\"\n";
        let provider = GotestProvider::new();
        for (content, path, capability, expected) in [
            (with_testing, "sample_test.go", Capability::TestRunner, true),
            (with_testing, "sample.go", Capability::TestRunner, false),
            (with_testing, "sample_test.go", Capability::Debugger, false),
            (NO_TESTS, "sample_test.go", Capability::TestRunner, false),
        ] {
            let buffer = Buffer::new(content, path, CursorPosition::default());
            let target = Target::new(capability, buffer);
            assert_eq!(expected, provider.detect(&target), "{path} {capability:?}");
        }
    }

    #[test]
    fn aliased_testing_import() {
        let content = r#"
        package golang
        import tst "testing"

        func TestAliased(x *tst.T) {}
        "#;
        assert_cases(content, &[(Search::Nearest, 4, &["TestAliased"])]);
    }

    #[test]
    fn capabilities() {
        let provider = GotestProvider::new();
        for (description, expected) in [
            ("Test Nearest", Some(Search::Nearest)),
            ("Test Function", Some(Search::Method)),
            ("Test File", Some(Search::File)),
            ("Test Directory", None),
        ] {
            let actual = provider
                .search_for_capability(description)
                .map(|details| details.search);
            assert_eq!(expected, actual, "{description}");
        }
        assert_eq!(3, provider.capabilities().len());
        assert!(!provider.supports(Search::Directory));
    }
}
