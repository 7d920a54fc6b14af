use serde::Serialize;
use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
};
use tree_sitter::Point;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Language {
    Golang,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    Debugger,
    TestRunner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Search {
    /// The innermost subtest under the cursor, falling back to the enclosing test
    Nearest,
    /// The top-level test function under the cursor
    Method,
    /// Every test in the file
    File,
    /// Every test in every test file below a directory
    Directory,
}

impl fmt::Display for Search {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Search::Nearest => f.write_str("nearest"),
            Search::Method => f.write_str("method"),
            Search::File => f.write_str("file"),
            Search::Directory => f.write_str("directory"),
        }
    }
}

impl FromStr for Search {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Search::Nearest),
            "method" | "function" => Ok(Search::Method),
            "file" => Ok(Search::File),
            "directory" | "dir" => Ok(Search::Directory),
            _ => Err(format!("unknown search strategy `{s}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CapabilityDetails {
    pub capability: Capability,
    pub search: Search,
    pub description: String,
}

/// Zero-based row and column, as reported by tree-sitter.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CursorPosition {
    pub row: usize,
    pub col: usize,
}

impl CursorPosition {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub(crate) const fn from_point(point: Point) -> Self {
        Self {
            row: point.row,
            col: point.column,
        }
    }

    /// Whether the cursor's row lies within `range`. Columns are ignored.
    #[must_use]
    pub fn in_rows(&self, range: &Range<CursorPosition>) -> bool {
        self.row >= range.start.row && self.row <= range.end.row
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunnableMeta {
    pub package: String,
    pub build_tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Runnable {
    pub name: String,
    /// Name of the framework that found the runnable
    pub framework: &'static str,
    pub filepath: PathBuf,
    pub range: Range<CursorPosition>,
    pub meta: RunnableMeta,
}

impl Runnable {
    /// Number of nested `t.Run` levels below the top-level test.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.name.matches('/').count()
    }
}

pub struct Buffer<'a> {
    pub content: &'a str,
    pub filepath: PathBuf,
    pub position: CursorPosition,
}

impl<'a> Buffer<'a> {
    pub fn new(content: &'a str, filepath: impl AsRef<Path>, position: CursorPosition) -> Self {
        Self {
            content,
            filepath: filepath.as_ref().to_path_buf(),
            position,
        }
    }
}

pub struct Target<'a> {
    pub capability: Capability,
    pub buffer: Buffer<'a>,
    pub search: Search,
}

impl<'a> Target<'a> {
    #[must_use]
    pub fn new(capability: Capability, buffer: Buffer<'a>) -> Self {
        Self {
            capability,
            buffer,
            search: Search::Nearest,
        }
    }

    pub fn override_search_strategy(&mut self, search: Search) {
        self.search = search;
    }
}
