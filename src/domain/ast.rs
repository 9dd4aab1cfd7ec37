// AST node model for the dump tool.
// The tree itself is owned by the front-end; these types only describe what the
// walker needs to know about one node while it is being visited.

use serde::Serialize;
use std::fmt;

/// The two disjoint node families the walker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Declaration,
    Statement,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Declaration => "Declaration",
            NodeKind::Statement => "Statement",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A 1-based line/column pair inside the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Borrowed handle to one node of an externally owned tree.
///
/// Implementations are cheap to clone (a reference plus a little context) and are
/// dropped as soon as their subtree has been walked.
pub trait AstNode: Sized {
    fn node_kind(&self) -> NodeKind;

    /// Concrete category, e.g. `FunctionDecl` or `IfStmt`.
    fn kind_name(&self) -> &'static str;

    /// Where the node starts, if the front-end knows.
    fn begin(&self) -> Option<Position>;

    /// Synthesized by the front-end rather than written in the source.
    fn is_implicit(&self) -> bool {
        false
    }

    /// Direct children in program order. Empty slots are simply left out.
    fn children(&self) -> Vec<Self>;
}

/// Resolved source coordinates of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// What the walker produces for one visited node. Lives only until the sink has
/// consumed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub depth: usize,
    pub node_kind: NodeKind,
    pub kind_name: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub identifier: String,
    pub location: Option<Location>,
    pub implicit: bool,
}
