use crate::domain::ast::{AstNode, Location};
use crate::infrastructure::syn_ast::SynNode;
use crate::ports::LocationResolver;

/// Resolves node spans against the single file a translation unit was parsed from.
pub struct SpanLocationResolver {
    file: String,
}

impl SpanLocationResolver {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}

impl<'ast> LocationResolver<SynNode<'ast>> for SpanLocationResolver {
    fn resolve(&self, node: &SynNode<'ast>) -> Option<Location> {
        node.begin().map(|pos| Location {
            file: self.file.clone(),
            line: pos.line,
            column: pos.column,
        })
    }
}
