// Tree walker: the one traversal shared by every front-end and every sink.

use crate::domain::ast::{AstNode, NodeKind, Record};
use crate::ports::{LocationResolver, RecordSink, SymbolIdentifier};

/// Counts gathered while walking one translation unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub declarations: usize,
    pub statements: usize,
    pub implicit: usize,
    pub unidentified: usize,
    pub max_depth: usize,
}

impl WalkStats {
    pub fn visited(&self) -> usize {
        self.declarations + self.statements
    }
}

pub struct TreeWalker<'a, N> {
    pub locations: &'a dyn LocationResolver<N>,
    pub symbols: &'a dyn SymbolIdentifier<N>,
    pub sink: &'a mut dyn RecordSink,
}

impl<'a, N: AstNode> TreeWalker<'a, N> {
    pub fn new(
        locations: &'a dyn LocationResolver<N>,
        symbols: &'a dyn SymbolIdentifier<N>,
        sink: &'a mut dyn RecordSink,
    ) -> Self {
        Self {
            locations,
            symbols,
            sink,
        }
    }

    /// Walk the whole tree below `root` in pre-order, root at depth 0.
    ///
    /// Only sink errors are returned; lookups that fail for a single node are
    /// replaced by empty values and the walk goes on.
    pub fn traverse(&mut self, root: N) -> std::io::Result<WalkStats> {
        let mut stats = WalkStats::default();
        self.walk(root, 0, &mut stats)?;
        self.sink.finish()?;
        Ok(stats)
    }

    fn walk(&mut self, node: N, depth: usize, stats: &mut WalkStats) -> std::io::Result<()> {
        let record = self.record_for(&node, depth, stats);
        self.sink.emit(&record)?;
        drop(record);

        for child in node.children() {
            self.walk(child, depth + 1, stats)?;
        }
        Ok(())
    }

    fn record_for(&self, node: &N, depth: usize, stats: &mut WalkStats) -> Record {
        let node_kind = node.node_kind();
        let kind_name = node.kind_name();
        stats.max_depth = stats.max_depth.max(depth);

        let (identifier, implicit) = match node_kind {
            NodeKind::Declaration => {
                stats.declarations += 1;
                let identifier = match self.symbols.identify(node) {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::debug!(kind = kind_name, depth, "no symbol identifier: {}", e);
                        stats.unidentified += 1;
                        String::new()
                    }
                };
                let implicit = node.is_implicit();
                if implicit {
                    stats.implicit += 1;
                }
                (identifier, implicit)
            }
            NodeKind::Statement => {
                stats.statements += 1;
                (String::new(), false)
            }
        };

        Record {
            depth,
            node_kind,
            kind_name,
            identifier,
            location: self.locations.resolve(node),
            implicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::{Location, Position};
    use crate::domain::error::SymbolError;
    use std::io;

    /// Minimal owned tree standing in for a front-end AST.
    struct TestTree {
        kind: NodeKind,
        name: &'static str,
        line: Option<usize>,
        implicit: bool,
        children: Vec<TestTree>,
    }

    fn decl(name: &'static str, line: usize, children: Vec<TestTree>) -> TestTree {
        TestTree {
            kind: NodeKind::Declaration,
            name,
            line: Some(line),
            implicit: false,
            children,
        }
    }

    fn stmt(name: &'static str, line: usize, children: Vec<TestTree>) -> TestTree {
        TestTree {
            kind: NodeKind::Statement,
            name,
            line: Some(line),
            implicit: false,
            children,
        }
    }

    impl<'t> AstNode for &'t TestTree {
        fn node_kind(&self) -> NodeKind {
            self.kind
        }

        fn kind_name(&self) -> &'static str {
            self.name
        }

        fn begin(&self) -> Option<Position> {
            self.line.map(|line| Position::new(line, 1))
        }

        fn is_implicit(&self) -> bool {
            self.implicit
        }

        fn children(&self) -> Vec<Self> {
            let tree: &'t TestTree = *self;
            tree.children.iter().collect()
        }
    }

    struct LineResolver;
    impl<'t> LocationResolver<&'t TestTree> for LineResolver {
        fn resolve(&self, node: &&'t TestTree) -> Option<Location> {
            node.begin().map(|pos| Location {
                file: "t.rs".to_string(),
                line: pos.line,
                column: pos.column,
            })
        }
    }

    /// Identifies declarations by kind name, refuses anything called `MacroDecl`.
    struct NameIdentifier;
    impl<'t> SymbolIdentifier<&'t TestTree> for NameIdentifier {
        fn identify(&self, decl: &&'t TestTree) -> Result<String, SymbolError> {
            match decl.kind {
                NodeKind::Statement => Err(SymbolError::NotADeclaration { kind: decl.name }),
                NodeKind::Declaration if decl.name == "MacroDecl" => {
                    Err(SymbolError::Unnamed { kind: decl.name })
                }
                NodeKind::Declaration => Ok(format!("id:{}", decl.name)),
            }
        }
    }

    #[derive(Default)]
    struct Collect(Vec<Record>);
    impl RecordSink for Collect {
        fn emit(&mut self, record: &Record) -> io::Result<()> {
            self.0.push(record.clone());
            Ok(())
        }
    }

    fn walk(tree: &TestTree) -> (Vec<Record>, WalkStats) {
        let mut sink = Collect::default();
        let stats = TreeWalker::new(&LineResolver, &NameIdentifier, &mut sink)
            .traverse(tree)
            .unwrap();
        (sink.0, stats)
    }

    fn sample() -> TestTree {
        // unit
        //   fn
        //     param
        //     if
        //       call
        //         closure
        //           var
        //     return
        //   struct
        //     field
        //   impl (implicit)
        let mut implicit_impl = decl("ImplDecl", 9, vec![]);
        implicit_impl.implicit = true;
        decl(
            "TranslationUnitDecl",
            1,
            vec![
                decl(
                    "FunctionDecl",
                    1,
                    vec![
                        decl("ParamDecl", 1, vec![]),
                        stmt(
                            "IfStmt",
                            2,
                            vec![stmt(
                                "CallExpr",
                                3,
                                vec![stmt("ClosureExpr", 3, vec![decl("VarDecl", 3, vec![])])],
                            )],
                        ),
                        stmt("ReturnStmt", 5, vec![]),
                    ],
                ),
                decl("StructDecl", 7, vec![decl("FieldDecl", 8, vec![])]),
                implicit_impl,
            ],
        )
    }

    #[test]
    fn test_preorder_with_shared_depth() {
        let (records, stats) = walk(&sample());
        let shape: Vec<(usize, &str)> = records.iter().map(|r| (r.depth, r.kind_name)).collect();
        assert_eq!(
            shape,
            vec![
                (0, "TranslationUnitDecl"),
                (1, "FunctionDecl"),
                (2, "ParamDecl"),
                (2, "IfStmt"),
                (3, "CallExpr"),
                (4, "ClosureExpr"),
                (5, "VarDecl"),
                (2, "ReturnStmt"),
                (1, "StructDecl"),
                (2, "FieldDecl"),
                (1, "ImplDecl"),
            ]
        );
        assert_eq!(stats.visited(), 11);
        assert_eq!(stats.declarations, 7);
        assert_eq!(stats.statements, 4);
        assert_eq!(stats.max_depth, 5);
    }

    #[test]
    fn test_depth_never_jumps_more_than_one_level() {
        let (records, _) = walk(&sample());
        for pair in records.windows(2) {
            assert!(pair[1].depth <= pair[0].depth + 1, "{:?}", pair);
        }
        assert_eq!(records[0].depth, 0);
        assert!(records[1..].iter().all(|r| r.depth > 0));
    }

    #[test]
    fn test_statements_carry_no_identifier_or_marker() {
        let (records, _) = walk(&sample());
        for r in records.iter().filter(|r| r.node_kind == NodeKind::Statement) {
            assert!(r.identifier.is_empty());
            assert!(!r.implicit);
        }
        for r in records.iter().filter(|r| r.node_kind == NodeKind::Declaration) {
            assert_eq!(r.identifier, format!("id:{}", r.kind_name));
        }
    }

    #[test]
    fn test_implicit_nodes_are_reported() {
        let (records, stats) = walk(&sample());
        let implicit: Vec<&Record> = records.iter().filter(|r| r.implicit).collect();
        assert_eq!(implicit.len(), 1);
        assert_eq!(implicit[0].kind_name, "ImplDecl");
        assert_eq!(stats.implicit, 1);
    }

    #[test]
    fn test_failed_identifier_becomes_empty() {
        let tree = decl(
            "TranslationUnitDecl",
            1,
            vec![decl("MacroDecl", 2, vec![]), decl("ConstDecl", 3, vec![])],
        );
        let (records, stats) = walk(&tree);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].identifier, "");
        assert_eq!(records[2].identifier, "id:ConstDecl");
        assert_eq!(stats.unidentified, 1);
    }

    #[test]
    fn test_missing_position_is_absent_location() {
        let mut root = decl("TranslationUnitDecl", 1, vec![]);
        root.line = None;
        let (records, _) = walk(&root);
        assert_eq!(records[0].location, None);
    }

    #[test]
    fn test_sink_error_stops_walk() {
        struct FailAfter(usize);
        impl RecordSink for FailAfter {
            fn emit(&mut self, _record: &Record) -> io::Result<()> {
                if self.0 == 0 {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
                }
                self.0 -= 1;
                Ok(())
            }
        }

        let tree = sample();
        let mut sink = FailAfter(3);
        let err = TreeWalker::new(&LineResolver, &NameIdentifier, &mut sink)
            .traverse(&tree)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
