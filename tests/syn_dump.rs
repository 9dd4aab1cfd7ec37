use ast_dump_tool::infrastructure::{dump_unit, make_sink, OutputFormat, SourceUnit};
use ast_dump_tool::ports::{RecordFilter, TextSerializer};

fn dump(unit: &SourceUnit) -> String {
    let mut out = Vec::new();
    {
        let mut sink = make_sink(OutputFormat::Text, RecordFilter::default(), &mut out);
        dump_unit(unit, &mut *sink).expect("dump should succeed");
    }
    String::from_utf8(out).unwrap()
}

fn dump_source(path: &str, source: &str) -> String {
    dump(&SourceUnit::new(path, source))
}

fn depth_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

#[test]
fn free_function_with_return() {
    let text = dump_source("answer.rs", "fn answer() -> i32 {\n    return 0;\n}\n");
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "TranslationUnitDecl rs: (answer.rs:1:1)");
    assert_eq!(lines[1], " FunctionDecl rs:@F@answer (answer.rs:1:1)");
    assert_eq!(lines[2], "  ReturnStmt (answer.rs:2:5)");
    assert_eq!(lines[3], "   LitExpr (answer.rs:2:12)");
    assert_eq!(lines.len(), 4);
    assert!(!text.contains("(implicit)"));
    assert!(text.ends_with('\n'));
}

#[test]
fn derives_are_dumped_as_implicit_impls() {
    let source = "#[derive(Debug, Clone)]\npub struct Pair<T> {\n    pub a: T,\n}\n";
    let text = dump_source("pair.rs", source);
    assert_eq!(
        text,
        "TranslationUnitDecl rs: (pair.rs:1:1)\n\
         \x20StructDecl rs:@S@Pair (pair.rs:2:1)\n\
         \x20\x20TypeParamDecl rs:@S@Pair@TP@T (pair.rs:2:17)\n\
         \x20\x20FieldDecl rs:@S@Pair@FI@a (pair.rs:3:5)\n\
         \x20ImplDecl rs:@I@Debug>Pair<T> (pair.rs:1:10) (implicit)\n\
         \x20ImplDecl rs:@I@Clone>Pair<T> (pair.rs:1:17) (implicit)\n"
    );
}

#[test]
fn anonymous_macro_keeps_empty_identifier_slot() {
    let text = dump_source("m.rs", "thread_local! { static X: u8 = 0; }\n");
    assert!(text.contains("\n MacroDecl  (m.rs:1:1)\n"), "{}", text);
}

#[test]
fn depths_follow_nesting() {
    let source = r#"
pub mod geo {
    pub struct Point { pub x: f64 }

    impl Point {
        pub fn shifted(&self, by: f64) -> f64 {
            let moved = |d: f64| d + by;
            if by > 0.0 {
                return moved(self.x);
            }
            self.x
        }
    }
}
"#;
    let text = dump_source("geo.rs", source);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(depth_of(lines[0]), 0);
    assert!(lines[1..].iter().all(|l| depth_of(l) > 0));
    for pair in lines.windows(2) {
        assert!(depth_of(pair[1]) <= depth_of(pair[0]) + 1, "{:?}", pair);
    }

    let find = |needle: &str| {
        lines
            .iter()
            .find(|l| l.trim_start().starts_with(needle))
            .map(|l| depth_of(l))
            .unwrap_or_else(|| panic!("no line starting with {needle}"))
    };
    assert_eq!(find("ModuleDecl"), 1);
    assert_eq!(find("ImplDecl"), 2);
    assert_eq!(find("MethodDecl"), 3);
    assert_eq!(find("SelfParamDecl"), 4);
    assert_eq!(find("LetStmt"), 4);
    assert_eq!(find("IfStmt"), 4);
    assert_eq!(find("ReturnStmt"), 5);
}

#[test]
fn statements_carry_no_identifier() {
    let text = dump_source("s.rs", "fn f(x: u8) -> u8 { let y = x; y }\n");
    for line in text.lines() {
        let kind = line.trim_start().split(' ').next().unwrap();
        if kind.ends_with("Stmt") || kind.ends_with("Expr") {
            let rest = &line.trim_start()[kind.len()..];
            assert!(rest.starts_with(" ("), "{}", line);
        } else {
            assert!(line.contains(" rs:"), "{}", line);
        }
    }
}

#[test]
fn output_is_deterministic() {
    let source = "#[derive(Default)]\nstruct S { a: u8 }\nfn f() { for i in 0..3 { let _ = i; } }\n";
    let first = dump_source("d.rs", source);
    for _ in 0..5 {
        assert_eq!(dump_source("d.rs", source), first);
    }
}

#[test]
fn identifiers_do_not_depend_on_position() {
    let a = dump(&SourceUnit::new("a.rs", "pub struct Point { x: f64 }\n").with_crate("shapes"));
    let b = dump(
        &SourceUnit::new("b.rs", "\n\n// moved\nfn other() {}\n\n    pub struct Point {\n        x: f64,\n    }\n")
            .with_crate("shapes"),
    );

    let id_of = |text: &str, kind: &str| -> String {
        text.lines()
            .map(str::trim_start)
            .find(|l| l.starts_with(kind))
            .and_then(|l| l.split(' ').nth(1))
            .unwrap()
            .to_string()
    };
    assert_eq!(id_of(&a, "StructDecl"), "rs:@CR@shapes@S@Point");
    assert_eq!(id_of(&a, "StructDecl"), id_of(&b, "StructDecl"));
    assert_eq!(id_of(&a, "FieldDecl"), id_of(&b, "FieldDecl"));
}

#[test]
fn parse_failure_emits_nothing() {
    let mut sink = TextSerializer::new(Vec::new());
    let err = dump_unit(&SourceUnit::new("broken.rs", "struct {"), &mut sink).unwrap_err();
    assert!(err.to_string().starts_with("broken.rs:1:"), "{}", err);
    assert!(sink.into_inner().is_empty());
}
