use std::path::Path;

use strata_parse::{AiItem, ItemType, Lang, ParseError, ParserDispatcher, ParserOptions};

const GO_SOURCE: &str = "package calc\n\nimport \"fmt\"\n\n// Add sums two ints.\n//\n// It never overflows in tests.\nfunc Add(a, b int) int { return a + b }\n\nfunc (c *Calc) Reset() {\n\tc.total = 0\n}\n\ntype Calc struct {\n\ttotal int\n}\n\nvar _ = fmt.Sprint\n";

const PY_SOURCE: &str = "class Outer:\n    class Inner:\n        def ping(self):\n            return 1\n\n    def pong(self):\n        return 2\n";

const TS_SOURCE: &str = "export function greet(name: string): string {\n  return `hi ${name}`;\n}\n";

fn write(dir: &Path, rel: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

fn without_timestamp(items: Vec<AiItem>) -> Vec<AiItem> {
    items
        .into_iter()
        .map(|mut item| {
            assert!(item.metadata.remove("extractedAt").is_some());
            item
        })
        .collect()
}

fn layout(items: &[AiItem]) -> Vec<(ItemType, String, usize, usize)> {
    items
        .iter()
        .map(|i| (i.item_type, i.name.clone(), i.start_line(), i.end_line()))
        .collect()
}

#[test]
fn dispatcher_parses_mixed_project() {
    let dir = tempfile::tempdir().unwrap();
    let go = write(dir.path(), "pkg/calc.go", GO_SOURCE);
    let py = write(dir.path(), "app/nested.py", PY_SOURCE);
    let ts = write(dir.path(), "web/greet.ts", TS_SOURCE);
    let js = write(dir.path(), "web/legacy.mjs", TS_SOURCE.replace(": string", "").as_str());

    let dispatcher = ParserDispatcher::default();

    let go_items = dispatcher.parse_file(&go, dir.path()).unwrap();
    assert_eq!(
        layout(&go_items),
        vec![
            (ItemType::Function, "Add".into(), 8, 8),
            (ItemType::Method, "Reset".into(), 10, 12),
            (ItemType::Struct, "Calc".into(), 14, 16),
        ]
    );
    assert!(go_items.iter().all(|i| i.file_path == "pkg/calc.go"));
    assert!(go_items.iter().all(|i| i.language == Lang::Go));
    assert_eq!(go_items[0].id, "calc.Add_L8");
    assert_eq!(
        go_items[0].metadata["docComment"],
        "Add sums two ints.\nIt never overflows in tests."
    );

    let py_items = dispatcher.parse_file(&py, dir.path()).unwrap();
    assert_eq!(
        layout(&py_items),
        vec![
            (ItemType::Class, "Outer".into(), 1, 7),
            (ItemType::Class, "Inner".into(), 2, 4),
            (ItemType::Method, "ping".into(), 3, 4),
            (ItemType::Method, "pong".into(), 6, 7),
        ]
    );
    assert_eq!(py_items[2].metadata["className"], "Inner");
    assert_eq!(py_items[3].metadata["className"], "Outer");

    let ts_items = dispatcher.parse_file(&ts, dir.path()).unwrap();
    assert_eq!(ts_items.len(), 1);
    assert_eq!(ts_items[0].language, Lang::TypeScript);

    let js_items = dispatcher.parse_file(&js, dir.path()).unwrap();
    assert_eq!(js_items.len(), 1);
    assert_eq!(js_items[0].language, Lang::JavaScript);
    assert_eq!(js_items[0].file_path, "web/legacy.mjs");
}

#[test]
fn items_start_with_empty_layers() {
    let dir = tempfile::tempdir().unwrap();
    let go = write(dir.path(), "calc.go", GO_SOURCE);
    let items = ParserDispatcher::default().parse_file(&go, dir.path()).unwrap();

    for item in &items {
        assert!(item.l1_deps.is_empty());
        assert!(item.l2_desc.is_none());
        assert!(item.l2_summary.is_none());
        assert!(item.l2_tags.is_none());
        assert!(item.vector.is_none());
        assert_eq!(item.metadata["sourceLength"], item.l0_code.len());
    }
    let stamps: Vec<_> = items.iter().map(|i| i.metadata["extractedAt"].clone()).collect();
    assert!(stamps.windows(2).all(|w| w[0] == w[1]), "one timestamp per file");
}

#[test]
fn reparsing_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = ParserDispatcher::default();
    for (rel, source) in [("a.go", GO_SOURCE), ("b.py", PY_SOURCE), ("c.ts", TS_SOURCE)] {
        let path = write(dir.path(), rel, source);
        let first = without_timestamp(dispatcher.parse_file(&path, dir.path()).unwrap());
        let second = without_timestamp(dispatcher.parse_file(&path, dir.path()).unwrap());
        assert_eq!(first, second, "{rel} parsed differently");
    }
}

#[test]
fn heuristic_mode_keeps_ids_and_spans() {
    let dir = tempfile::tempdir().unwrap();
    let go = write(dir.path(), "calc.go", GO_SOURCE);
    let py = write(dir.path(), "nested.py", PY_SOURCE);

    let ast = ParserDispatcher::new(ParserOptions::default());
    let heuristic = ParserDispatcher::new(ParserOptions { ast: false });
    assert!(!heuristic.parser_for(&go).unwrap().ast_available(&go));

    for path in [&go, &py] {
        let a = ast.parse_file(path, dir.path()).unwrap();
        let h = heuristic.parse_file(path, dir.path()).unwrap();
        assert_eq!(layout(&a), layout(&h), "{}", path.display());
        let ids = |items: &[AiItem]| items.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&h));
    }
}

#[test]
fn unreadable_and_unsupported_files_fail_alone() {
    let dir = tempfile::tempdir().unwrap();
    let notes = write(dir.path(), "notes.md", "# notes\n");
    let dispatcher = ParserDispatcher::default();

    assert!(matches!(
        dispatcher.parse_file(&notes, dir.path()),
        Err(ParseError::UnsupportedExtension { .. })
    ));
    assert!(matches!(
        dispatcher.parse_file(&dir.path().join("gone.go"), dir.path()),
        Err(ParseError::Io { .. })
    ));

    let go = write(dir.path(), "ok.go", GO_SOURCE);
    assert_eq!(dispatcher.parse_file(&go, dir.path()).unwrap().len(), 3);
}
