//! Module lookup, cycle handling and wildcard policies.

mod common;

use coiler::config::{BuildOptions, WildcardPolicy};
use coiler::diagnostics::CoilError;
use coiler::graph::CyclePolicy;
use coiler::lookup::{SearchMode, StaticSearchPaths};

use common::{combine_with, entry, project, write_files};

fn headers(source: &str) -> Vec<&str> {
    source.lines().filter(|l| l.starts_with("# coiler:")).collect()
}

#[test]
fn entry_directory_wins_over_extra_paths() {
    let dir = project(&[
        ("main.py", "import util\nprint(util.WHERE)\n"),
        ("util.py", "WHERE = \"entry\"\n"),
        ("lib/util.py", "WHERE = \"lib\"\n"),
        ("lib/extra.py", "X = 1\n"),
    ]);
    let options = BuildOptions { paths: vec![dir.path().join("lib")], ..Default::default() };
    let combined = combine_with(&dir, &options).unwrap();
    assert!(combined.source.contains("util__WHERE = \"entry\"\n"));
    assert!(!combined.source.contains("\"lib\""));
}

#[test]
fn extra_paths_are_searched() {
    let dir = project(&[
        ("app/main.py", "import extra\nprint(extra.X)\n"),
        ("lib/extra.py", "X = 1\n"),
    ]);
    let options = BuildOptions { paths: vec![dir.path().join("lib")], ..Default::default() };
    let combined = coiler::combine_with_provider(
        &dir.path().join("app/main.py"),
        &options,
        &StaticSearchPaths::default(),
    ).unwrap();
    assert_eq!(headers(&combined.source), vec!["# coiler: extra (extra.py)", "# coiler: main (main.py)"]);
}

#[test]
fn local_mode_ignores_system_paths() {
    let dir = project(&[("main.py", "import sitelib\n")]);
    let site = tempfile::tempdir().unwrap();
    write_files(site.path(), &[("sitelib.py", "Y = 2\n")]);

    let provider = StaticSearchPaths(vec![site.path().to_path_buf()]);
    let local = coiler::combine_with_provider(&entry(&dir), &BuildOptions::default(), &provider).unwrap();
    assert!(local.source.starts_with("import sitelib\n"));

    let options = BuildOptions { mode: SearchMode::All, ..Default::default() };
    let all = coiler::combine_with_provider(&entry(&dir), &options, &provider).unwrap();
    assert!(all.source.contains("# coiler: sitelib (sitelib.py)\nsitelib__Y = 2\n"));
    assert_eq!(all.context.externals().count(), 0);
}

#[test]
fn local_modules_shadow_system_modules() {
    let dir = project(&[("main.py", "import shared\n"), ("shared.py", "ORIGIN = 1\n")]);
    let site = tempfile::tempdir().unwrap();
    write_files(site.path(), &[("shared.py", "ORIGIN = 2\n")]);

    let options = BuildOptions { mode: SearchMode::All, ..Default::default() };
    let provider = StaticSearchPaths(vec![site.path().to_path_buf()]);
    let combined = coiler::combine_with_provider(&entry(&dir), &options, &provider).unwrap();
    assert!(combined.source.contains("shared__ORIGIN = 1\n"));
}

#[test]
fn archives_and_metadata_are_not_searched() {
    let dir = project(&[("main.py", "import eggmod\nimport meta\n")]);
    let site = tempfile::tempdir().unwrap();
    write_files(site.path(), &[
        ("thing.egg/eggmod.py", "A = 1\n"),
        ("meta.dist-info/__init__.py", "B = 1\n"),
    ]);

    let options = BuildOptions { mode: SearchMode::All, ..Default::default() };
    let provider = StaticSearchPaths(vec![site.path().to_path_buf(), site.path().join("thing.egg")]);
    let combined = coiler::combine_with_provider(&entry(&dir), &options, &provider).unwrap();
    assert_eq!(combined.context.externals().collect::<Vec<_>>(), vec!["eggmod", "meta"]);
}

#[test]
fn missing_search_directory_is_skipped() {
    let dir = project(&[("main.py", "x = 1\n")]);
    let options = BuildOptions { mode: SearchMode::All, ..Default::default() };
    let provider = StaticSearchPaths(vec![dir.path().join("does-not-exist")]);
    let combined = coiler::combine_with_provider(&entry(&dir), &options, &provider).unwrap();
    assert_eq!(combined.context.graph.len(), 1);
}

#[test]
fn circular_import_is_rejected_by_default() {
    let dir = project(&[
        ("main.py", "import a\n"),
        ("a.py", "import b\nA = 1\n"),
        ("b.py", "import a\nB = 2\n"),
    ]);
    let err = combine_with(&dir, &BuildOptions::default()).unwrap_err();
    match err {
        CoilError::CircularImport { chain } => assert_eq!(chain, vec!["a", "b", "a"]),
        other => panic!("expected circular import, got {other}"),
    }
}

#[test]
fn circular_import_can_be_broken() {
    let dir = project(&[
        ("main.py", "import a\n"),
        ("a.py", "import b\nA = 1\n"),
        ("b.py", "import a\nB = 2\n"),
    ]);
    let options = BuildOptions { cycles: CyclePolicy::Break, ..Default::default() };
    let combined = combine_with(&dir, &options).unwrap();
    assert_eq!(
        headers(&combined.source),
        vec!["# coiler: b (b.py)", "# coiler: a (a.py)", "# coiler: main (main.py)"]
    );
    assert_eq!(combined.context.diagnostics.len(), 1);
    assert!(combined.context.diagnostics[0].message.contains("'b' -> 'a'"));
}

#[test]
fn self_import_is_not_a_cycle() {
    let dir = project(&[("main.py", "import main\nx = 1\n")]);
    let combined = combine_with(&dir, &BuildOptions::default()).unwrap();
    assert_eq!(combined.context.graph.len(), 1);
    assert!(combined.source.ends_with("main__x = 1\n"));
}

const WILDCARD_PROGRAM: &[(&str, &str)] = &[
    ("main.py", "from util import *\nprint(helper())\n"),
    ("util.py", "def helper():\n    return 1\n_hidden = 0\n"),
];

#[test]
fn wildcard_import_warns_by_default() {
    let dir = project(WILDCARD_PROGRAM);
    let combined = combine_with(&dir, &BuildOptions::default()).unwrap();
    assert_eq!(combined.context.diagnostics.len(), 1);
    assert_eq!(combined.context.diagnostics[0].line, Some(1));
    assert!(combined.source.contains("def util__helper():"));
    assert!(combined.source.ends_with("print(helper())\n"));
}

#[test]
fn wildcard_import_can_be_denied() {
    let dir = project(WILDCARD_PROGRAM);
    let options = BuildOptions { wildcard: WildcardPolicy::Deny, ..Default::default() };
    let err = combine_with(&dir, &options).unwrap_err();
    assert!(matches!(err, CoilError::UnsupportedImport { line: 1, .. }), "{err}");
}

#[test]
fn wildcard_import_can_bind_public_names() {
    let dir = project(WILDCARD_PROGRAM);
    let options = BuildOptions { wildcard: WildcardPolicy::Bind, ..Default::default() };
    let combined = combine_with(&dir, &options).unwrap();
    assert!(combined.context.diagnostics.is_empty());
    assert!(combined.source.ends_with("print(util__helper())\n"));
}

#[test]
fn external_wildcard_is_kept() {
    let dir = project(&[("main.py", "from os.path import *\nprint(join(\"a\", \"b\"))\n")]);
    let combined = combine_with(&dir, &BuildOptions::default()).unwrap();
    assert!(combined.context.diagnostics.is_empty());
    assert_eq!(
        combined.source,
        "import os.path\n# coiler: main (main.py)\nfrom os.path import *\nprint(join(\"a\", \"b\"))\n"
    );
}

#[test]
fn relative_import_is_left_untouched() {
    let dir = project(&[("main.py", "x = 1\nfrom . import util\n"), ("util.py", "Y = 1\n")]);
    let combined = combine_with(&dir, &BuildOptions::default()).unwrap();
    assert_eq!(combined.context.graph.len(), 1);
    assert_eq!(combined.source, "# coiler: main (main.py)\nmain__x = 1\nfrom . import util\n");
}

#[test]
fn unreadable_entry_is_an_io_error() {
    let dir = project(&[]);
    let err = combine_with(&dir, &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, CoilError::Io { .. }), "{err}");
}

#[test]
fn report_describes_the_build() {
    let dir = project(&[
        ("main.py", "import util\nimport json\nprint(util.helper())\n"),
        ("util.py", "def helper():\n    return 1\n"),
    ]);
    let combined = combine_with(&dir, &BuildOptions::default()).unwrap();
    let report = combined.report();
    let names: Vec<&str> = report.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["util", "main"]);
    assert_eq!(report.externals, vec!["json"]);
    assert_eq!(report.symbols.len(), 1);
    assert_eq!(report.symbols[0].qualified, "util.helper");
    assert_eq!(report.output_sha256.len(), 64);
}
