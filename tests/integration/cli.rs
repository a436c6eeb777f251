//! The `coiler` binary: subcommands, exit codes and error output.

mod common;

use common::{coiler, entry, project, python_available};

const PROGRAM: &[(&str, &str)] = &[
    ("main.py", "import util\nprint(util.helper())\n"),
    ("util.py", "def helper():\n    return \"hello\"\n"),
    (".git/HEAD", ""),
];

#[test]
fn combine_prints_to_stdout() {
    let dir = project(PROGRAM);
    let output = coiler().arg("combine").arg(entry(&dir)).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "# coiler: util (util.py)\ndef util__helper():\n    return \"hello\"\n# coiler: main (main.py)\nprint(util__helper())\n"
    );
}

#[test]
fn combine_writes_output_file() {
    let dir = project(PROGRAM);
    let out = dir.path().join("combined.py");
    let output = coiler().arg("combine").arg(entry(&dir)).arg("-o").arg(&out).output().unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(std::fs::read_to_string(&out).unwrap().contains("def util__helper():"));
}

#[test]
fn build_source_only() {
    let dir = project(PROGRAM);
    let out = dir.path().join("app.py");
    let output = coiler()
        .arg("build")
        .arg(entry(&dir))
        .arg("--source-only")
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("combined 2 module(s)"));
    assert!(out.exists());
}

#[test]
fn build_bytecode_runs() {
    if !python_available() {
        return;
    }
    let dir = project(PROGRAM);
    let out = dir.path().join("app.pyc");
    let output = coiler().arg("build").arg(entry(&dir)).arg("-o").arg(&out).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let run = std::process::Command::new("python3").arg(&out).output().unwrap();
    assert!(run.status.success(), "{}", String::from_utf8_lossy(&run.stderr));
    assert_eq!(String::from_utf8_lossy(&run.stdout), "hello\n");
}

#[test]
fn graph_text_report() {
    let dir = project(PROGRAM);
    let output = coiler().arg("graph").arg(entry(&dir)).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("modules (emission order):"));
    assert!(stdout.contains("util.helper -> util__helper"));
}

#[test]
fn graph_json_report() {
    let dir = project(PROGRAM);
    let output = coiler().arg("graph").arg(entry(&dir)).arg("--json").output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["modules"][0]["name"], "util");
    assert_eq!(json["modules"][1]["name"], "main");
    assert_eq!(json["symbols"][0]["translated"], "util__helper");
}

#[test]
fn missing_entry_fails() {
    let dir = project(&[(".git/HEAD", "")]);
    let output = coiler().arg("combine").arg(dir.path().join("nope.py")).output().unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[io]"));
}

#[test]
fn wildcard_warning_is_printed() {
    let dir = project(&[
        ("main.py", "from util import *\n"),
        ("util.py", "X = 1\n"),
        (".git/HEAD", ""),
    ]);
    let output = coiler().arg("combine").arg(entry(&dir)).output().unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("wildcard import from 'util'"), "{stderr}");
}

#[test]
fn wildcard_deny_flag_fails_the_build() {
    let dir = project(&[
        ("main.py", "from util import *\n"),
        ("util.py", "X = 1\n"),
        (".git/HEAD", ""),
    ]);
    let output = coiler()
        .arg("combine")
        .arg(entry(&dir))
        .arg("--wildcard")
        .arg("deny")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn circular_import_reports_chain() {
    let dir = project(&[
        ("main.py", "import a\n"),
        ("a.py", "import b\n"),
        ("b.py", "import a\n"),
        (".git/HEAD", ""),
    ]);
    let output = coiler().arg("combine").arg(entry(&dir)).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Circular import: a -> b -> a"));

    let output = coiler()
        .args(["combine", "--cycles", "break"])
        .arg(entry(&dir))
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn unknown_mode_is_a_usage_error() {
    let dir = project(PROGRAM);
    let output = coiler().arg("combine").arg(entry(&dir)).args(["--mode", "everything"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown search mode"));
}

#[test]
fn embed_conflicts_with_source_only() {
    let dir = project(PROGRAM);
    let output = coiler()
        .arg("build")
        .arg(entry(&dir))
        .args(["--embed", "--source-only"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}
