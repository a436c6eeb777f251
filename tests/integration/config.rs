//! `coiler.toml` discovery and precedence.

mod common;

use coiler::config::{BuildOptions, Overrides, WildcardPolicy, DEFAULT_INTERPRETER};
use coiler::diagnostics::CoilError;
use coiler::graph::CyclePolicy;
use coiler::lookup::SearchMode;

use common::{entry, project};

fn canonical(path: &std::path::Path) -> std::path::PathBuf {
    std::fs::canonicalize(path).unwrap()
}

#[test]
fn defaults_without_a_config_file() {
    let dir = project(&[("main.py", ""), (".git/HEAD", "")]);
    let options = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap();
    assert_eq!(options, BuildOptions::default());
    assert_eq!(options.interpreter, DEFAULT_INTERPRETER);
}

#[test]
fn config_next_to_the_entry_is_used() {
    let dir = project(&[
        ("main.py", ""),
        ("lib/extra.py", ""),
        ("coiler.toml", "[build]\nmode = \"user\"\npaths = [\"lib\"]\nwildcard = \"bind\"\ncycles = \"break\"\n"),
    ]);
    let options = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap();
    assert_eq!(options.mode, SearchMode::Local);
    assert_eq!(options.wildcard, WildcardPolicy::Bind);
    assert_eq!(options.cycles, CyclePolicy::Break);
    assert_eq!(options.paths.iter().map(|p| canonical(p)).collect::<Vec<_>>(), vec![canonical(&dir.path().join("lib"))]);
    assert_eq!(options.config_path.map(|p| canonical(&p)), Some(canonical(&dir.path().join("coiler.toml"))));
}

#[test]
fn config_is_found_in_a_parent_directory() {
    let dir = project(&[
        ("src/app/main.py", ""),
        ("coiler.toml", "[build]\ninterpreter = \"python3.11\"\n"),
    ]);
    let options = BuildOptions::resolve(&dir.path().join("src/app/main.py"), &Overrides::default()).unwrap();
    assert_eq!(options.interpreter, "python3.11");
}

#[test]
fn search_stops_at_repository_root() {
    let dir = project(&[
        ("coiler.toml", "[build]\ninterpreter = \"python3.11\"\n"),
        ("repo/.git/HEAD", ""),
        ("repo/main.py", ""),
    ]);
    let options = BuildOptions::resolve(&dir.path().join("repo/main.py"), &Overrides::default()).unwrap();
    assert_eq!(options.interpreter, DEFAULT_INTERPRETER);
    assert_eq!(options.config_path, None);
}

#[test]
fn command_line_overrides_config() {
    let dir = project(&[
        ("main.py", ""),
        ("lib/a.py", ""),
        ("cli/b.py", ""),
        ("coiler.toml", "[build]\nmode = \"all\"\npaths = [\"lib\"]\nwildcard = \"deny\"\n"),
    ]);
    let overrides = Overrides {
        mode: Some(SearchMode::Local),
        paths: vec![dir.path().join("cli")],
        interpreter: Some("pypy3".into()),
        wildcard: Some(WildcardPolicy::Warn),
        cycles: None,
    };
    let options = BuildOptions::resolve(&entry(&dir), &overrides).unwrap();
    assert_eq!(options.mode, SearchMode::Local);
    assert_eq!(options.interpreter, "pypy3");
    assert_eq!(options.wildcard, WildcardPolicy::Warn);
    assert_eq!(options.cycles, CyclePolicy::Reject);
    let paths: Vec<_> = options.paths.iter().map(|p| canonical(p)).collect();
    assert_eq!(paths, vec![canonical(&dir.path().join("cli")), canonical(&dir.path().join("lib"))]);
}

#[test]
fn unknown_key_is_rejected() {
    let dir = project(&[("main.py", ""), ("coiler.toml", "[build]\noptimize = true\n")]);
    let err = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap_err();
    assert!(matches!(err, CoilError::Config { .. }), "{err}");
}

#[test]
fn invalid_policy_is_rejected() {
    let dir = project(&[("main.py", ""), ("coiler.toml", "[build]\nwildcard = \"sometimes\"\n")]);
    let err = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap_err();
    assert!(err.to_string().contains("invalid syntax"), "{err}");
}

#[test]
fn missing_search_path_is_rejected() {
    let dir = project(&[("main.py", ""), ("coiler.toml", "[build]\npaths = [\"nowhere\"]\n")]);
    let err = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap_err();
    assert!(err.to_string().contains("'nowhere' is not a directory"), "{err}");
}

#[test]
fn command_line_path_must_exist() {
    let dir = project(&[("main.py", ""), (".git/HEAD", "")]);
    let overrides = Overrides { paths: vec![dir.path().join("missing")], ..Default::default() };
    let err = BuildOptions::resolve(&entry(&dir), &overrides).unwrap_err();
    assert!(matches!(err, CoilError::Config { .. }), "{err}");
}

#[test]
fn empty_interpreter_is_rejected() {
    let dir = project(&[("main.py", ""), ("coiler.toml", "[build]\ninterpreter = \"  \"\n")]);
    let err = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap_err();
    assert!(err.to_string().contains("interpreter must not be empty"), "{err}");
}

#[test]
fn configured_policy_reaches_the_build() {
    let dir = project(&[
        ("main.py", "from util import *\nprint(helper())\n"),
        ("util.py", "def helper():\n    return 1\n"),
        ("coiler.toml", "[build]\nwildcard = \"bind\"\n"),
    ]);
    let options = BuildOptions::resolve(&entry(&dir), &Overrides::default()).unwrap();
    let combined = common::combine_with(&dir, &options).unwrap();
    assert!(combined.source.ends_with("print(util__helper())\n"));
}
