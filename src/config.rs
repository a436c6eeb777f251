use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diagnostics::CoilError;
use crate::graph::CyclePolicy;
use crate::lookup::SearchMode;

pub const CONFIG_FILE: &str = "coiler.toml";
pub const DEFAULT_INTERPRETER: &str = "python3";

/// How `from X import *` is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WildcardPolicy {
    /// Record a diagnostic and continue without binding any names.
    #[default]
    Warn,
    /// Fail the build.
    Deny,
    /// Bind every public (non-underscore) name the imported module declares.
    Bind,
}

impl FromStr for WildcardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(WildcardPolicy::Warn),
            "deny" => Ok(WildcardPolicy::Deny),
            "bind" => Ok(WildcardPolicy::Bind),
            other => Err(format!("unknown wildcard policy '{other}' (expected 'warn', 'deny' or 'bind')")),
        }
    }
}

impl fmt::Display for WildcardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WildcardPolicy::Warn => write!(f, "warn"),
            WildcardPolicy::Deny => write!(f, "deny"),
            WildcardPolicy::Bind => write!(f, "bind"),
        }
    }
}

/// Resolved settings for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub mode: SearchMode,
    /// Extra local search directories, searched after the entry directory.
    pub paths: Vec<PathBuf>,
    pub interpreter: String,
    pub wildcard: WildcardPolicy,
    pub cycles: CyclePolicy,
    /// The `coiler.toml` these options were read from, if any.
    pub config_path: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            paths: Vec::new(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            wildcard: WildcardPolicy::default(),
            cycles: CyclePolicy::default(),
            config_path: None,
        }
    }
}

/// Command-line values that take precedence over `coiler.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<SearchMode>,
    pub paths: Vec<PathBuf>,
    pub interpreter: Option<String>,
    pub wildcard: Option<WildcardPolicy>,
    pub cycles: Option<CyclePolicy>,
}

impl BuildOptions {
    /// Options for building `entry`: defaults, then the nearest `coiler.toml`
    /// above the entry file, then `overrides`.
    pub fn resolve(entry: &Path, overrides: &Overrides) -> Result<Self, CoilError> {
        let start = entry.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut options = match find_config_walk(start) {
            Some(path) => load_config(&path)?,
            None => BuildOptions::default(),
        };

        if let Some(mode) = overrides.mode {
            options.mode = mode;
        }
        if let Some(interpreter) = &overrides.interpreter {
            options.interpreter = interpreter.clone();
        }
        if let Some(wildcard) = overrides.wildcard {
            options.wildcard = wildcard;
        }
        if let Some(cycles) = overrides.cycles {
            options.cycles = cycles;
        }
        for dir in &overrides.paths {
            if !dir.is_dir() {
                return Err(CoilError::config(
                    format!("search path '{}' is not a directory", dir.display()),
                    dir.clone(),
                ));
            }
        }
        let mut paths = overrides.paths.clone();
        paths.append(&mut options.paths);
        options.paths = paths;

        if options.interpreter.trim().is_empty() {
            return Err(CoilError::config(
                "interpreter must not be empty",
                options.config_path.clone().unwrap_or_default(),
            ));
        }
        Ok(options)
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    build: TomlBuild,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlBuild {
    mode: Option<SearchMode>,
    #[serde(default)]
    paths: Vec<String>,
    interpreter: Option<String>,
    wildcard: Option<WildcardPolicy>,
    cycles: Option<CyclePolicy>,
}

/// Walk up from `start_dir` looking for `coiler.toml`, stopping at a
/// directory that holds `.git` or at the filesystem root.
pub fn find_config_walk(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = std::fs::canonicalize(start_dir).unwrap_or_else(|_| start_dir.to_path_buf());
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        // .git may be a file (worktrees, submodules)
        if dir.join(".git").exists() {
            return None;
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Parse and validate a `coiler.toml`. Relative `paths` are resolved against
/// the file's directory.
pub fn load_config(config_path: &Path) -> Result<BuildOptions, CoilError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        CoilError::config(format!("could not read {CONFIG_FILE}: {e}"), config_path.to_path_buf())
    })?;
    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        CoilError::config(format!("{CONFIG_FILE}: invalid syntax: {e}"), config_path.to_path_buf())
    })?;

    let base = config_path.parent().unwrap_or(Path::new("."));
    let mut paths = Vec::with_capacity(config.build.paths.len());
    for raw in &config.build.paths {
        let dir = base.join(raw);
        if !dir.is_dir() {
            return Err(CoilError::config(
                format!("{CONFIG_FILE}: search path '{raw}' is not a directory"),
                config_path.to_path_buf(),
            ));
        }
        paths.push(dir);
    }

    let defaults = BuildOptions::default();
    tracing::debug!(path = %config_path.display(), "loaded config");
    Ok(BuildOptions {
        mode: config.build.mode.unwrap_or(defaults.mode),
        paths,
        interpreter: config.build.interpreter.unwrap_or(defaults.interpreter),
        wildcard: config.build.wildcard.unwrap_or(defaults.wildcard),
        cycles: config.build.cycles.unwrap_or(defaults.cycles),
        config_path: Some(config_path.to_path_buf()),
    })
}
