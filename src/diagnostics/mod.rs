use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoilError {
    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },

    #[error("Unsupported import: {msg}")]
    UnsupportedImport { msg: String, path: PathBuf, line: usize },

    #[error("Circular import: {}", chain.join(" -> "))]
    CircularImport { chain: Vec<String> },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("Toolchain error: {msg}")]
    Toolchain { msg: String },

    #[error("Embed error: {msg}")]
    Embed { msg: String },
}

impl CoilError {
    pub fn io(msg: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Io { msg: msg.into(), path: path.into() }
    }

    pub fn unsupported_import(msg: impl Into<String>, path: impl Into<PathBuf>, line: usize) -> Self {
        Self::UnsupportedImport { msg: msg.into(), path: path.into(), line }
    }

    pub fn circular_import(chain: Vec<String>) -> Self {
        Self::CircularImport { chain }
    }

    pub fn config(msg: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Config { msg: msg.into(), path: path.into() }
    }

    pub fn toolchain(msg: impl Into<String>) -> Self {
        Self::Toolchain { msg: msg.into() }
    }

    pub fn embed(msg: impl Into<String>) -> Self {
        Self::Embed { msg: msg.into() }
    }
}

/// A non-fatal finding recorded during a build. The build continues, but the
/// combined output may not behave exactly like the original program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub path: Option<PathBuf>,
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), path: None, line: None }
    }

    pub fn at(message: impl Into<String>, path: &Path, line: usize) -> Self {
        Self { message: message.into(), path: Some(path.to_path_buf()), line: Some(line) }
    }

    pub fn in_path(message: impl Into<String>, path: &Path) -> Self {
        Self { message: message.into(), path: Some(path.to_path_buf()), line: None }
    }
}

/// Byte range of a 1-based line number within `source`, without its terminator.
fn line_range(source: &str, line: usize) -> Option<Range<usize>> {
    let mut offset = 0;
    for (idx, text) in source.split('\n').enumerate() {
        if idx + 1 == line {
            return Some(offset..offset + text.trim_end_matches('\r').len());
        }
        offset += text.len() + 1;
    }
    None
}

fn report_at_line(kind: ariadne::ReportKind, title: &str, msg: &str, path: &Path, line: usize) -> bool {
    use ariadne::{Label, Report, Source};

    let Ok(source) = std::fs::read_to_string(path) else {
        return false;
    };
    let Some(range) = line_range(&source, line) else {
        return false;
    };
    eprintln!("  --> {}:{line}", path.display());
    Report::build(kind, (), range.start)
        .with_message(title)
        .with_label(Label::new(range).with_message(msg))
        .finish()
        .eprint(Source::from(source))
        .is_ok()
}

/// Render a CoilError for the terminal. Line-located errors are shown with ariadne.
pub fn render_error(err: &CoilError) {
    match err {
        CoilError::UnsupportedImport { msg, path, line } => {
            if !report_at_line(ariadne::ReportKind::Error, "unsupported import", msg, path, *line) {
                eprintln!("error: {msg}");
                eprintln!("  --> {}:{line}", path.display());
            }
        }
        CoilError::Io { msg, path } => {
            eprintln!("error[io]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        CoilError::Config { msg, path } => {
            eprintln!("error[config]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        CoilError::CircularImport { .. } | CoilError::Toolchain { .. } | CoilError::Embed { .. } => {
            eprintln!("error: {err}");
        }
    }
}

/// Render a build diagnostic as a warning.
pub fn render_warning(diag: &Diagnostic) {
    if let (Some(path), Some(line)) = (&diag.path, diag.line) {
        if report_at_line(ariadne::ReportKind::Warning, "warning", &diag.message, path, line) {
            return;
        }
    }
    eprintln!("warning: {}", diag.message);
    if let Some(path) = &diag.path {
        match diag.line {
            Some(line) => eprintln!("  --> {}:{line}", path.display()),
            None => eprintln!("  --> {}", path.display()),
        }
    }
}
