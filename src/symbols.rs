use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::lexer::{is_ident_char, Segment, SegmentKind};
use crate::span::Span;

/// Per-module symbol state: what the module declares and what it can see
/// from other modules.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Declared name -> qualified name (`namespace.name`).
    local: BTreeMap<String, String>,
    /// Visible alias (possibly dotted, `alias.member`) -> qualified name in another module.
    dependent: BTreeMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a module-level declaration and return its qualified name.
    pub fn declare(&mut self, namespace: &str, name: &str) -> String {
        let qualified = qualify(namespace, name);
        self.local.insert(name.to_string(), qualified.clone());
        qualified
    }

    /// Make `qualified` (a symbol of another module) visible under `alias`.
    pub fn bind(&mut self, alias: impl Into<String>, qualified: impl Into<String>) {
        self.dependent.insert(alias.into(), qualified.into());
    }

    pub fn local(&self) -> &BTreeMap<String, String> {
        &self.local
    }

    pub fn dependent(&self) -> &BTreeMap<String, String> {
        &self.dependent
    }

    /// What `name` refers to in this module. Local declarations shadow imports.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.local.get(name).or_else(|| self.dependent.get(name)).map(String::as_str)
    }

    /// Symbols another module reaches through `<prefix>.member` after
    /// `import this_module [as prefix]`: every declaration plus every
    /// non-dotted re-export.
    pub fn exported(&self) -> impl Iterator<Item = (&str, &str)> {
        let reexports = self.dependent.iter()
            .filter(|(alias, _)| !alias.contains('.') && !self.local.contains_key(*alias));
        self.local.iter().chain(reexports).map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Rewrite one line with this table's bindings.
    pub fn translate_line(&self, line: &str, segments: &[Segment], registry: &SymbolRegistry) -> String {
        Bindings::for_table(self, registry).translate_line(line, segments)
    }
}

pub fn qualify(namespace: &str, name: &str) -> String {
    format!("{namespace}.{name}")
}

/// Build-wide map from qualified name to the identifier emitted for it.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    translated: IndexMap<String, String>,
    owners: HashMap<String, String>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a translated identifier to `qualified` (idempotent). The
    /// identifier is `namespace__name`, suffixed `_2`, `_3`, ... when that
    /// identifier already belongs to a different qualified name.
    pub fn register(&mut self, qualified: &str) -> &str {
        if !self.translated.contains_key(qualified) {
            let base = flatten(qualified);
            let mut candidate = base.clone();
            let mut n = 2;
            while self.owners.contains_key(&candidate) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            self.owners.insert(candidate.clone(), qualified.to_string());
            self.translated.insert(qualified.to_string(), candidate);
        }
        &self.translated[qualified]
    }

    pub fn get(&self, qualified: &str) -> Option<&str> {
        self.translated.get(qualified).map(String::as_str)
    }

    /// Translated identifier for `qualified`; unregistered names are flattened.
    pub fn translate(&self, qualified: &str) -> String {
        self.get(qualified).map_or_else(|| flatten(qualified), str::to_string)
    }

    /// Registered symbols in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.translated.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.translated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translated.is_empty()
    }
}

fn flatten(qualified: &str) -> String {
    qualified.replacen('.', "__", 1)
}

/// Replacement table for one module: source spelling -> translated identifier,
/// longest key first, ties broken lexicographically.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, String)>,
}

impl Bindings {
    pub fn for_table(table: &SymbolTable, registry: &SymbolRegistry) -> Self {
        let mut merged: BTreeMap<&str, &str> = BTreeMap::new();
        for (alias, qualified) in table.dependent() {
            merged.insert(alias, qualified);
        }
        for (name, qualified) in table.local() {
            merged.insert(name, qualified);
        }
        Self::from_pairs(merged.into_iter().map(|(k, q)| (k.to_string(), registry.translate(q))))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(String, String)> = pairs.into_iter()
            .filter(|(key, _)| !key.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the code segments of `line`. A key matches only where it is
    /// not preceded by an identifier character or `.`, and not followed by
    /// an identifier character. Literal segments are copied through.
    pub fn translate_line(&self, line: &str, segments: &[Segment]) -> String {
        self.translate_line_keeping(line, segments, &[])
    }

    /// Like [`translate_line`](Self::translate_line), but identifiers starting
    /// at one of the `keep` spans are copied unchanged.
    pub fn translate_line_keeping(&self, line: &str, segments: &[Segment], keep: &[Span]) -> String {
        if self.entries.is_empty() {
            return line.to_string();
        }
        let mut out = String::with_capacity(line.len() + 16);
        for segment in segments {
            let range = segment.span.range();
            match segment.kind {
                SegmentKind::Literal => out.push_str(&line[range]),
                SegmentKind::Code => self.translate_code(line, range.start, range.end, keep, &mut out),
            }
        }
        out
    }

    fn translate_code(&self, line: &str, start: usize, end: usize, keep: &[Span], out: &mut String) {
        let mut pos = start;
        while pos < end {
            let rest = &line[pos..end];
            let Some(c) = rest.chars().next() else { break };

            let boundary_before = line[..pos]
                .chars()
                .next_back()
                .is_none_or(|p| !is_ident_char(p) && p != '.');

            if boundary_before && is_ident_char(c) {
                let kept = keep.iter().any(|span| span.start == pos);
                if !kept {
                    if let Some((key, replacement)) = self.match_at(line, pos, rest) {
                        out.push_str(replacement);
                        pos += key.len();
                        continue;
                    }
                }
                // No key can start inside this identifier run.
                let run = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
                out.push_str(&rest[..run]);
                pos += run;
                continue;
            }

            out.push(c);
            pos += c.len_utf8();
        }
    }

    fn match_at<'s>(&'s self, line: &str, pos: usize, rest: &str) -> Option<(&'s str, &'s str)> {
        self.entries.iter().find_map(|(key, replacement)| {
            if !rest.starts_with(key.as_str()) {
                return None;
            }
            let boundary_after = line[pos + key.len()..]
                .chars()
                .next()
                .is_none_or(|n| !is_ident_char(n));
            boundary_after.then_some((key.as_str(), replacement.as_str()))
        })
    }
}
