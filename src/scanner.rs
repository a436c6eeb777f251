//! Line-oriented import and declaration scanner. Parsing a module records its
//! declarations, resolves every import it names (recursively parsing local
//! modules first) and binds the imported names in the module's symbol table.

use std::path::Path;

use crate::config::WildcardPolicy;
use crate::context::BuildContext;
use crate::declarations::declared_names;
use crate::diagnostics::{CoilError, Diagnostic};
use crate::graph::ModuleId;
use crate::imports::{self, ImportForm};
use crate::lexer::token::Token;
use crate::lexer::LexedLine;
use crate::lookup;
use crate::module::{derive_namespace, module_name, ModuleContext};
use crate::statements::{Statement, StatementReader};

/// Lines buffered between the splitting thread and the scanner.
const LINE_BUFFER: usize = 256;

/// Parse the module at `path` into `ctx`. Already-parsed paths return their
/// existing id.
pub fn parse(path: &Path, ctx: &mut BuildContext) -> Result<ModuleId, CoilError> {
    let full_path = lookup::canonical(path);
    if let Some(id) = ctx.graph.find_by_path(&full_path) {
        return Ok(id);
    }

    let source = std::fs::read_to_string(&full_path).map_err(|e| {
        CoilError::io(format!("could not read '{}': {e}", path.display()), full_path.clone())
    })?;

    let name = module_name(&full_path);
    let namespace = ctx.unique_namespace(&derive_namespace(&name));
    ctx.mark_visited(&name);
    tracing::debug!(module = %name, namespace = %namespace, path = %full_path.display(), "parsing module");

    let id = ctx.graph.add_node(ModuleContext::new(name, namespace, full_path.clone(), source.clone()));
    scan_source(id, &full_path, &source, ctx)?;
    Ok(id)
}

/// Lines of `source` split on `\n`, terminators dropped. A final newline does
/// not start another line.
pub(crate) fn split_lines(source: &str) -> impl Iterator<Item = &str> {
    let body = source.strip_suffix('\n').unwrap_or(source);
    (!source.is_empty()).then(|| body.split('\n')).into_iter().flatten()
}

fn scan_source(id: ModuleId, path: &Path, source: &str, ctx: &mut BuildContext) -> Result<(), CoilError> {
    let (tx, rx) = crossbeam_channel::bounded::<(usize, &str)>(LINE_BUFFER);

    std::thread::scope(move |scope| {
        scope.spawn(move || {
            for (idx, line) in split_lines(source).enumerate() {
                // Receiver gone: the scan stopped early on an error.
                if tx.send((idx + 1, line)).is_err() {
                    break;
                }
            }
        });

        let mut reader = StatementReader::new();
        let mut statements = Vec::new();
        let result = rx.iter().try_for_each(|(number, line)| {
            reader.feed(number, line, &mut statements);
            statements.drain(..).try_for_each(|statement| scan_statement(id, path, statement, ctx))
        });
        drop(rx);
        result?;

        reader.finish(&mut statements);
        statements.into_iter().try_for_each(|statement| scan_statement(id, path, statement, ctx))
    })
}

fn scan_statement(id: ModuleId, path: &Path, statement: Statement<'_>, ctx: &mut BuildContext) -> Result<(), CoilError> {
    match statement {
        Statement::Import { number, forms, top_level, .. } => {
            for form in &forms {
                bind_import(id, path, number, form, top_level, ctx)?;
            }
        }
        Statement::Code { number, line, lexed } => {
            for name in declared_names(&lexed, line) {
                ctx.declare(id, &name);
            }
            warn_joined_import(path, number, line, &lexed, ctx);
        }
    }
    Ok(())
}

/// `import util; x = 1` stays code. Say so when it names a module that would
/// otherwise be inlined.
fn warn_joined_import(path: &Path, number: usize, line: &str, lexed: &LexedLine, ctx: &mut BuildContext) {
    let Some(semi) = lexed.tokens.iter().position(|t| t.node == Token::Semi) else {
        return;
    };
    let Some(forms) = imports::classify(&lexed.tokens[..semi], line) else {
        return;
    };
    let inlined: Vec<_> = forms.iter().filter(|form| ctx.find_source(form.module()).is_some()).collect();
    for form in inlined {
        ctx.warn(Diagnostic::at(
            format!("'{form}' shares its line with other statements; '{}' is not inlined", form.module()),
            path,
            number,
        ));
    }
}

fn bind_import(
    id: ModuleId,
    path: &Path,
    number: usize,
    form: &ImportForm,
    top_level: bool,
    ctx: &mut BuildContext,
) -> Result<(), CoilError> {
    if form.is_future() {
        ctx.add_future(form.to_string());
        return Ok(());
    }
    if let ImportForm::Wildcard { module } = form {
        if ctx.wildcard == WildcardPolicy::Deny {
            return Err(CoilError::unsupported_import(
                format!("wildcard import from '{module}' is not supported"),
                path,
                number,
            ));
        }
    }

    let Some(dep) = resolve_module(form.module(), ctx)? else {
        match form.binding() {
            Some((name, target)) if top_level => ctx.bind_external_name(id, name, target, path, number),
            _ => {}
        }
        return Ok(());
    };
    ctx.graph.module_mut(id).add_dependency(form.module());

    match form {
        ImportForm::Wildcard { module } => match ctx.wildcard {
            WildcardPolicy::Bind => {
                let public: Vec<(String, String)> = ctx.graph.module(dep).symbols.exported()
                    .filter(|(name, _)| !name.starts_with('_'))
                    .map(|(name, qualified)| (name.to_string(), qualified.to_string()))
                    .collect();
                bind_all(id, public, ctx);
            }
            _ => ctx.warn(Diagnostic::at(
                format!("wildcard import from '{module}' binds no names; its declarations are renamed but uses here are not"),
                path,
                number,
            )),
        },
        ImportForm::AliasedSingle { symbol, alias, .. } => bind_symbol(id, dep, symbol, alias, ctx),
        ImportForm::UnaliasedSingle { symbol, .. } => bind_symbol(id, dep, symbol, symbol, ctx),
        ImportForm::AliasedModule { alias: prefix, .. } | ImportForm::PlainModule { module: prefix } => {
            let members: Vec<(String, String)> = ctx.graph.module(dep).symbols.exported()
                .map(|(name, qualified)| (format!("{prefix}.{name}"), qualified.to_string()))
                .collect();
            bind_all(id, members, ctx);
        }
    }
    Ok(())
}

/// Find or parse the module imported as `name`. Names missing from the lookup
/// table are recorded as external and yield `None`.
fn resolve_module(name: &str, ctx: &mut BuildContext) -> Result<Option<ModuleId>, CoilError> {
    if ctx.is_visited(name) {
        if let Some(id) = ctx.graph.find_by_name(name) {
            return Ok(Some(id));
        }
    }
    match ctx.find_source(name).cloned() {
        Some(path) => {
            ctx.mark_visited(name);
            let id = parse(&path, ctx)?;
            ctx.graph.register_name(name, id);
            Ok(Some(id))
        }
        None => {
            ctx.add_external(name);
            Ok(None)
        }
    }
}

fn bind_symbol(id: ModuleId, dep: ModuleId, symbol: &str, alias: &str, ctx: &mut BuildContext) {
    let qualified = ctx.graph.module(dep).symbols.resolve(symbol).map(str::to_string);
    match qualified {
        Some(qualified) => ctx.graph.module_mut(id).symbols.bind(alias, qualified),
        // Not a module-level declaration we recognized (a submodule, or a name
        // created at runtime); leave uses untouched.
        None => tracing::debug!(symbol, module = %ctx.graph.module(dep).name, "imported name has no declaration"),
    }
}

fn bind_all(id: ModuleId, bindings: Vec<(String, String)>, ctx: &mut BuildContext) {
    let table = &mut ctx.graph.module_mut(id).symbols;
    for (alias, qualified) in bindings {
        table.bind(alias, qualified);
    }
}
