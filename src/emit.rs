use crate::context::BuildContext;
use crate::declarations::defined_spans;
use crate::imports::{self, ImportForm};
use crate::lexer::token::Token;
use crate::module::ModuleContext;
use crate::scanner::split_lines;
use crate::statements::{Statement, StatementReader};
use crate::symbols::Bindings;

/// Produce the combined program: every module's `__future__` directives, one
/// `import` line per external module, then every module in emission order
/// with its lines rewritten.
///
/// `ctx` must have been [finished](BuildContext::finish); an unfinished
/// context has no emission order and yields only the header lines.
pub fn emit(ctx: &BuildContext) -> String {
    let mut out = String::new();
    for future in ctx.futures() {
        out.push_str(future);
        out.push('\n');
    }
    for external in ctx.externals() {
        out.push_str("import ");
        out.push_str(external);
        out.push('\n');
    }

    for &id in ctx.emission_order() {
        let module = ctx.graph.module(id);
        tracing::debug!(module = %module.name, "emitting module");
        emit_module(module, ctx, &mut out);
    }
    out
}

fn emit_module(module: &ModuleContext, ctx: &BuildContext, out: &mut String) {
    out.push_str(&format!("# coiler: {} ({})\n", module.namespace, module.file_name()));

    let bindings = Bindings::for_table(&module.symbols, &ctx.registry);
    let mut classes = ClassBlocks::default();
    let mut reader = StatementReader::new();
    let mut statements = Vec::new();
    for (idx, line) in split_lines(&module.source).enumerate() {
        reader.feed(idx + 1, line, &mut statements);
        for statement in statements.drain(..) {
            emit_statement(statement, &bindings, &mut classes, ctx, out);
        }
    }
    reader.finish(&mut statements);
    for statement in statements {
        emit_statement(statement, &bindings, &mut classes, ctx, out);
    }
}

fn emit_statement(
    statement: Statement<'_>,
    bindings: &Bindings,
    classes: &mut ClassBlocks,
    ctx: &BuildContext,
    out: &mut String,
) {
    match statement {
        Statement::Code { line, lexed, .. } => {
            let in_class_body = !lexed.starts_in_string && classes.enter(line, lexed.first() == Some(Token::Class));
            // Names defined directly in a class body are attributes.
            let keep = if in_class_body { defined_spans(&lexed) } else { Vec::new() };
            out.push_str(&bindings.translate_line_keeping(line, &lexed.segments, &keep));
            out.push('\n');
        }
        Statement::Import { forms, lines, top_level: true, .. } => {
            if let Some(first) = lines.first() {
                classes.enter(first, false);
            }
            // Inlined modules and plain external imports are gone, future
            // directives are hoisted; clauses binding a name from an external
            // module stay.
            let kept: Vec<&ImportForm> = forms.iter()
                .filter(|form| ctx.is_external(form.module()) && !form.is_plain() && !form.is_future())
                .collect();
            if !kept.is_empty() {
                out.push_str(&imports::render(&kept));
                out.push('\n');
            }
        }
        // Possibly conditional at runtime.
        Statement::Import { lines, top_level: false, .. } => {
            if let Some(first) = lines.first() {
                classes.enter(first, false);
            }
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

struct ClassBlock {
    indent: usize,
    /// Indentation of the first statement in the body, once seen.
    body: Option<usize>,
}

/// The `class` blocks enclosing the current line, innermost last.
#[derive(Default)]
struct ClassBlocks {
    open: Vec<ClassBlock>,
}

impl ClassBlocks {
    /// Advance to `line`. Returns true when the line is a statement directly
    /// inside a class body (not nested in one of its methods).
    fn enter(&mut self, line: &str, opens_class: bool) -> bool {
        let text = line.trim_start();
        if text.is_empty() || text.starts_with('#') {
            return false;
        }
        let indent = line.len() - text.len();
        while self.open.last().is_some_and(|block| indent <= block.indent) {
            self.open.pop();
        }
        let in_body = match self.open.last_mut() {
            Some(block) => *block.body.get_or_insert(indent) == indent,
            None => false,
        };
        if opens_class {
            self.open.push(ClassBlock { indent, body: None });
        }
        in_body
    }
}
