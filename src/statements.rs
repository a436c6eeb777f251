use crate::imports::{self, ImportForm};
use crate::lexer::token::Token;
use crate::lexer::{LexedLine, LineLexer, SegmentKind};

/// A unit the scanner and emitter act on: an ordinary line, or an import
/// statement (possibly spanning several lines when its name list is
/// parenthesized).
#[derive(Debug)]
pub enum Statement<'a> {
    Code {
        number: usize,
        line: &'a str,
        lexed: LexedLine,
    },
    Import {
        /// Line number of the first line.
        number: usize,
        lines: Vec<&'a str>,
        forms: Vec<ImportForm>,
        /// Not indented.
        top_level: bool,
    },
}

struct Pending<'a> {
    number: usize,
    lines: Vec<(&'a str, LexedLine)>,
    code: String,
    top_level: bool,
}

/// Groups lexed lines into statements. Feed every line of a file in order,
/// then call [`finish`](Self::finish).
#[derive(Default)]
pub struct StatementReader<'a> {
    lexer: LineLexer,
    pending: Option<Pending<'a>>,
}

impl<'a> StatementReader<'a> {
    pub fn new() -> Self {
        Self { lexer: LineLexer::new(), pending: None }
    }

    pub fn feed(&mut self, number: usize, line: &'a str, out: &mut Vec<Statement<'a>>) {
        let lexed = self.lexer.lex_line(line);

        if let Some(pending) = &mut self.pending {
            let closes = lexed.tokens.iter().any(|t| t.node == Token::RParen);
            pending.code.push(' ');
            pending.code.push_str(&code_text(line, &lexed));
            pending.lines.push((line, lexed));
            if closes {
                if let Some(pending) = self.pending.take() {
                    resolve(pending, out);
                }
            }
            return;
        }

        if lexed.starts_in_string {
            out.push(Statement::Code { number, line, lexed });
            return;
        }

        let top_level = lexed.tokens.first().is_some_and(|t| t.span.start == 0);
        if let Some(forms) = imports::classify(&lexed.tokens, line) {
            out.push(Statement::Import { number, lines: vec![line], forms, top_level });
        } else if opens_name_list(&lexed) {
            let code = code_text(line, &lexed);
            self.pending = Some(Pending { number, lines: vec![(line, lexed)], code, top_level });
        } else {
            out.push(Statement::Code { number, line, lexed });
        }
    }

    /// Flush an import whose name list never closed; its lines come back as code.
    pub fn finish(&mut self, out: &mut Vec<Statement<'a>>) {
        if let Some(pending) = self.pending.take() {
            flush_as_code(pending, out);
        }
    }
}

fn resolve<'a>(pending: Pending<'a>, out: &mut Vec<Statement<'a>>) {
    let joined = LineLexer::new().lex_line(&pending.code);
    match imports::classify(&joined.tokens, &pending.code) {
        Some(forms) => out.push(Statement::Import {
            number: pending.number,
            lines: pending.lines.into_iter().map(|(line, _)| line).collect(),
            forms,
            top_level: pending.top_level,
        }),
        None => flush_as_code(pending, out),
    }
}

fn flush_as_code<'a>(pending: Pending<'a>, out: &mut Vec<Statement<'a>>) {
    for (offset, (line, lexed)) in pending.lines.into_iter().enumerate() {
        out.push(Statement::Code { number: pending.number + offset, line, lexed });
    }
}

/// `from X import (` with the list left open on this line.
fn opens_name_list(lexed: &LexedLine) -> bool {
    let kinds: Vec<Token> = lexed.tokens.iter().map(|t| t.node).collect();
    kinds.first() == Some(&Token::From)
        && kinds.windows(2).any(|w| w == [Token::Import, Token::LParen])
        && !kinds.contains(&Token::RParen)
}

/// The code portions of a line, comments and strings removed.
fn code_text(line: &str, lexed: &LexedLine) -> String {
    lexed.segments.iter()
        .filter(|s| s.kind == SegmentKind::Code)
        .map(|s| &line[s.span.range()])
        .collect()
}
