pub mod token;
pub use token::{is_ident_char, is_keyword};

use logos::Logos;
use crate::span::{Span, Spanned};
use token::Token;

/// Whether a stretch of a line is program text or literal text (string or comment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Double,
    Single,
}

impl Quote {
    fn delimiter(self) -> &'static str {
        match self {
            Quote::Double => "\"\"\"",
            Quote::Single => "'''",
        }
    }

    fn of(slice: &str) -> Self {
        if slice.ends_with('\'') { Quote::Single } else { Quote::Double }
    }
}

/// One lexed line: code tokens (strings and comments excluded) plus the
/// code/literal segmentation the rename pass works on.
#[derive(Debug, Clone, Default)]
pub struct LexedLine {
    pub tokens: Vec<Spanned<Token>>,
    pub segments: Vec<Segment>,
    /// The line began inside a triple-quoted string.
    pub starts_in_string: bool,
}

impl LexedLine {
    pub fn first(&self) -> Option<Token> {
        self.tokens.first().map(|t| t.node)
    }
}

/// Lexes a file line by line, carrying open triple-quoted strings across lines.
#[derive(Debug, Default)]
pub struct LineLexer {
    open_triple: Option<Quote>,
}

impl LineLexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_string(&self) -> bool {
        self.open_triple.is_some()
    }

    pub fn lex_line(&mut self, line: &str) -> LexedLine {
        let mut tokens = Vec::new();
        let mut segments = SegmentBuilder::default();
        let starts_in_string = self.open_triple.is_some();

        let mut offset = 0;
        if let Some(quote) = self.open_triple {
            match find_closing(line, quote.delimiter()) {
                Some(end) => {
                    segments.literal(0, end);
                    offset = end;
                    self.open_triple = None;
                }
                None => {
                    segments.literal(0, line.len());
                    return LexedLine { tokens, segments: segments.finish(line.len()), starts_in_string };
                }
            }
        }

        let mut lexer = Token::lexer(&line[offset..]);
        while let Some(result) = lexer.next() {
            let start = offset + lexer.span().start;
            let end = offset + lexer.span().end;
            match result {
                Ok(Token::Comment) => segments.literal(start, end),
                Ok(Token::Str) => {
                    if is_fstring(lexer.slice()) {
                        segments.fstring(line, start, end);
                    } else {
                        segments.literal(start, end);
                    }
                }
                Ok(Token::TripleQuote) => {
                    let quote = Quote::of(lexer.slice());
                    match find_closing(lexer.remainder(), quote.delimiter()) {
                        Some(close) => {
                            lexer.bump(close);
                            segments.literal(start, offset + lexer.span().end);
                        }
                        None => {
                            segments.literal(start, line.len());
                            self.open_triple = Some(quote);
                            break;
                        }
                    }
                }
                Ok(token) => tokens.push(Spanned::new(token, Span::new(start, end))),
                // Characters the lexer has no rule for behave like punctuation.
                Err(()) => tokens.push(Spanned::new(Token::Op, Span::new(start, end))),
            }
        }

        LexedLine { tokens, segments: segments.finish(line.len()), starts_in_string }
    }
}

#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
    code_start: usize,
}

impl SegmentBuilder {
    fn literal(&mut self, start: usize, end: usize) {
        if self.code_start < start {
            self.push(SegmentKind::Code, self.code_start, start);
        }
        if start < end {
            self.push(SegmentKind::Literal, start, end);
        }
        self.code_start = self.code_start.max(end);
    }

    /// f-strings are literal text except for their `{...}` replacement fields.
    fn fstring(&mut self, line: &str, start: usize, end: usize) {
        let bytes = line.as_bytes();
        let open = line[start..end].find(['"', '\'']).map_or(0, |i| i + 1);
        let body_end = end.saturating_sub(1);
        let mut literal_from = start;
        let mut i = start + open;
        while i < body_end {
            match bytes[i] {
                b'\\' => i += 2,
                b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
                b'{' => {
                    let mut depth = 1;
                    let mut j = i + 1;
                    while j < body_end {
                        match bytes[j] {
                            b'{' => depth += 1,
                            b'}' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            break;
                        }
                        j += 1;
                    }
                    self.literal(literal_from, i + 1);
                    literal_from = j;
                    i = j + 1;
                }
                _ => i += 1,
            }
        }
        self.literal(literal_from, end);
    }

    fn push(&mut self, kind: SegmentKind, start: usize, end: usize) {
        self.segments.push(Segment { kind, span: Span::new(start, end) });
    }

    fn finish(mut self, len: usize) -> Vec<Segment> {
        if self.code_start < len {
            self.push(SegmentKind::Code, self.code_start, len);
        }
        self.segments
    }
}

fn is_fstring(slice: &str) -> bool {
    slice
        .chars()
        .take_while(|c| *c != '"' && *c != '\'')
        .any(|c| c == 'f' || c == 'F')
}

/// Position just past the first unescaped `delimiter` in `text`.
fn find_closing(text: &str, delimiter: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let delimiter = delimiter.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i..].starts_with(delimiter) {
            return Some(i + delimiter.len());
        }
        i += 1;
    }
    None
}
