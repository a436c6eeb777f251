use crate::lexer::{is_keyword, LexedLine};
use crate::lexer::token::Token;
use crate::span::Span;

/// Module attributes the interpreter sets on its own. Assigning one does not
/// declare a symbol other modules can import.
const INTERPRETER_NAMES: &[&str] = &[
    "__name__", "__file__", "__doc__", "__spec__", "__loader__", "__package__", "__builtins__",
];

/// Names declared at module level by this line: `class NAME`, `def NAME`,
/// `async def NAME`, and assignment targets (`NAME = ...`, `NAME: T = ...`,
/// `A, B = ...`, `a = b = ...`). Indented lines and lines that start inside a
/// multi-line string declare nothing.
pub fn declared_names(lexed: &LexedLine, line: &str) -> Vec<String> {
    match lexed.tokens.first() {
        Some(first) if first.span.start == 0 => {}
        _ => return Vec::new(),
    }
    defined_spans(lexed)
        .into_iter()
        .map(|span| &line[span.range()])
        .filter(|name| is_declarable(name))
        .map(str::to_string)
        .collect()
}

/// Spans of the names this statement defines, at any indentation.
pub fn defined_spans(lexed: &LexedLine) -> Vec<Span> {
    if lexed.starts_in_string {
        return Vec::new();
    }
    let tokens = &lexed.tokens;
    let kinds: Vec<Token> = tokens.iter().map(|t| t.node).collect();
    let targets = match kinds.as_slice() {
        [Token::Class, Token::Ident, ..] | [Token::Def, Token::Ident, ..] => vec![1],
        [Token::Async, Token::Def, Token::Ident, ..] => vec![2],
        _ => assignment_targets(&kinds),
    };
    targets.into_iter().map(|idx| tokens[idx].span).collect()
}

/// Token indices of the identifiers bound by an assignment statement.
fn assignment_targets(kinds: &[Token]) -> Vec<usize> {
    let mut targets = Vec::new();
    let mut pos = 0;

    // `NAME: T = value`
    if let [Token::Ident, Token::Colon, rest @ ..] = kinds {
        if rest.contains(&Token::Assign) {
            targets.push(0);
        }
        return targets;
    }

    while let Some((names, next)) = target_list(kinds, pos) {
        if kinds.get(next) != Some(&Token::Assign) {
            break;
        }
        targets.extend(names);
        pos = next + 1;
    }
    targets
}

/// `NAME (, NAME)* [,]` starting at `pos`. Returns the identifier indices and
/// the position after the list.
fn target_list(kinds: &[Token], mut pos: usize) -> Option<(Vec<usize>, usize)> {
    let mut names = Vec::new();
    loop {
        if kinds.get(pos) != Some(&Token::Ident) {
            break;
        }
        names.push(pos);
        pos += 1;
        if kinds.get(pos) != Some(&Token::Comma) {
            break;
        }
        pos += 1;
    }
    (!names.is_empty()).then_some((names, pos))
}

fn is_declarable(name: &str) -> bool {
    !is_keyword(name) && !INTERPRETER_NAMES.contains(&name)
}
