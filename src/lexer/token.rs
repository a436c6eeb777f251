use logos::Logos;

/// Tokens of a single Python source line. Only the shapes the scanner cares
/// about are distinguished; everything else collapses into `Op`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
pub enum Token {
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("class")]
    Class,
    #[token("def")]
    Def,
    #[token("async")]
    Async,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9A-Za-z_]*)?")]
    Number,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("*")]
    Star,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,
    #[token(";")]
    Semi,
    #[regex(r"==|!=|<=|>=|:=|->|\*\*=?|//=?|>>=?|<<=?|[-+*/%&|^@]=")]
    #[regex(r"[-+/%&|^@~<>\[\]{}!\\]")]
    Op,

    #[regex(r#"[rRbBuUfF]{0,2}"([^"\\\n]|\\.)*""#)]
    #[regex(r#"[rRbBuUfF]{0,2}'([^'\\\n]|\\.)*'"#)]
    Str,
    #[regex(r#"[rRbBuUfF]{0,2}""""#)]
    #[regex(r#"[rRbBuUfF]{0,2}'''"#)]
    TripleQuote,

    #[regex(r"#[^\n]*")]
    Comment,
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Returns true if `name` is a reserved Python keyword.
pub fn is_keyword(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
}

/// Returns true if `c` can appear inside a Python identifier.
pub fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
