use std::fmt;

use crate::lexer::token::Token;
use crate::span::Spanned;

/// One clause of an import statement. A statement like `import a, b as c`
/// yields one form per clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportForm {
    /// `from X import *`
    Wildcard { module: String },
    /// `from X import Y as Z`
    AliasedSingle { module: String, symbol: String, alias: String },
    /// `from X import Y`
    UnaliasedSingle { module: String, symbol: String },
    /// `import X as Z`
    AliasedModule { module: String, alias: String },
    /// `import X`
    PlainModule { module: String },
}

impl ImportForm {
    pub fn module(&self) -> &str {
        match self {
            ImportForm::Wildcard { module }
            | ImportForm::AliasedSingle { module, .. }
            | ImportForm::UnaliasedSingle { module, .. }
            | ImportForm::AliasedModule { module, .. }
            | ImportForm::PlainModule { module } => module,
        }
    }

    /// Plain `import X` of an external module is covered by the header the
    /// emitter writes; every other form binds a name that must survive in place.
    pub fn is_plain(&self) -> bool {
        matches!(self, ImportForm::PlainModule { .. })
    }

    /// `from __future__ import X`: a compiler directive, only valid at the
    /// start of a file.
    pub fn is_future(&self) -> bool {
        self.module() == FUTURE_MODULE && !self.is_plain()
    }

    /// The name this clause binds at module scope and what it refers to
    /// (`module` or `module.symbol`). Plain imports and wildcards bind no
    /// single chosen name.
    pub fn binding(&self) -> Option<(&str, String)> {
        match self {
            ImportForm::AliasedSingle { module, symbol, alias } => Some((alias.as_str(), format!("{module}.{symbol}"))),
            ImportForm::UnaliasedSingle { module, symbol } => Some((symbol.as_str(), format!("{module}.{symbol}"))),
            ImportForm::AliasedModule { module, alias } => Some((alias.as_str(), module.clone())),
            ImportForm::Wildcard { .. } | ImportForm::PlainModule { .. } => None,
        }
    }
}

pub const FUTURE_MODULE: &str = "__future__";

impl fmt::Display for ImportForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportForm::Wildcard { module } => write!(f, "from {module} import *"),
            ImportForm::AliasedSingle { module, symbol, alias } => {
                write!(f, "from {module} import {symbol} as {alias}")
            }
            ImportForm::UnaliasedSingle { module, symbol } => write!(f, "from {module} import {symbol}"),
            ImportForm::AliasedModule { module, alias } => write!(f, "import {module} as {alias}"),
            ImportForm::PlainModule { module } => write!(f, "import {module}"),
        }
    }
}

/// Render clauses back into a single source line.
pub fn render(forms: &[&ImportForm]) -> String {
    forms.iter().map(|f| f.to_string()).collect::<Vec<_>>().join("; ")
}

/// Classify a lexed line as an import statement. Returns `None` when the line
/// does not start with `import`/`from` or is not entirely an import statement
/// (relative imports, trailing code after `;`, multi-line parenthesized lists).
pub fn classify(tokens: &[Spanned<Token>], line: &str) -> Option<Vec<ImportForm>> {
    let mut cursor = Cursor { tokens, line, pos: 0 };
    let forms = match cursor.advance()? {
        Token::Import => cursor.import_clauses()?,
        Token::From => cursor.from_clauses()?,
        _ => return None,
    };
    cursor.at_end().then_some(forms)
}

struct Cursor<'a> {
    tokens: &'a [Spanned<Token>],
    line: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.node)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, expected: Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn ident(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos)?;
        if token.node != Token::Ident {
            return None;
        }
        self.pos += 1;
        Some(token.text(self.line))
    }

    fn dotted_name(&mut self) -> Option<String> {
        let mut name = self.ident()?.to_string();
        while self.eat(Token::Dot) {
            name.push('.');
            name.push_str(self.ident()?);
        }
        Some(name)
    }

    fn import_clauses(&mut self) -> Option<Vec<ImportForm>> {
        let mut forms = Vec::new();
        loop {
            let module = self.dotted_name()?;
            if self.eat(Token::As) {
                let alias = self.ident()?.to_string();
                forms.push(ImportForm::AliasedModule { module, alias });
            } else {
                forms.push(ImportForm::PlainModule { module });
            }
            if !self.eat(Token::Comma) {
                return Some(forms);
            }
        }
    }

    fn from_clauses(&mut self) -> Option<Vec<ImportForm>> {
        let module = self.dotted_name()?;
        if !self.eat(Token::Import) {
            return None;
        }
        if self.eat(Token::Star) {
            return Some(vec![ImportForm::Wildcard { module }]);
        }

        let parenthesized = self.eat(Token::LParen);
        let mut forms = Vec::new();
        loop {
            let symbol = self.ident()?.to_string();
            if self.eat(Token::As) {
                let alias = self.ident()?.to_string();
                forms.push(ImportForm::AliasedSingle { module: module.clone(), symbol, alias });
            } else {
                forms.push(ImportForm::UnaliasedSingle { module: module.clone(), symbol });
            }
            if !self.eat(Token::Comma) {
                break;
            }
            if parenthesized && self.peek() == Some(Token::RParen) {
                break;
            }
        }
        if parenthesized && !self.eat(Token::RParen) {
            return None;
        }
        Some(forms)
    }
}
