use std::fmt;

use serde::Serialize;

/// Source coordinate of a token or AST node. Lines and columns are 1-based;
/// `length` counts codepoints, so columns reflect rendered width rather than
/// byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub length: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize, col: usize, length: usize) -> Self {
        Self {
            file: file.into(),
            line,
            col,
            length,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() {
            "<input>"
        } else {
            self.file.as_str()
        };
        write!(f, "{}:{}:{}", file, self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Name,
    Int,
    Str,
    Comment,

    // Operators
    Eq,    // =
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /
    Gt,    // >
    Gte,   // >=
    Lt,    // <
    Lte,   // <=
    EqEq,  // ==
    NotEq, // !=

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,

    // Structural
    NewLine,
    Eof,
}

impl TokenKind {
    /// Operators that may continue an expression after its left operand.
    pub fn is_binary_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Gt
                | TokenKind::Gte
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::EqEq
                | TokenKind::NotEq
        )
    }
}

/// One lexical unit. `text` holds the payload for `Name`/`Int`/`Str`/`Comment`
/// tokens (string contents without quotes, comment text without the `//`) and
/// the literal lexeme for everything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Str => write!(f, "'{}'", self.text),
            TokenKind::Comment => write!(f, "//{}", self.text),
            TokenKind::NewLine => write!(f, "\\n"),
            TokenKind::Eof => write!(f, "<eof>"),
            _ => write!(f, "{}", self.text),
        }
    }
}
