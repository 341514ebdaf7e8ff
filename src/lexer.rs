use std::{iter::Peekable, str::CharIndices};

use crate::token::{Position, Token, TokenKind};

/// Single-pass tokenizer. `next_token` is called repeatedly until it yields an
/// `Eof` token; it never fails. Unknown or unterminated input degrades to
/// `Eof` and the malformed region surfaces later as a parse error.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    file: String,
    line: usize,
    col: usize,
}

fn is_name_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_name_char(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file: impl Into<String>) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            file: file.into(),
            line: 1,
            col: 1,
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let (idx, ch) = match self.chars.peek() {
                Some(&(idx, ch)) => (idx, ch),
                None => return self.eof(),
            };
            match ch {
                ' ' | '\t' => {
                    self.advance();
                }
                '\n' => {
                    let position = self.position(1);
                    self.advance();
                    return Token::new(TokenKind::NewLine, "\n", position);
                }
                '/' if self.peek_second() == Some('/') => return self.read_comment(idx),
                '0'..='9' => return self.read_int(idx),
                '"' | '\'' => return self.read_string(ch),
                '=' => return self.one_or_two(TokenKind::Eq, TokenKind::EqEq),
                '>' => return self.one_or_two(TokenKind::Gt, TokenKind::Gte),
                '<' => return self.one_or_two(TokenKind::Lt, TokenKind::Lte),
                '!' => {
                    if self.peek_second() == Some('=') {
                        let position = self.position(2);
                        self.advance();
                        self.advance();
                        return Token::new(TokenKind::NotEq, "!=", position);
                    }
                    // Bare '!' has no meaning in the language.
                    return self.eof();
                }
                '+' => return self.single(TokenKind::Plus),
                '-' => return self.single(TokenKind::Minus),
                '*' => return self.single(TokenKind::Star),
                '/' => return self.single(TokenKind::Slash),
                '(' => return self.single(TokenKind::LParen),
                ')' => return self.single(TokenKind::RParen),
                '[' => return self.single(TokenKind::LBracket),
                ']' => return self.single(TokenKind::RBracket),
                '{' => return self.single(TokenKind::LBrace),
                '}' => return self.single(TokenKind::RBrace),
                ',' => return self.single(TokenKind::Comma),
                '.' => return self.single(TokenKind::Dot),
                _ if is_name_start(ch) => return self.read_name(idx),
                _ => return self.eof(),
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let position = self.position(1);
        let (_, ch) = self.advance().unwrap_or((0, ' '));
        Token::new(kind, ch.to_string(), position)
    }

    fn one_or_two(&mut self, one: TokenKind, two: TokenKind) -> Token {
        if self.peek_second() == Some('=') {
            let position = self.position(2);
            let first = self.advance().map(|(_, c)| c).unwrap_or(' ');
            self.advance();
            Token::new(two, format!("{first}="), position)
        } else {
            self.single(one)
        }
    }

    fn read_name(&mut self, start: usize) -> Token {
        let position = self.position(0);
        self.advance();
        while let Some(&(_, ch)) = self.chars.peek() {
            if is_name_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.current_index()];
        self.token_with_length(TokenKind::Name, text, position)
    }

    fn read_int(&mut self, start: usize) -> Token {
        let position = self.position(0);
        self.advance();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.current_index()];
        self.token_with_length(TokenKind::Int, text, position)
    }

    fn read_string(&mut self, quote: char) -> Token {
        let position = self.position(0);
        self.advance(); // opening quote
        let content_start = self.current_index();
        loop {
            match self.chars.peek() {
                Some(&(idx, ch)) if ch == quote => {
                    let content = &self.input[content_start..idx];
                    self.advance(); // closing quote
                    let mut position = position;
                    position.length = content.chars().count() + 2;
                    return Token::new(TokenKind::Str, content, position);
                }
                Some(&(_, '\n')) | None => return self.eof(),
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn read_comment(&mut self, start: usize) -> Token {
        let position = self.position(0);
        self.advance(); // '/'
        self.advance(); // '/'
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        let text = &self.input[start + 2..self.current_index()];
        let mut position = position;
        position.length = text.chars().count() + 2;
        Token::new(TokenKind::Comment, text, position)
    }

    fn token_with_length(&self, kind: TokenKind, text: &str, mut position: Position) -> Token {
        position.length = text.chars().count();
        Token::new(kind, text, position)
    }

    fn eof(&mut self) -> Token {
        Token::new(TokenKind::Eof, "", self.position(0))
    }

    fn position(&self, length: usize) -> Position {
        Position::new(self.file.clone(), self.line, self.col, length)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, ch)) = next {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        next
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, ch)| ch)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.input.len())
    }
}

/// Tokenize a whole source, including the terminating `Eof` token.
pub fn tokenize(input: &str, file: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input, file);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input, "").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tracks_exact_positions() {
        let tokens = tokenize("a = 1\nb=2\nc= a + b", "test.rill");
        let expected = vec![
            (TokenKind::Name, 1, 1),
            (TokenKind::Eq, 1, 3),
            (TokenKind::Int, 1, 5),
            (TokenKind::NewLine, 1, 6),
            (TokenKind::Name, 2, 1),
            (TokenKind::Eq, 2, 2),
            (TokenKind::Int, 2, 3),
            (TokenKind::NewLine, 2, 4),
            (TokenKind::Name, 3, 1),
            (TokenKind::Eq, 3, 2),
            (TokenKind::Name, 3, 4),
            (TokenKind::Plus, 3, 6),
            (TokenKind::Name, 3, 8),
            (TokenKind::Eof, 3, 9),
        ];
        let actual = tokens
            .iter()
            .map(|t| (t.kind, t.position.line, t.position.col))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected);
        assert!(tokens.iter().all(|t| t.position.file == "test.rill"));
    }

    #[test]
    fn recognizes_two_char_operators() {
        assert_eq!(
            kinds("a >= b <= c == d != e"),
            vec![
                TokenKind::Name,
                TokenKind::Gte,
                TokenKind::Name,
                TokenKind::Lte,
                TokenKind::Name,
                TokenKind::EqEq,
                TokenKind::Name,
                TokenKind::NotEq,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn emits_comment_tokens_with_payload() {
        let tokens = tokenize("a = 1 // keep me\n", "");
        let comment = &tokens[3];
        assert_eq!(comment.kind, TokenKind::Comment);
        assert_eq!(comment.text, " keep me");
        assert_eq!(comment.position.col, 7);
        assert_eq!(comment.position.length, 10);
    }

    #[test]
    fn reads_single_and_double_quoted_strings() {
        let tokens = tokenize("a = 'one'\nb = \"two\"", "");
        assert_eq!(tokens[2].kind, TokenKind::Str);
        assert_eq!(tokens[2].text, "one");
        assert_eq!(tokens[2].position.length, 5);
        assert_eq!(tokens[6].text, "two");
    }

    #[test]
    fn names_may_contain_digits_after_the_first_char() {
        let tokens = tokenize("b64en2 = 1", "");
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "b64en2");
    }

    #[test]
    fn unknown_input_degrades_to_eof() {
        assert_eq!(
            kinds("a = @ b"),
            vec![TokenKind::Name, TokenKind::Eq, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_degrades_to_eof() {
        assert_eq!(
            kinds("a = 'oops"),
            vec![TokenKind::Name, TokenKind::Eq, TokenKind::Eof]
        );
    }
}
