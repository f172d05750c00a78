//! Lexical analyzer.

use crate::diag::{LexError, Position};
use crate::token::{keyword, Literal, Token, TokenKind};

/// Turns source text into a token stream.
///
/// Lexical errors do not abort the scan: the offending byte is skipped, the
/// error is collected, and scanning continues. The returned token list always
/// ends with an `Eof` token.
pub struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],

    // Offsets delimiting the lexeme being scanned.
    start: usize,
    current: usize,

    line: Position,
    start_line: Position,

    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Lexer<'s> {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            start_line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source and return all tokens and all lexical errors.
    pub fn scan(mut self) -> (Vec<Token>, Vec<LexError>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line));
        (self.tokens, self.errors)
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            b'(' => self.add_token(TokenKind::LeftParen),
            b')' => self.add_token(TokenKind::RightParen),
            b'{' => self.add_token(TokenKind::LeftBrace),
            b'}' => self.add_token(TokenKind::RightBrace),
            b',' => self.add_token(TokenKind::Comma),
            b'.' => self.add_token(TokenKind::Dot),
            b';' => self.add_token(TokenKind::Semicolon),
            b'-' => self.add_token(TokenKind::Minus),
            b'+' => self.add_token(TokenKind::Plus),
            b'*' => self.add_token(TokenKind::Star),
            b'!' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            b'/' => {
                if self.match_byte(b'/') {
                    self.line_comment();
                } else if self.match_byte(b'*') {
                    self.block_comment();
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            b'"' => self.string(),
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),
            b'\n' => self.line += 1,
            b' ' | b'\t' | b'\r' => (),
            _ => self.error(c as char, "Unexpected character."),
        }
    }

    fn line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' {
            self.current += 1;
        }
    }

    /// Block comments nest: every `/*` inside the comment must be closed by
    /// its own `*/`.
    fn block_comment(&mut self) {
        let mut depth = 1u32;
        while depth > 0 && !self.is_at_end() {
            match self.advance() {
                b'/' if self.peek() == b'*' => {
                    self.current += 1;
                    depth += 1;
                }
                b'*' if self.peek() == b'/' => {
                    self.current += 1;
                    depth -= 1;
                }
                b'\n' => self.line += 1,
                _ => (),
            }
        }
        if depth > 0 {
            self.error('*', "Unterminated block comment.");
        }
    }

    fn string(&mut self) {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.current += 1;
        }

        if self.is_at_end() {
            self.error('"', "Unterminated string.");
            return;
        }

        // Closing '"'
        self.current += 1;

        // The payload excludes the surrounding quotes.
        let text = self.source[self.start + 1..self.current - 1].to_string();
        self.add_literal_token(TokenKind::Str, Literal::Str(text));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }

        // A '.' only belongs to the number when a digit follows it.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1;
            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
        }

        let n = self.source[self.start..self.current]
            .parse::<f64>()
            .expect("numeric lexeme is a valid float by construction");
        self.add_literal_token(TokenKind::Number, Literal::Num(n));
    }

    fn identifier(&mut self) {
        while is_identifier_byte(self.peek()) {
            self.current += 1;
        }

        match keyword(&self.source[self.start..self.current]) {
            Some(TokenKind::True) => self.add_literal_token(TokenKind::True, Literal::Bool(true)),
            Some(TokenKind::False) => {
                self.add_literal_token(TokenKind::False, Literal::Bool(false))
            }
            Some(kind) => self.add_token(kind),
            None => self.add_token(TokenKind::Identifier),
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens.push(Token::new(kind, lexeme, self.start_line));
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal) {
        let lexeme = &self.source[self.start..self.current];
        self.tokens
            .push(Token::with_literal(kind, lexeme, literal, self.start_line));
    }

    fn error(&mut self, ch: char, msg: &str) {
        self.errors.push(LexError::new(self.line, ch, msg));
    }

    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.current];
        self.current += 1;
        c
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            b'\0'
        } else {
            self.bytes[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            b'\0'
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
