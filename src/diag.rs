//! Diagnostics shared by the lexer, parser and evaluator.

use std::io;

use thiserror::Error;

use crate::token::Token;

/// Line number (starting at one).
pub type Position = u32;

/// An error found during lexical analysis. The lexer skips the offending
/// byte and keeps scanning, so a single pass can report several of these.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("[line {line}] Lexical Error at Char '{ch}': {msg}")]
pub struct LexError {
    pub line: Position,
    pub ch: char,
    pub msg: String,
}

impl LexError {
    pub fn new(line: Position, ch: char, msg: &str) -> LexError {
        LexError {
            line,
            ch,
            msg: msg.to_string(),
        }
    }
}

/// An error found during parsing, anchored at the token where the parser
/// gave up on the current statement.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("[line {line}] Syntax Error at Token '{lexeme}': {msg}")]
pub struct SyntaxError {
    pub line: Position,
    pub lexeme: String,
    pub msg: String,
}

impl SyntaxError {
    pub fn at(token: &Token, msg: &str) -> SyntaxError {
        SyntaxError {
            line: token.line,
            lexeme: token.lexeme.clone(),
            msg: msg.to_string(),
        }
    }
}

/// An error raised while evaluating. Evaluation is fail-fast: the first of
/// these aborts the current top-level statement.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] Runtime Error at '{lexeme}': {msg}")]
    Raise {
        line: Position,
        lexeme: String,
        msg: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub fn at(token: &Token, msg: impl Into<String>) -> RuntimeError {
        RuntimeError::Raise {
            line: token.line,
            lexeme: token.lexeme.clone(),
            msg: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn lex_error_format() {
        let e = LexError::new(3, '#', "Unexpected character.");
        assert_eq!(
            e.to_string(),
            "[line 3] Lexical Error at Char '#': Unexpected character."
        );
    }

    #[test]
    fn syntax_error_format() {
        let token = Token::new(TokenKind::RightParen, ")", 7);
        let e = SyntaxError::at(&token, "expected expression.");
        assert_eq!(
            e.to_string(),
            "[line 7] Syntax Error at Token ')': expected expression."
        );
    }

    #[test]
    fn runtime_error_format() {
        let token = Token::new(TokenKind::Plus, "+", 2);
        let e = RuntimeError::at(&token, "division by zero");
        assert_eq!(
            e.to_string(),
            "[line 2] Runtime Error at '+': division by zero"
        );
    }
}
