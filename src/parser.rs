//! Recursive-descent parser with statement-level error recovery.
//!
//! The grammar, one method per rule:
//!
//! ```text
//! program     → declaration* EOF
//! declaration → funDecl | varDecl | statement
//! funDecl     → "fun" IDENT "(" params? ")" block
//! varDecl     → "var" IDENT ("=" expression)? ";"
//! statement   → exprStmt | printStmt | ifStmt | whileStmt | forStmt
//!             | breakStmt | block
//!
//! expression  → comma
//! comma       → assignment ("," assignment)*
//! assignment  → IDENT "=" assignment | logic_or
//! logic_or    → logic_and ("or" logic_and)*
//! logic_and   → equality ("and" equality)*
//! equality    → comparison (("!=" | "==") comparison)*
//! comparison  → term ((">" | ">=" | "<" | "<=") term)*
//! term        → factor (("-" | "+") factor)*
//! factor      → unary (("/" | "*") unary)*
//! unary       → ("!" | "-") unary | call
//! call        → primary ("(" args? ")")*
//! primary     → NUMBER | STRING | IDENT | "true" | "false" | "nil"
//!             | "(" expression ")"
//! ```
//!
//! On a parse error the statement being parsed is discarded and the parser
//! synchronizes to the next statement boundary, so one run reports every
//! syntax error in the program.

use std::rc::Rc;

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::diag::SyntaxError;
use crate::token::{Literal, Token, TokenKind};

const MAX_CALL_ARGS: usize = 255;

type ParseResult<T> = Result<T, SyntaxError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
    loop_depth: u32,
}

impl Parser {
    /// The token list must end with an `Eof` token, as produced by `Lexer`.
    pub fn new(tokens: Vec<Token>) -> Parser {
        debug_assert!(matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof));
        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Parse a program. Statements containing an error are discarded; the
    /// rest are returned together with every collected error.
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<SyntaxError>) {
        let mut stmts = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        (stmts, self.errors)
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::Fun) {
            self.fun_decl()
        } else if self.match_kind(TokenKind::Var) {
            self.var_decl()
        } else {
            self.statement()
        }
    }

    /// The `fun` keyword has been consumed.
    fn fun_decl(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "expected identifier after 'fun'.")?;
        self.consume(TokenKind::LeftParen, "expected '(' after function name.")?;

        let mut params = Vec::new();
        if !self.match_kind(TokenKind::RightParen) {
            loop {
                params.push(self.consume(
                    TokenKind::Identifier,
                    "function parameter needs to be an identifier.",
                )?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(
                TokenKind::RightParen,
                "expected ')' after function parameters.",
            )?;
        }

        self.consume(TokenKind::LeftBrace, "expected '{' before function body.")?;
        let body = self.block_body()?;
        Ok(Stmt::FunDecl(Rc::new(FunctionDecl { name, params, body })))
    }

    /// The `var` keyword has been consumed.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "expected identifier after 'var'.")?;
        let init = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            "expected ; after variable declaration.",
        )?;
        Ok(Stmt::VarDecl { name, init })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block_body()?));
        }
        if self.match_kind(TokenKind::If) {
            return self.if_stmt();
        }
        if self.match_kind(TokenKind::While) {
            return self.in_loop(|p| p.while_stmt());
        }
        if self.match_kind(TokenKind::For) {
            return self.in_loop(|p| p.for_stmt());
        }
        if self.match_kind(TokenKind::Print) {
            return self.print_stmt();
        }
        if self.match_kind(TokenKind::Break) {
            return self.break_stmt();
        }
        self.expr_stmt()
    }

    /// Parses the statements of a block. The opening `{` has been consumed.
    ///
    /// Recovers from errors inside the block so one bad statement does not
    /// abandon the rest of it.
    fn block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();

        // Empty blocks are allowed.
        if self.match_kind(TokenKind::RightBrace) {
            return Ok(body);
        }

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => {
                    body.push(stmt);
                    if self.match_kind(TokenKind::RightBrace) {
                        return Ok(body);
                    }
                }
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    // The skip may have consumed the closing brace.
                    if self.previous().kind == TokenKind::RightBrace {
                        return Ok(body);
                    }
                }
            }
        }

        Err(SyntaxError::at(self.peek(), "missing closing '}'."))
    }

    /// The `if` keyword has been consumed.
    fn if_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected condition after 'if'.")?;
        let cond = self.expression()?;
        self.consume(
            TokenKind::RightParen,
            "missing closing ')' after 'if' condition.",
        )?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    /// The `while` keyword has been consumed.
    fn while_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected condition after 'while'.")?;
        let cond = self.expression()?;
        self.consume(
            TokenKind::RightParen,
            "missing closing ')' after 'while' condition.",
        )?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { cond, body })
    }

    /// The `for` keyword has been consumed. The loop is desugared during
    /// parsing into a `while` inside a block:
    ///
    /// ```text
    /// for (init; cond; incr) body  →  { init; while (cond) { body incr; } }
    /// ```
    fn for_stmt(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "expected condition after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Var) {
            Some(self.var_decl()?)
        } else if self.match_kind(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expr_stmt()?)
        };

        // An omitted condition loops forever, as in C.
        let cond = if self.check(TokenKind::Semicolon) {
            Expr::Literal(Token::with_literal(
                TokenKind::True,
                "true",
                Literal::Bool(true),
                self.peek().line,
            ))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "expected ';' after 'for' condition")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(
            TokenKind::RightParen,
            "expected closing ')' after 'for' increment",
        )?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            // Append the increment to the body, reusing the body's own block
            // when it already is one.
            body = match body {
                Stmt::Block(mut stmts) => {
                    stmts.push(Stmt::Expr(increment));
                    Stmt::Block(stmts)
                }
                other => Stmt::Block(vec![other, Stmt::Expr(increment)]),
            };
        }

        let mut stmt = Stmt::While {
            cond,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            stmt = Stmt::Block(vec![initializer, stmt]);
        }
        Ok(stmt)
    }

    /// The `print` keyword has been consumed.
    fn print_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ; after print statement.")?;
        Ok(Stmt::Print(expr))
    }

    /// The `break` keyword has been consumed. `break` is only valid inside a
    /// loop, which the parser checks statically.
    fn break_stmt(&mut self) -> ParseResult<Stmt> {
        if self.loop_depth == 0 {
            return Err(SyntaxError::at(
                self.previous(),
                "break statement outside of loop.",
            ));
        }
        self.consume(TokenKind::Semicolon, "expected ';' after break.")?;
        Ok(Stmt::Break)
    }

    fn expr_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ; after expression.")?;
        Ok(Stmt::Expr(expr))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.comma()
    }

    fn comma(&mut self) -> ParseResult<Expr> {
        let mut expr = self.assignment()?;
        while self.match_kind(TokenKind::Comma) {
            let op = self.previous().clone();
            let right = self.assignment()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        // Parse the lhs as a general expression and only then check that it
        // is a valid assignment target. This keeps complex l-value syntax
        // parseable even though only plain identifiers are assignable.
        let expr = self.logic_or()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return match expr {
                Expr::Identifier(target) => Ok(Expr::Assign {
                    target,
                    value: Box::new(value),
                }),
                _ => Err(SyntaxError::at(
                    &equals,
                    "lhs of assignment is not an identifier.",
                )),
            };
        }
        Ok(expr)
    }

    fn logic_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logic_and()?;
        while self.match_kind(TokenKind::Or) {
            let right = self.logic_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn logic_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::And) {
            let right = self.equality()?;
            expr = Expr::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_kinds(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.match_kinds(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_kinds(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_kinds(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_kinds(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.match_kind(TokenKind::LeftParen) {
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_CALL_ARGS {
                    return Err(SyntaxError::at(
                        self.peek(),
                        "can't have more than 255 arguments.",
                    ));
                }
                args.push(self.assignment()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "expected ')' after argument list.")?;
        Ok(Expr::Call {
            paren,
            callee: Box::new(callee),
            args,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        match self.peek().kind {
            TokenKind::Number
            | TokenKind::Str
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil => Ok(Expr::Literal(self.advance().clone())),
            TokenKind::Identifier => Ok(Expr::Identifier(self.advance().clone())),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after expression.")?;
                Ok(Expr::Grouping(Box::new(inner)))
            }
            _ => Err(SyntaxError::at(self.peek(), "expected expression.")),
        }
    }

    /// Skips tokens until a likely statement boundary: just past a `;` or
    /// `}`, or just before a token that begins a statement.
    fn synchronize(&mut self) {
        if self.is_at_end() {
            return;
        }
        self.advance();

        while !self.is_at_end() {
            if matches!(
                self.previous().kind,
                TokenKind::Semicolon | TokenKind::RightBrace
            ) {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::LeftBrace => return,
                _ => (),
            }
            self.advance();
        }
    }

    fn in_loop<T>(&mut self, f: impl FnOnce(&mut Parser) -> T) -> T {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    /// Consumes the current token if it has the given kind.
    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.current += 1;
            return true;
        }
        false
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.match_kind(kind))
    }

    /// Consumes and returns the current token if it has the given kind,
    /// otherwise errors with `msg` at the current token.
    fn consume(&mut self, kind: TokenKind, msg: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(SyntaxError::at(self.peek(), msg))
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        debug_assert!(self.current > 0, "no token consumed yet");
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
}
