//! API to control the interpreter.

use std::io::Write;

use log::{debug, error};
use thiserror::Error;

use crate::diag::{LexError, RuntimeError, SyntaxError};
use crate::eval::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// Tree-walking interpreter.
///
/// Global state persists across [`Interpreter::run`] calls, so a REPL can
/// define a function on one line and call it on the next:
///
/// ```
/// # use silt::interpreter::{Interpreter, InterpretError};
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.run("fun greet(name) { print \"hi \" + name; }")?;
/// interp.run("greet(\"silt\");")?;
///
/// assert_eq!(output, b"hi silt\n");
/// # Ok::<(), InterpretError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
///
/// The lexer and parser run to completion and report everything they found;
/// evaluation stops at the first runtime error.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("errors in lexer")]
    Lex(Vec<LexError>),
    #[error("errors in parser")]
    Syntax(Vec<SyntaxError>),
    #[error("error in evaluator")]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    /// Logs every collected diagnostic on the error channel.
    pub fn report(&self) {
        match self {
            InterpretError::Lex(errors) => {
                for e in errors {
                    error!("{}", e);
                }
            }
            InterpretError::Syntax(errors) => {
                for e in errors {
                    error!("{}", e);
                }
            }
            InterpretError::Runtime(e) => error!("{}", e),
        }
    }
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        Interpreter {
            evaluator: Evaluator::new(output),
        }
    }

    /// Runs a complete program: lex, parse, execute.
    ///
    /// Lexical errors stop the pipeline before parsing; syntax errors stop it
    /// before execution. In both cases every collected error is returned.
    pub fn run(&mut self, source: &str) -> Result<(), InterpretError> {
        let (tokens, errors) = Lexer::new(source).scan();
        if !errors.is_empty() {
            return Err(InterpretError::Lex(errors));
        }
        debug!("scanned {} tokens", tokens.len());

        let (stmts, errors) = Parser::new(tokens).parse();
        if !errors.is_empty() {
            return Err(InterpretError::Syntax(errors));
        }
        debug!("parsed {} statements", stmts.len());

        self.evaluator.run(&stmts)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn interpret(input: &str) -> Result<String, InterpretError> {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        interp.run(input)?;
        Ok(String::from_utf8(raw_output).expect("cannot convert output to string"))
    }

    /// Like `interpret` but also returns whatever was printed before the
    /// error.
    fn interpret_err(input: &str) -> (String, InterpretError) {
        let mut raw_output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut raw_output);
        let err = interp.run(input).expect_err("expected an error");
        (
            String::from_utf8(raw_output).expect("cannot convert output to string"),
            err,
        )
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(interpret("print 1 + 2 * 3;").unwrap(), "7\n");
    }

    #[test]
    fn concat_then_type_error() {
        let (output, err) = interpret_err("print \"a\" + \"b\"; print 1 + \"b\";");
        assert_eq!(output, "ab\n");
        match err {
            InterpretError::Runtime(RuntimeError::Raise { line, lexeme, msg }) => {
                assert_eq!(line, 1);
                assert_eq!(lexeme, "+");
                assert!(msg.starts_with("Expected either [Number Number]"));
            }
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn scoping_and_shadowing() {
        let prg = "
            var a = 1;
            { var a = 2; print a; }
            print a;
        ";
        assert_eq!(interpret(prg).unwrap(), "2\n1\n");
    }

    #[test]
    fn block_reads_and_writes_enclosing_scope() {
        assert_eq!(
            interpret("var foo = 2; { foo = foo + 1; } print foo;").unwrap(),
            "3\n"
        );
    }

    #[test]
    fn for_loop() {
        assert_eq!(
            interpret("for (var i = 0; i < 3; i = i + 1) print i;").unwrap(),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn while_loop() {
        let prg = "
            var i = 0;
            while (i < 5) {
                print i;
                i = i + 1;
            }
        ";
        assert_eq!(interpret(prg).unwrap(), "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn break_in_nested_loops() {
        let prg = "
            while (true) { while (true) { break; } print \"inner-done\"; break; }
            print \"outer-done\";
        ";
        assert_eq!(interpret(prg).unwrap(), "inner-done\nouter-done\n");
    }

    #[test]
    fn break_leaves_following_statements_alone() {
        let prg = "
            for (var i = 0; i < 10; i = i + 1) {
                if (i == 2) break;
                print i;
            }
            print \"after\";
        ";
        assert_eq!(interpret(prg).unwrap(), "0\n1\nafter\n");
    }

    #[test]
    fn if_else() {
        assert_eq!(
            interpret("var a; if (2 + 2 == 4) a = 1; else a = 2; print a;").unwrap(),
            "1\n"
        );
        assert_eq!(
            interpret("var a; if (2 + 2 != 4) a = 1; else a = 2; print a;").unwrap(),
            "2\n"
        );
    }

    #[test]
    fn function_arity_mismatch_and_success() {
        let (output, err) = interpret_err("fun add(a, b) { print a + b; } add(1);");
        assert_eq!(output, "");
        match err {
            InterpretError::Runtime(RuntimeError::Raise { msg, .. }) => {
                assert_eq!(msg, "callee expects 2 arguments, got 1");
            }
            e => panic!("unexpected error: {:?}", e),
        }

        assert_eq!(
            interpret("fun add(a, b) { print a + b; } add(1, 2);").unwrap(),
            "3\n"
        );
    }

    #[test]
    fn function_sees_globals_not_caller_locals() {
        let prg = "
            var a = 1;
            fun show() { print a; }
            fun wrapper() { var a = 99; show(); }
            wrapper();
        ";
        assert_eq!(interpret(prg).unwrap(), "1\n");
    }

    #[test]
    fn function_assignment_crosses_root_to_globals() {
        let prg = "
            var a = 1;
            fun bump() { a = a + 1; }
            bump();
            print a;
        ";
        assert_eq!(interpret(prg).unwrap(), "2\n");
    }

    #[test]
    fn function_cannot_read_caller_locals() {
        let prg = "
            fun peek() { print hidden; }
            {
                var hidden = 1;
                peek();
            }
        ";
        let (_, err) = interpret_err(prg);
        match err {
            InterpretError::Runtime(RuntimeError::Raise { msg, .. }) => {
                assert_eq!(msg, "undeclared identifier.");
            }
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn recursion_works_through_globals() {
        let prg = "
            fun countdown(n) {
                if (n > 0) {
                    print n;
                    countdown(n - 1);
                }
            }
            countdown(3);
        ";
        assert_eq!(interpret(prg).unwrap(), "3\n2\n1\n");
    }

    #[test]
    fn state_persists_across_runs() {
        let mut output: Vec<u8> = Vec::new();
        let mut interp = Interpreter::new(&mut output);
        interp.run("var a = 40;").unwrap();
        interp.run("a = a + 2;").unwrap();
        interp.run("print a;").unwrap();
        assert_eq!(output, b"42\n");
    }

    #[test]
    fn lexical_errors_are_all_collected() {
        let (output, err) = interpret_err("var a = #1; @");
        assert_eq!(output, "");
        match err {
            InterpretError::Lex(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].ch, '#');
                assert_eq!(errors[1].ch, '@');
            }
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn syntax_errors_are_all_collected() {
        let (_, err) = interpret_err("var 1; print 2 print 3;");
        match err {
            InterpretError::Syntax(errors) => assert_eq!(errors.len(), 2),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn lexical_errors_preempt_parsing() {
        // The source has both a bad byte and a syntax error; only the
        // lexical one is reported.
        let (_, err) = interpret_err("var 1; #");
        assert!(matches!(err, InterpretError::Lex(_)));
    }

    #[test]
    fn string_round_trip_has_no_quotes() {
        assert_eq!(interpret("print \"abc\";").unwrap(), "abc\n");
    }

    #[test]
    fn empty_string_and_zero_are_truthy() {
        assert_eq!(
            interpret("if (\"\") print \"s\"; if (0) print \"z\";").unwrap(),
            "s\nz\n"
        );
    }

    #[test]
    fn comments_are_ignored_end_to_end() {
        let prg = "
            // line comment
            /* block /* nested */ comment */
            print 1;
        ";
        assert_eq!(interpret(prg).unwrap(), "1\n");
    }
}
