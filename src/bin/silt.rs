//! silt command-line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop. When called with a script path it runs that
//! script. Diagnostics go to standard error through the logger; program
//! output goes to standard output.

use std::env;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::process;

use anyhow::Context;

use silt::interpreter::Interpreter;

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => run_prompt()?,
        [path] => run_file(path)?,
        _ => {
            println!("Usage: silt [script]");
            process::exit(64);
        }
    }
    Ok(())
}

fn run_file(path: &str) -> Result<(), anyhow::Error> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);
    if let Err(e) = interp.run(&source) {
        e.report();
        process::exit(2);
    }

    Ok(())
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();

    let mut interp = Interpreter::new(&mut interp_stdout);

    let mut input = String::new();
    loop {
        repl_stdout.write_all(b"> ")?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 {
            break;
        }

        // Each line is a complete program; errors don't end the session.
        if let Err(e) = interp.run(&input) {
            e.report();
        }
    }

    Ok(())
}
