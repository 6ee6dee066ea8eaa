//! Cinder - a small imperative scripting language
//!
//! Source text is lexed into tokens, parsed into a [`Program`], and run by a
//! tree-walking [`Interpreter`] over a chain of lexical scopes.

pub mod token;
pub mod lexer;
pub mod parser;
pub mod ast;
pub mod value;
pub mod environment;
pub mod interpreter;
pub mod builtins;
pub mod print_handler;
pub mod stack;
pub mod error;

use std::sync::Once;

pub use ast::Program;
pub use environment::Environment;
pub use error::{CinderError, ErrorKind, Result};
pub use interpreter::{Interpreter, MAX_CALL_DEPTH};
pub use lexer::Lexer;
pub use parser::Parser;
pub use print_handler::PrintHandler;
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call more than once.
/// Enable with `RUST_LOG=cinder=debug` or `RUST_LOG=cinder=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

/// Lex and parse `source` into a program
pub fn parse(source: &str) -> Result<Program> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

/// Run `source` in a fresh interpreter printing to stdout
pub fn run(source: &str) -> Result<()> {
    let program = parse(source)?;
    Interpreter::new().interpret(&program)
}

/// Run `source` in a fresh interpreter and return everything it printed
pub fn run_captured(source: &str) -> Result<String> {
    let output = PrintHandler::buffer();
    let program = parse(source)?;
    Interpreter::with_output(output.clone()).interpret(&program)?;
    Ok(output.contents())
}

/// Version of the Cinder language
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
