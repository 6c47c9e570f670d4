pub mod codegen;
mod environment;
pub mod error;
mod expr;
pub mod interpreter;
pub mod parser;
pub mod preprocessor;
pub mod printer;
pub mod scanner;
mod stmt;
mod token;
mod value;

use std::io::{BufRead, Write};

pub use crate::error::{Error, ErrorKind, Result};

use crate::{codegen::CodeGenerator, interpreter::Interpreter};

/// Parses and runs `source`, printing to `writer` and reading `read()` input
/// from `reader`. Nothing runs unless the whole program parses.
pub fn run<W: Write, R: BufRead>(source: &str, writer: W, reader: R) -> Result<()> {
    let program = parser::parse(source)?;
    Interpreter::new(writer, reader).interpret(&program)
}

/// Parses `source` without running it and renders the tree as S-expressions.
pub fn dump_ast(source: &str) -> Result<String> {
    let program = parser::parse(source)?;
    Ok(printer::print(&program))
}

/// Compiles `source` to NASM assembly text.
pub fn compile(source: &str) -> Result<String> {
    let program = parser::parse(source)?;
    CodeGenerator::new().generate(&program)
}
