//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and run in a single pass:
//! - `tokenizer` performs lexical analysis and hands out tokens on demand.
//! - `parser` owns all syntactic and semantic knowledge and emits C while it
//!   recognises each statement.
//! - `emitter` collects the declaration header and the statement body and
//!   joins them once the program has been accepted.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod emitter;
pub mod error;
pub mod parser;
pub mod tokenizer;

use std::fs;
use std::path::Path;

use snafu::ResultExt;
use tracing::debug;

pub use emitter::Emitter;
pub use error::{CompileError, CompileResult, Stage};
pub use parser::Parser;
pub use tokenizer::{Lexer, Token, TokenKind};

/// Compile a source string into a complete C program.
pub fn compile(source: &str) -> CompileResult<String> {
  Ok(translate(source)?.finish())
}

/// Compile `input` and write the C program to `output`.
///
/// Nothing is written unless the whole program translates.
pub fn compile_file(input: &Path, output: &Path) -> CompileResult<()> {
  let source = read_source(input)?;
  translate(&source)?.write_file(output)
}

/// Read a whole source file.
pub fn read_source(path: &Path) -> CompileResult<String> {
  let source = fs::read_to_string(path).context(error::ReadSourceSnafu { path })?;
  debug!(path = %path.display(), bytes = source.len(), "read source");
  Ok(source)
}

fn translate(source: &str) -> CompileResult<Emitter> {
  let mut emitter = Emitter::new();
  Parser::new(Lexer::new(source), &mut emitter)?.program()?;
  Ok(emitter)
}
