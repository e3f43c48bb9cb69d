//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage fails fast: the first violation becomes a `CompileError` and
//! travels straight back to the caller. Located errors render the offending
//! source line with a caret under the column, in the spirit of chibicc.

use std::fmt;
use std::io;
use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Pipeline stage that rejected the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Lexing,
  Parsing,
  Semantic,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Lexing => "lexing",
      Stage::Parsing => "parsing",
      Stage::Semantic => "semantic",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("{stage} error on line {line}: {message}\n{source_line}\n{marker}"))]
  WithLocation {
    stage: Stage,
    line: usize,
    source_line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("failed to read {}: {source}", path.display()))]
  ReadSource { path: PathBuf, source: io::Error },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  WriteOutput { path: PathBuf, source: io::Error },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(stage: Stage, source: &str, loc: usize, message: impl Into<String>) -> Self {
    let mut safe_loc = loc.min(source.len());
    while !source.is_char_boundary(safe_loc) {
      safe_loc -= 1;
    }

    let line_start = source[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |i| safe_loc + i);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..safe_loc].chars().count();

    WithLocationSnafu {
      stage,
      line,
      source_line: &source[line_start..line_end],
      marker: format!("{}^", " ".repeat(column)),
      message,
    }
    .build()
  }

  /// Stage that produced a located error; `None` for I/O failures.
  pub fn stage(&self) -> Option<Stage> {
    match self {
      Self::WithLocation { stage, .. } => Some(*stage),
      _ => None,
    }
  }

  pub fn message(&self) -> Option<&str> {
    match self {
      Self::WithLocation { message, .. } => Some(message),
      _ => None,
    }
  }

  pub fn line(&self) -> Option<usize> {
    match self {
      Self::WithLocation { line, .. } => Some(*line),
      _ => None,
    }
  }
}
