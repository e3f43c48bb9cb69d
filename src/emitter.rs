//! Output buffers for the generated C program.
//!
//! Declarations have to precede the statements that use them, but the parser
//! only discovers a variable when it is first assigned. The emitter therefore
//! keeps two buffers and joins them once the whole program has been accepted.

use std::fs;
use std::path::Path;

use snafu::ResultExt;
use tracing::debug;

use crate::error::{CompileResult, WriteOutputSnafu};

#[derive(Debug, Default, Clone)]
pub struct Emitter {
  header: String,
  body: String,
}

impl Emitter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn header_line(&mut self, code: &str) {
    self.header.push_str(code);
    self.header.push('\n');
  }

  pub fn emit(&mut self, code: &str) {
    self.body.push_str(code);
  }

  pub fn emit_line(&mut self, code: &str) {
    self.body.push_str(code);
    self.body.push('\n');
  }

  pub fn header(&self) -> &str {
    &self.header
  }

  pub fn body(&self) -> &str {
    &self.body
  }

  pub fn body_ends_with(&self, c: char) -> bool {
    self.body.ends_with(c)
  }

  /// Header followed by body.
  pub fn finish(&self) -> String {
    let mut out = String::with_capacity(self.header.len() + self.body.len());
    out.push_str(&self.header);
    out.push_str(&self.body);
    out
  }

  /// Write the finished program to `path` in a single write.
  pub fn write_file(&self, path: &Path) -> CompileResult<()> {
    let out = self.finish();
    debug!(path = %path.display(), bytes = out.len(), "writing output");
    fs::write(path, out).context(WriteOutputSnafu { path })
  }
}
