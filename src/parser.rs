//! Recursive-descent parser that emits C while it recognises the program.
//!
//! There is no syntax tree: every production writes its translation into the
//! [`Emitter`] as soon as it is matched, so the body buffer grows in the same
//! order the tokens are consumed. The helpers follow the grammar's precedence
//! ladder (comparison, expression, term, unary, primary) and C's own operator
//! precedence reproduces it in the output without extra parentheses.
//!
//! Semantic checks run inline as well. The one exception is the label closure
//! check, which has to wait for the end of the program because a `GOTO` may
//! jump forward to a `LABEL` declared later.

use std::collections::HashSet;
use std::mem;

use tracing::{debug, trace};

use crate::emitter::Emitter;
use crate::error::{CompileError, CompileResult, Stage};
use crate::tokenizer::{Lexer, Token, TokenKind, describe_token};

/// Names the generated program already uses. Source identifiers are letters
/// only, so keywords with digits or underscores cannot clash.
const C_RESERVED: &[&str] = &[
  "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
  "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
  "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
  "union", "unsigned", "void", "volatile", "while", "main", "printf", "scanf",
];

pub struct Parser<'e> {
  lexer: Lexer,
  emitter: &'e mut Emitter,
  symbols: HashSet<String>,
  labels_declared: HashSet<String>,
  /// Goto targets in program order, validated once the program has been read.
  labels_gotoed: Vec<Token>,
  cur: Token,
  peek: Token,
}

impl<'e> Parser<'e> {
  /// Prime the two-token window; lexing errors in the first tokens surface here.
  pub fn new(mut lexer: Lexer, emitter: &'e mut Emitter) -> CompileResult<Self> {
    let cur = lexer.next_token()?;
    let peek = lexer.next_token()?;
    Ok(Self {
      lexer,
      emitter,
      symbols: HashSet::new(),
      labels_declared: HashSet::new(),
      labels_gotoed: Vec::new(),
      cur,
      peek,
    })
  }

  /// program ::= {statement}
  pub fn program(&mut self) -> CompileResult<()> {
    self.emitter.header_line("#include <stdio.h>");
    self.emitter.header_line("int main(void){");

    while self.check_token(TokenKind::Newline) {
      self.next_token()?;
    }

    while !self.check_token(TokenKind::Eof) {
      self.statement()?;
    }

    self.emitter.emit_line("return 0;");
    self.emitter.emit_line("}");

    if let Some(target) = self
      .labels_gotoed
      .iter()
      .find(|target| !self.labels_declared.contains(&target.text))
    {
      return Err(self.semantic_error(
        target,
        format!("GOTO to undeclared label: {}", target.text),
      ));
    }

    debug!(
      variables = self.symbols.len(),
      labels = self.labels_declared.len(),
      "program accepted"
    );
    Ok(())
  }

  fn statement(&mut self) -> CompileResult<()> {
    trace!(line = self.cur.line, kind = %self.cur.kind, "statement");

    match self.cur.kind {
      // "PRINT" (expression | string)
      TokenKind::Print => {
        self.next_token()?;
        if self.check_token(TokenKind::String) {
          self.emitter.emit_line(&format!("printf(\"{}\\n\");", self.cur.text));
          self.next_token()?;
        } else {
          self.emitter.emit("printf(\"%.2f\\n\", (float)(");
          self.expression()?;
          self.emitter.emit_line("));");
        }
      }

      // "IF" comparison "THEN" nl {statement} "ENDIF"
      TokenKind::If => {
        self.next_token()?;
        self.emitter.emit("if(");
        self.comparison()?;
        self.match_token(TokenKind::Then)?;
        self.nl()?;
        self.emitter.emit_line("){");
        self.block(TokenKind::EndIf)?;
        self.emitter.emit_line("}");
      }

      // "WHILE" comparison "REPEAT" nl {statement} "ENDWHILE"
      TokenKind::While => {
        self.next_token()?;
        self.emitter.emit("while(");
        self.comparison()?;
        self.match_token(TokenKind::Repeat)?;
        self.nl()?;
        self.emitter.emit_line("){");
        self.block(TokenKind::EndWhile)?;
        self.emitter.emit_line("}");
      }

      // "LABEL" ident
      TokenKind::Label => {
        self.next_token()?;
        let label = self.expect_ident()?;
        self.check_c_name(&label)?;
        if !self.labels_declared.insert(label.text.clone()) {
          return Err(self.semantic_error(
            &label,
            format!("label already exists: {}", label.text),
          ));
        }
        self.emitter.emit_line(&format!("{}:", label.text));
      }

      // "GOTO" ident
      TokenKind::Goto => {
        self.next_token()?;
        let label = self.expect_ident()?;
        self.emitter.emit_line(&format!("goto {};", label.text));
        self.labels_gotoed.push(label);
      }

      // "LET" ident "=" expression
      TokenKind::Let => {
        self.next_token()?;
        let target = self.expect_ident()?;
        self.declare(&target)?;
        self.emitter.emit(&format!("{} = ", target.text));
        self.match_token(TokenKind::Eq)?;
        self.expression()?;
        self.emitter.emit_line(";");
      }

      // "INPUT" ident
      TokenKind::Input => {
        self.next_token()?;
        let target = self.expect_ident()?;
        self.declare(&target)?;

        // A failed read zeroes the variable and drops the offending word.
        let name = &target.text;
        self
          .emitter
          .emit_line(&format!("if(0 == scanf(\"%f\", &{name})) {{"));
        self.emitter.emit_line(&format!("{name} = 0;"));
        self.emitter.emit_line("scanf(\"%*s\");");
        self.emitter.emit_line("}");
      }

      _ => {
        return Err(self.syntax_error(format!(
          "invalid statement at '{}' ({})",
          describe_token(&self.cur),
          self.cur.kind
        )));
      }
    }

    self.nl()
  }

  /// Nested statements up to and including `terminator`.
  fn block(&mut self, terminator: TokenKind) -> CompileResult<()> {
    while !self.check_token(terminator) {
      if self.check_token(TokenKind::Eof) {
        return Err(self.syntax_error(format!(
          "expected {terminator}, but reached end of input"
        )));
      }
      self.statement()?;
    }
    self.match_token(terminator)
  }

  /// comparison ::= expression (("==" | "!=" | "<" | "<=" | ">" | ">=") expression)+
  fn comparison(&mut self) -> CompileResult<()> {
    self.expression()?;

    if !self.cur.kind.is_comparison() {
      return Err(self.syntax_error(format!(
        "expected comparison operator, got '{}'",
        describe_token(&self.cur)
      )));
    }

    while self.cur.kind.is_comparison() {
      self.emit_operator()?;
      self.expression()?;
    }
    Ok(())
  }

  /// expression ::= term {("+" | "-") term}
  fn expression(&mut self) -> CompileResult<()> {
    self.term()?;
    while self.check_token(TokenKind::Plus) || self.check_token(TokenKind::Minus) {
      self.emit_operator()?;
      self.term()?;
    }
    Ok(())
  }

  /// term ::= unary {("*" | "/") unary}
  fn term(&mut self) -> CompileResult<()> {
    self.unary()?;
    while self.check_token(TokenKind::Asterisk) || self.check_token(TokenKind::Slash) {
      self.emit_operator()?;
      self.unary()?;
    }
    Ok(())
  }

  /// unary ::= ["+" | "-"] primary
  fn unary(&mut self) -> CompileResult<()> {
    if self.check_token(TokenKind::Plus) || self.check_token(TokenKind::Minus) {
      // `a - -b` must not turn into C's `--`.
      if let Some(sign) = self.cur.text.chars().next()
        && self.emitter.body_ends_with(sign)
      {
        self.emitter.emit(" ");
      }
      self.emit_operator()?;
    }
    self.primary()
  }

  /// primary ::= number | ident
  fn primary(&mut self) -> CompileResult<()> {
    match self.cur.kind {
      TokenKind::Number => {}
      TokenKind::Ident => {
        if !self.symbols.contains(&self.cur.text) {
          return Err(self.semantic_error(
            &self.cur,
            format!("referencing variable before assignment: {}", self.cur.text),
          ));
        }
      }
      _ => {
        return Err(self.syntax_error(format!(
          "unexpected token '{}' ({}), expected a number or variable",
          describe_token(&self.cur),
          self.cur.kind
        )));
      }
    }

    self.emitter.emit(&self.cur.text);
    self.next_token()
  }

  /// nl ::= NEWLINE {NEWLINE}
  fn nl(&mut self) -> CompileResult<()> {
    self.match_token(TokenKind::Newline)?;
    while self.check_token(TokenKind::Newline) {
      self.next_token()?;
    }
    Ok(())
  }

  /// First assignment of a name declares it in the header. The name is a
  /// member from this statement on, so `LET x = x + 1` may read it.
  fn declare(&mut self, target: &Token) -> CompileResult<()> {
    self.check_c_name(target)?;
    if self.symbols.insert(target.text.clone()) {
      self.emitter.header_line(&format!("float {};", target.text));
    }
    Ok(())
  }

  /// Variables and labels become C identifiers verbatim.
  fn check_c_name(&self, name: &Token) -> CompileResult<()> {
    if C_RESERVED.contains(&name.text.as_str()) {
      return Err(self.semantic_error(
        name,
        format!("'{}' is reserved in the generated C program", name.text),
      ));
    }
    Ok(())
  }

  fn emit_operator(&mut self) -> CompileResult<()> {
    self.emitter.emit(&self.cur.text);
    self.next_token()
  }

  fn check_token(&self, kind: TokenKind) -> bool {
    self.cur.kind == kind
  }

  /// Consume the current token if it has the required kind.
  fn match_token(&mut self, kind: TokenKind) -> CompileResult<()> {
    if !self.check_token(kind) {
      return Err(self.syntax_error(format!("expected {kind}, got {}", self.cur.kind)));
    }
    self.next_token()
  }

  /// Consume an identifier and hand it back.
  fn expect_ident(&mut self) -> CompileResult<Token> {
    if !self.check_token(TokenKind::Ident) {
      return Err(self.syntax_error(format!(
        "expected {}, got {}",
        TokenKind::Ident,
        self.cur.kind
      )));
    }
    let token = self.cur.clone();
    self.next_token()?;
    Ok(token)
  }

  fn next_token(&mut self) -> CompileResult<()> {
    let next = self.lexer.next_token()?;
    self.cur = mem::replace(&mut self.peek, next);
    Ok(())
  }

  fn syntax_error(&self, message: String) -> CompileError {
    CompileError::at(Stage::Parsing, self.lexer.source(), self.cur.loc, message)
  }

  fn semantic_error(&self, token: &Token, message: String) -> CompileError {
    CompileError::at(Stage::Semantic, self.lexer.source(), token.loc, message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn translate(source: &str) -> CompileResult<Emitter> {
    let mut emitter = Emitter::new();
    Parser::new(Lexer::new(source), &mut emitter)?.program()?;
    Ok(emitter)
  }

  fn body(source: &str) -> String {
    translate(source).expect("program should compile").body().to_string()
  }

  fn reject(source: &str) -> CompileError {
    translate(source).expect_err("program should be rejected")
  }

  #[test]
  fn expressions_are_emitted_in_recognition_order() {
    assert_eq!(
      body("LET a = 1 + 2 * 3 / 4 - 5\n"),
      "a = 1+2*3/4-5;\nreturn 0;\n}\n"
    );
  }

  #[test]
  fn unary_sign_is_spaced_after_a_matching_operator() {
    let out = body("LET a = -1\nLET b = a - -a\nLET c = a + +a\nLET d = a - +a\n");
    assert!(out.contains("a = -1;\n"));
    assert!(out.contains("b = a- -a;\n"));
    assert!(out.contains("c = a+ +a;\n"));
    assert!(out.contains("d = a-+a;\n"));
  }

  #[test]
  fn comparisons_chain() {
    let out = body("LET a = 1\nIF a < 2 == 1 THEN\nPRINT a\nENDIF\n");
    assert!(out.contains("if(a<2==1){\n"));

    let out = body("LET a = 1\nWHILE a <= 2 >= 0 != 3 > -1 REPEAT\nLET a = a + 1\nENDWHILE\n");
    assert!(out.contains("while(a<=2>=0!=3>-1){\n"));
  }

  #[test]
  fn comparison_needs_an_operator() {
    let err = reject("LET a = 1\nIF a THEN\nENDIF\n");
    assert_eq!(err.stage(), Some(Stage::Parsing));
    assert_eq!(err.message(), Some("expected comparison operator, got 'THEN'"));
  }

  #[test]
  fn nested_blocks_are_balanced() {
    let out = body(
      "LET i = 0\nWHILE i < 3 REPEAT\nIF i == 1 THEN\nPRINT \"one\"\nENDIF\nLET i = i + 1\nENDWHILE\n",
    );
    assert_eq!(out.matches('{').count(), out.matches('}').count() - 1);
    assert!(out.contains("while(i<3){\nif(i==1){\nprintf(\"one\\n\");\n}\ni = i+1;\n}\n"));
  }

  #[test_log::test]
  fn variables_are_declared_once() {
    let emitter = translate("LET a = 1\nLET a = 2\nINPUT a\nINPUT b\n").unwrap();
    assert_eq!(
      emitter.header(),
      "#include <stdio.h>\nint main(void){\nfloat a;\nfloat b;\n"
    );
  }

  #[test]
  fn input_is_guarded() {
    assert_eq!(
      body("INPUT n\n"),
      "if(0 == scanf(\"%f\", &n)) {\nn = 0;\nscanf(\"%*s\");\n}\nreturn 0;\n}\n"
    );
  }

  #[test]
  fn use_before_assignment_is_rejected() {
    let err = reject("PRINT x\nLET x = 1\n");
    assert_eq!(err.stage(), Some(Stage::Semantic));
    assert_eq!(
      err.message(),
      Some("referencing variable before assignment: x")
    );
  }

  #[test]
  fn first_assignment_may_read_its_own_target() {
    let emitter = translate("LET x = x + 1\nLET x = x * 2\n").unwrap();
    assert_eq!(emitter.header().matches("float x;").count(), 1);
    assert!(emitter.body().starts_with("x = x+1;\nx = x*2;\n"));
  }

  #[test]
  fn c_names_are_rejected_as_variables_and_labels() {
    let err = reject("LET printf = 1\n");
    assert_eq!(err.stage(), Some(Stage::Semantic));
    assert_eq!(
      err.message(),
      Some("'printf' is reserved in the generated C program")
    );

    let err = reject("INPUT int\n");
    assert_eq!(err.message(), Some("'int' is reserved in the generated C program"));

    let err = reject("LABEL main\n");
    assert_eq!(err.message(), Some("'main' is reserved in the generated C program"));

    assert!(translate("LET Int = 1\nLABEL Main\n").is_ok());
  }

  #[test]
  fn duplicate_label_is_rejected_at_second_declaration() {
    let err = reject("LABEL loop\nPRINT \"x\"\nLABEL loop\n");
    assert_eq!(err.stage(), Some(Stage::Semantic));
    assert_eq!(err.message(), Some("label already exists: loop"));
    assert_eq!(err.line(), Some(3));
  }

  #[test]
  fn forward_goto_resolves() {
    let out = body("GOTO skip\nPRINT \"never\"\nLABEL skip\n");
    assert!(out.starts_with("goto skip;\nprintf(\"never\\n\");\nskip:\n"));
  }

  #[test]
  fn first_undeclared_goto_is_reported() {
    let err = reject("LABEL a\nGOTO a\nGOTO b\nGOTO c\n");
    assert_eq!(err.message(), Some("GOTO to undeclared label: b"));
    assert_eq!(err.line(), Some(3));
  }

  #[test]
  fn missing_keyword_names_both_kinds() {
    let err = reject("LET a = 1\nIF a > 0\nENDIF\n");
    assert_eq!(err.message(), Some("expected THEN, got NEWLINE"));

    let err = reject("LET a 1\n");
    assert_eq!(err.message(), Some("expected EQ, got NUMBER"));
  }

  #[test]
  fn statements_need_a_newline() {
    let err = reject("PRINT \"a\" PRINT \"b\"\n");
    assert_eq!(err.message(), Some("expected NEWLINE, got PRINT"));
  }

  #[test]
  fn unterminated_block_is_reported() {
    let err = reject("LET a = 1\nWHILE a > 0 REPEAT\nLET a = a - 1\n");
    assert_eq!(
      err.message(),
      Some("expected ENDWHILE, but reached end of input")
    );
  }

  #[test]
  fn stray_tokens_are_not_statements() {
    let err = reject("42\n");
    assert_eq!(err.message(), Some("invalid statement at '42' (NUMBER)"));
  }

  #[test]
  fn lexing_errors_surface_through_the_parser() {
    let err = reject("PRINT \"100%\"\n");
    assert_eq!(err.stage(), Some(Stage::Lexing));
  }
}
