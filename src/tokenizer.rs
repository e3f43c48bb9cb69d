//! Lexical analysis: turns the raw input string into tokens on demand.
//!
//! The lexer keeps a cursor and the current character and hands out one
//! token per `next_token` call; the parser pulls them as it goes. A newline is
//! appended to the source so the final statement is terminated like every
//! other one.

use std::fmt;

use tracing::trace;

use crate::error::{CompileError, CompileResult, Stage};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Eof,
  Newline,
  Number,
  Ident,
  String,
  // Keywords.
  Label,
  Goto,
  Print,
  Input,
  Let,
  If,
  Then,
  EndIf,
  While,
  Repeat,
  EndWhile,
  // Operators.
  Eq,
  Plus,
  Minus,
  Asterisk,
  Slash,
  EqEq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,
}

impl TokenKind {
  /// Look up a reserved word. Matching is exact and case-sensitive.
  pub fn keyword(text: &str) -> Option<Self> {
    let kind = match text {
      "LABEL" => Self::Label,
      "GOTO" => Self::Goto,
      "PRINT" => Self::Print,
      "INPUT" => Self::Input,
      "LET" => Self::Let,
      "IF" => Self::If,
      "THEN" => Self::Then,
      "ENDIF" => Self::EndIf,
      "WHILE" => Self::While,
      "REPEAT" => Self::Repeat,
      "ENDWHILE" => Self::EndWhile,
      _ => return None,
    };
    Some(kind)
  }

  pub fn is_comparison(self) -> bool {
    matches!(
      self,
      Self::EqEq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
    )
  }

  /// Upper-case name used in diagnostics.
  pub fn name(self) -> &'static str {
    match self {
      Self::Eof => "EOF",
      Self::Newline => "NEWLINE",
      Self::Number => "NUMBER",
      Self::Ident => "IDENT",
      Self::String => "STRING",
      Self::Label => "LABEL",
      Self::Goto => "GOTO",
      Self::Print => "PRINT",
      Self::Input => "INPUT",
      Self::Let => "LET",
      Self::If => "IF",
      Self::Then => "THEN",
      Self::EndIf => "ENDIF",
      Self::While => "WHILE",
      Self::Repeat => "REPEAT",
      Self::EndWhile => "ENDWHILE",
      Self::Eq => "EQ",
      Self::Plus => "PLUS",
      Self::Minus => "MINUS",
      Self::Asterisk => "ASTERISK",
      Self::Slash => "SLASH",
      Self::EqEq => "EQEQ",
      Self::NotEq => "NOTEQ",
      Self::Lt => "LT",
      Self::LtEq => "LTEQ",
      Self::Gt => "GT",
      Self::GtEq => "GTEQ",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.name())
  }
}

/// A classified slice of the source together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub text: String,
  pub loc: usize,
  pub line: usize,
}

impl Token {
  pub fn new(kind: TokenKind, text: impl Into<String>, loc: usize, line: usize) -> Self {
    Self {
      kind,
      text: text.into(),
      loc,
      line,
    }
  }
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: &Token) -> String {
  match token.kind {
    TokenKind::Eof => "EOF".to_string(),
    TokenKind::Newline => "newline".to_string(),
    _ => token.text.clone(),
  }
}

/// Pull-based scanner over one source text.
#[derive(Debug, Clone)]
pub struct Lexer {
  source: String,
  /// Byte offset of `cur`.
  pos: usize,
  cur: Option<char>,
  line: usize,
}

impl Lexer {
  pub fn new(source: &str) -> Self {
    let source = format!("{source}\n");
    let cur = source.chars().next();
    Self {
      source,
      pos: 0,
      cur,
      line: 1,
    }
  }

  /// The text being scanned, including the appended newline.
  pub fn source(&self) -> &str {
    &self.source
  }

  /// Lex everything up to and including the `Eof` token.
  pub fn tokenize(&mut self) -> CompileResult<Vec<Token>> {
    let mut tokens = Vec::new();
    loop {
      let token = self.next_token()?;
      let eof = token.kind == TokenKind::Eof;
      tokens.push(token);
      if eof {
        return Ok(tokens);
      }
    }
  }

  /// Produce the next token. Keeps returning `Eof` once the input is exhausted.
  pub fn next_token(&mut self) -> CompileResult<Token> {
    self.skip_whitespace();
    self.skip_comment();

    let start = self.pos;
    let line = self.line;
    let Some(c) = self.cur else {
      return Ok(Token::new(TokenKind::Eof, "", start, line));
    };

    let kind = match c {
      '+' => self.single(TokenKind::Plus),
      '-' => self.single(TokenKind::Minus),
      '*' => self.single(TokenKind::Asterisk),
      '/' => self.single(TokenKind::Slash),
      '\n' => self.single(TokenKind::Newline),
      '=' => self.one_or_two(TokenKind::Eq, TokenKind::EqEq),
      '<' => self.one_or_two(TokenKind::Lt, TokenKind::LtEq),
      '>' => self.one_or_two(TokenKind::Gt, TokenKind::GtEq),
      '!' => {
        if self.peek() != Some('=') {
          let got = self.peek().map(String::from).unwrap_or_default();
          return Err(self.error_at(start, format!("expected !=, got !{got}")));
        }
        self.advance();
        self.advance();
        TokenKind::NotEq
      }
      '"' => return self.string(),
      c if c.is_ascii_digit() => self.number()?,
      c if c.is_ascii_alphabetic() => {
        self.advance_while(|c| c.is_ascii_alphabetic());
        TokenKind::keyword(&self.source[start..self.pos]).unwrap_or(TokenKind::Ident)
      }
      c => return Err(self.error_at(start, format!("unknown token: {c}"))),
    };

    let token = Token::new(kind, &self.source[start..self.pos], start, line);
    trace!(kind = %token.kind, text = %token.text.escape_debug(), line, "token");
    Ok(token)
  }

  fn advance(&mut self) {
    if let Some(c) = self.cur {
      self.pos += c.len_utf8();
      if c == '\n' {
        self.line += 1;
      }
      self.cur = self.source[self.pos..].chars().next();
    }
  }

  fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
    while self.cur.is_some_and(&pred) {
      self.advance();
    }
  }

  /// One character of lookahead past `cur`.
  fn peek(&self) -> Option<char> {
    let c = self.cur?;
    self.source[self.pos + c.len_utf8()..].chars().next()
  }

  fn skip_whitespace(&mut self) {
    self.advance_while(|c| matches!(c, ' ' | '\t' | '\r'));
  }

  fn skip_comment(&mut self) {
    if self.cur == Some('#') {
      self.advance_while(|c| c != '\n');
    }
  }

  fn single(&mut self, kind: TokenKind) -> TokenKind {
    self.advance();
    kind
  }

  /// `=`, `<` and `>` optionally followed by `=`.
  fn one_or_two(&mut self, one: TokenKind, two: TokenKind) -> TokenKind {
    self.advance();
    if self.cur == Some('=') {
      self.advance();
      two
    } else {
      one
    }
  }

  fn number(&mut self) -> CompileResult<TokenKind> {
    self.advance_while(|c| c.is_ascii_digit());
    if self.cur == Some('.') {
      self.advance();
      if !self.cur.is_some_and(|c| c.is_ascii_digit()) {
        return Err(self.error_at(self.pos, "not a valid number"));
      }
      self.advance_while(|c| c.is_ascii_digit());
    }
    Ok(TokenKind::Number)
  }

  /// The closing quote ends the literal; `#` inside it is plain text.
  fn string(&mut self) -> CompileResult<Token> {
    let open = self.pos;
    let line = self.line;
    self.advance();
    let start = self.pos;

    loop {
      match self.cur {
        Some('"') => break,
        Some('\n') | None => return Err(self.error_at(open, "unterminated string")),
        // printf receives the text unescaped.
        Some('\r' | '\t' | '\\' | '%') => {
          return Err(self.error_at(self.pos, "illegal character in string"));
        }
        Some(_) => self.advance(),
      }
    }

    let token = Token::new(TokenKind::String, &self.source[start..self.pos], open, line);
    self.advance();
    trace!(kind = %token.kind, text = %token.text.escape_debug(), line, "token");
    Ok(token)
  }

  fn error_at(&self, loc: usize, message: impl Into<String>) -> CompileError {
    CompileError::at(Stage::Lexing, &self.source, loc, message)
  }
}
