//! Hand-written scanner for Tenn source text.
//!
//! The lexer works on Unicode scalars. Besides plain symbols and the block
//! delimiters it recognises four embedded literal syntaxes:
//!
//! - `"..."` / `'...'` strings, with `\` escaping only the matching quote
//! - `$( ... )` inline expressions
//! - `${ ... }` expression blocks
//! - `%{ ... }` markdown
//!
//! Embedded literals are scanned by counting the balance of their own
//! open/close pair, so `$(max(a, b))` is a single expression token.
//!
//! Newlines become synthetic [`TokenKind::Separator`] tokens at top level and
//! directly inside `{ }` blocks.

use crate::token::{Token, TokenKind};
use std::collections::VecDeque;

/// Recoverable scanning failures, reported through [`TokenSource::take_errors`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedExpression,
    Utf8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub line: usize,
    pub col: usize,
    pub start: usize,
    pub end: usize,
}

/// A revertible stream of tokens with an error sink
pub trait TokenSource {
    /// Next token, `None` once the single `Eof` token has been handed out
    fn next_token(&mut self) -> Option<Token>;

    /// Push a token back so it is returned by the next `next_token` call
    fn revert(&mut self, token: Token);

    /// Drain errors reported since the previous call
    fn take_errors(&mut self) -> Vec<LexError>;
}

#[derive(Clone, Copy)]
struct Mark {
    line: usize,
    col: usize,
    pos: usize,
}

/// Symbol characters collected between delimiters
#[derive(Default)]
struct Run {
    text: String,
    start: Option<Mark>,
}

pub struct Lexer {
    buffer: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    pending: VecDeque<Token>,
    block_state: Vec<TokenKind>,
    errors: Vec<LexError>,
    eof_emitted: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            buffer: source.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
            pending: VecDeque::new(),
            block_state: Vec::new(),
            errors: Vec::new(),
            eof_emitted: false,
        }
    }

    /// Decode `bytes` as UTF-8. Invalid input is reported once and scanning
    /// continues over the lossily decoded text.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(source) => Self::new(source),
            Err(err) => {
                let valid = String::from_utf8_lossy(&bytes[..err.valid_up_to()]);
                let offset = valid.chars().count();
                let line = valid.matches('\n').count();
                let col = valid.chars().rev().take_while(|c| *c != '\n').count();

                let mut lexer = Self::new(&String::from_utf8_lossy(bytes));
                lexer.errors.push(LexError {
                    kind: LexErrorKind::Utf8,
                    line,
                    col,
                    start: offset,
                    end: offset + 1,
                });
                lexer
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.buffer.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> char {
        let c = self.buffer[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        c
    }

    fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            col: self.col,
            pos: self.pos,
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.line = mark.line;
        self.col = mark.col;
        self.pos = mark.pos;
    }

    fn push(&mut self, kind: TokenKind, literal: String, start: Mark) {
        let size = self.pos.saturating_sub(start.pos);
        let mut token = Token::new(kind, literal).at(start.line, start.col, start.pos);
        token.size = size;
        self.pending.push_back(token);
    }

    fn report(&mut self, kind: LexErrorKind, start: Mark) {
        self.errors.push(LexError {
            kind,
            line: start.line,
            col: start.col,
            start: start.pos,
            end: self.pos,
        });
    }

    fn flush(&mut self, run: &mut Run) {
        if let Some(start) = run.start.take() {
            let text = std::mem::take(&mut run.text);
            let kind = classify_symbol(&text);
            let mut token = Token::new(kind, text).at(start.line, start.col, start.pos);
            token.size = self.pos - start.pos;
            self.pending.push_back(token);
        }
    }

    fn separators_enabled(&self) -> bool {
        matches!(self.block_state.last(), None | Some(TokenKind::CurlyOpen))
    }

    fn whitespace(&mut self, run: &mut Run) {
        self.flush(run);
        let start = self.mark();
        if self.bump() == '\n' && self.separators_enabled() {
            let mut token = Token::new(TokenKind::Separator, "\n").at(start.line, start.col, start.pos);
            token.size = 1;
            self.pending.push_back(token);
        }
    }

    fn curly_open(&mut self) {
        let start = self.mark();
        self.bump();
        self.push(TokenKind::CurlyOpen, "{".to_string(), start);
        self.block_state.push(TokenKind::CurlyOpen);
    }

    fn curly_close(&mut self) {
        let start = self.mark();
        self.bump();
        self.push(TokenKind::CurlyClose, "}".to_string(), start);
        match self.block_state.pop() {
            Some(TokenKind::CurlyOpen) => {}
            Some(other) => {
                tracing::warn!(line = start.line + 1, "'}}' closes {} instead of '{{'", other);
            }
            None => {
                tracing::warn!(line = start.line + 1, "'}}' without matching '{{'");
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.bump();
        self.bump();
        while self.pos < self.buffer.len() {
            if self.peek(0) == Some('*') && self.peek(1) == Some('/') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    fn skip_line_comment(&mut self) {
        // The newline itself is left for `whitespace` so it still terminates
        // the statement.
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn read_string(&mut self, quote: char) {
        let start = self.mark();
        self.bump();

        let mut text = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                self.push(TokenKind::StringLit, text, start);
                self.report(LexErrorKind::UnterminatedString, start);
                return;
            };

            if c == quote {
                self.bump();
                if self.continues_with(quote) {
                    continue;
                }
                self.push(TokenKind::StringLit, text, start);
                return;
            }

            if c == '\\' && self.peek(1) == Some(quote) {
                self.bump();
                text.push(self.bump());
                continue;
            }

            text.push(self.bump());
        }
    }

    /// `"a" + "b"` concatenation: consume `\s* + \s* <quote>` if present,
    /// otherwise leave the position untouched.
    fn continues_with(&mut self, quote: char) -> bool {
        let saved = self.mark();

        self.skip_blank();
        if self.peek(0) == Some('+') {
            self.bump();
            self.skip_blank();
            if self.peek(0) == Some(quote) {
                self.bump();
                return true;
            }
        }

        self.reset(saved);
        false
    }

    fn skip_blank(&mut self) {
        while matches!(self.peek(0), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    fn read_nested(&mut self, open: char, close: char, kind: TokenKind) {
        let start = self.mark();
        self.bump();
        self.bump();

        let mut text = String::new();
        let mut depth = 1usize;
        while let Some(c) = self.peek(0) {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    self.bump();
                    self.push(kind, text, start);
                    return;
                }
            }
            text.push(self.bump());
        }

        self.push(kind, text, start);
        self.report(LexErrorKind::UnterminatedExpression, start);
    }

    fn scan(&mut self) {
        let mut run = Run::default();

        while let Some(c) = self.peek(0) {
            let next = self.peek(1);
            match (c, next) {
                (' ' | '\t' | '\r' | '\n', _) => self.whitespace(&mut run),
                ('{', _) => {
                    self.flush(&mut run);
                    self.curly_open();
                }
                ('}', _) => {
                    self.flush(&mut run);
                    self.curly_close();
                }
                (';', _) => {
                    self.flush(&mut run);
                    let start = self.mark();
                    self.bump();
                    self.push(TokenKind::Separator, ";".to_string(), start);
                }
                ('/', Some('*')) => {
                    self.flush(&mut run);
                    self.skip_block_comment();
                }
                ('/', Some('/')) => {
                    self.flush(&mut run);
                    self.skip_line_comment();
                }
                ('%', Some('{')) => {
                    self.flush(&mut run);
                    self.read_nested('{', '}', TokenKind::MarkdownLit);
                }
                ('$', Some('(')) => {
                    self.flush(&mut run);
                    self.read_nested('(', ')', TokenKind::Expression);
                }
                ('$', Some('{')) => {
                    self.flush(&mut run);
                    self.read_nested('{', '}', TokenKind::ExpressionBlock);
                }
                ('"' | '\'', _) => {
                    self.flush(&mut run);
                    self.read_string(c);
                }
                _ => {
                    if run.start.is_none() {
                        run.start = Some(self.mark());
                    }
                    run.text.push(self.bump());
                }
            }

            if !self.pending.is_empty() {
                return;
            }
        }

        self.flush(&mut run);
        if !self.eof_emitted {
            self.eof_emitted = true;
            let start = self.mark();
            self.pending
                .push_back(Token::new(TokenKind::Eof, "").at(start.line, start.col, start.pos));
        }
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Option<Token> {
        if self.pending.is_empty() {
            self.scan();
        }
        self.pending.pop_front()
    }

    fn revert(&mut self, token: Token) {
        self.pending.push_front(token);
    }

    fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

/// Numbers are an optional `-` followed by digits, with at most one `.`
/// that is not the leading character.
fn classify_symbol(text: &str) -> TokenKind {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() {
        return TokenKind::Symbol;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        if c == '.' {
            if !seen_digit || seen_dot {
                return TokenKind::Symbol;
            }
            seen_dot = true;
        } else if c.is_ascii_digit() {
            seen_digit = true;
        } else {
            return TokenKind::Symbol;
        }
    }

    if seen_dot {
        TokenKind::FloatLit
    } else {
        TokenKind::IntLit
    }
}

/// Scan a whole source into tokens, including the trailing `Eof`
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}
