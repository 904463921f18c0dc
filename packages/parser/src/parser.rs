//! Recursive descent parser producing a `Statements` tree.
//!
//! The parser never fails outright. Diagnostics are accumulated and descent
//! stops at the first one, leaving whatever was built so far in the returned
//! tree. Callers must check [`Parser::errors`] before trusting the result, or
//! use [`parse`] which turns a non-empty error list into `Err`.

use crate::ast::{NodeKind, TennNode};
use crate::error::{ErrorCode, ParseError, ParseErrors, ParseResult};
use crate::lexer::{LexError, LexErrorKind, Lexer, TokenSource};
use crate::token::{Token, TokenKind};

/// Token kinds that end a command
#[derive(Clone, Copy)]
struct Terminators {
    block_close: bool,
}

impl Terminators {
    const TOP: Terminators = Terminators { block_close: false };
    const BLOCK: Terminators = Terminators { block_close: true };

    fn contains(self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Separator | TokenKind::Eof => true,
            TokenKind::CurlyClose => self.block_close,
            _ => false,
        }
    }
}

#[derive(Default)]
pub struct Parser {
    tok: Option<Token>,
    errors: ParseErrors,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors of the most recent parse
    pub fn errors(&self) -> &ParseErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> ParseErrors {
        std::mem::take(&mut self.errors)
    }

    pub fn parse(&mut self, source: &str) -> TennNode {
        self.parse_tokens(&mut Lexer::new(source))
    }

    pub fn parse_bytes(&mut self, bytes: &[u8]) -> TennNode {
        self.parse_tokens(&mut Lexer::from_bytes(bytes))
    }

    /// Parse from any token source. Errors from a previous parse are discarded.
    pub fn parse_tokens<S: TokenSource>(&mut self, source: &mut S) -> TennNode {
        self.errors = ParseErrors::new();
        self.tok = None;

        let mut result = TennNode::new(NodeKind::Statements, None);
        self.next_tok(source);

        if self.tok.is_none() {
            self.report(ErrorCode::UnexpectedInput, "unexpected end of input", None);
            return result;
        }

        while self.tok_kind().is_some_and(|k| k != TokenKind::Eof) {
            if let Some(node) = self.parse_command(source, Terminators::TOP) {
                result.add(node);
            }
            if self.has_errors() {
                return result;
            }
            self.next_tok(source);
        }

        result
    }

    fn tok_kind(&self) -> Option<TokenKind> {
        self.tok.as_ref().map(|t| t.kind)
    }

    fn next_tok<S: TokenSource>(&mut self, source: &mut S) {
        self.tok = source.next_token();
        for error in source.take_errors() {
            self.report_lex_error(error);
        }
    }

    /// Push the current token back and make `token` current again
    fn revert<S: TokenSource>(&mut self, source: &mut S, token: Token) {
        if let Some(current) = self.tok.take() {
            source.revert(current);
        }
        self.tok = Some(token);
    }

    fn eat<S: TokenSource>(&mut self, source: &mut S, kind: TokenKind) {
        if self.tok_kind() == Some(kind) {
            self.next_tok(source);
        } else {
            let found = self.tok_kind().unwrap_or(TokenKind::Invalid);
            let token = self.tok.clone();
            self.report(
                ErrorCode::UnexpectedToken,
                format!("expected {}, found {}", kind, found),
                token.as_ref(),
            );
        }
    }

    fn report(&mut self, code: ErrorCode, message: impl Into<String>, token: Option<&Token>) {
        let mut error = ParseError::new(code, message);
        if let Some(token) = token {
            error = error.at(token.line, token.col, token.pos, token.size);
        }
        tracing::debug!("parse error: {}", error);
        self.errors.push(error);
    }

    fn report_lex_error(&mut self, error: LexError) {
        let (code, message) = match error.kind {
            LexErrorKind::UnterminatedExpression => {
                (ErrorCode::WrongBlockTerminator, "unclosed expression")
            }
            LexErrorKind::UnterminatedString => {
                (ErrorCode::EndOfFileDuringStringRead, "unclosed string literal")
            }
            LexErrorKind::Utf8 => (ErrorCode::Utf8Error, "invalid UTF-8 sequence"),
        };
        let len = error.end.saturating_sub(error.start);
        self.errors
            .push(ParseError::new(code, message).at(error.line, error.col, error.start, len));
    }

    /// Whether the current token ends the command. Newline separators
    /// followed by a string literal or a block opener do not: the buffered
    /// separators are dropped and the command continues. Otherwise they are
    /// pushed back so the first one terminates.
    fn check_end<S: TokenSource>(&mut self, source: &mut S, ends: Terminators) -> bool {
        let Some(token) = self.tok.as_ref() else {
            return false;
        };
        if !ends.contains(token.kind) {
            return false;
        }
        if !token.is_newline_separator() {
            return true;
        }

        let mut buffered = Vec::new();
        while self.tok.as_ref().is_some_and(Token::is_newline_separator) {
            buffered.extend(self.tok.take());
            self.next_tok(source);
        }

        if matches!(
            self.tok_kind(),
            Some(TokenKind::StringLit) | Some(TokenKind::CurlyOpen)
        ) {
            return false;
        }

        while let Some(token) = buffered.pop() {
            self.revert(source, token);
        }
        true
    }

    fn parse_command<S: TokenSource>(
        &mut self,
        source: &mut S,
        ends: Terminators,
    ) -> Option<TennNode> {
        while self.tok_kind() == Some(TokenKind::Separator) {
            self.next_tok(source);
        }

        let start = self.tok.clone()?;
        if ends.contains(start.kind) {
            return None;
        }
        if start.kind != TokenKind::Symbol {
            self.report(
                ErrorCode::InvalidCommandStart,
                format!("invalid command start: {}", start.literal),
                Some(&start),
            );
            return None;
        }

        let mut command = TennNode::new(NodeKind::Command, Some(start));

        while self.tok.is_some() && !self.check_end(source, ends) {
            let Some(token) = self.tok.clone() else {
                break;
            };
            let kind = match token.kind {
                TokenKind::Symbol => NodeKind::Ident,
                TokenKind::StringLit => NodeKind::StringLit,
                TokenKind::MarkdownLit => NodeKind::MarkdownLit,
                TokenKind::IntLit => NodeKind::IntLit,
                TokenKind::FloatLit => NodeKind::FloatLit,
                TokenKind::Expression => NodeKind::Expression,
                TokenKind::ExpressionBlock => NodeKind::ExpressionBlock,
                TokenKind::ImageData => NodeKind::Image,
                TokenKind::CurlyOpen => {
                    let block = self.parse_block(source, token);
                    command.add(block);
                    if self.has_errors() {
                        return Some(command);
                    }
                    self.next_tok(source);
                    continue;
                }
                _ => return Some(command),
            };
            command.add(TennNode::new(kind, Some(token)));
            if self.has_errors() {
                return Some(command);
            }
            self.next_tok(source);
        }

        Some(command)
    }

    /// Parse `{ ... }`. On success the current token is the closing `}`.
    fn parse_block<S: TokenSource>(&mut self, source: &mut S, open: Token) -> TennNode {
        self.eat(source, TokenKind::CurlyOpen);
        let mut last = open.clone();
        let mut block = TennNode::new(NodeKind::BlockExpr, Some(open));

        if self.tok.is_none() {
            self.report(ErrorCode::UnexpectedInput, "no more tokens in block", Some(&last));
            return block;
        }

        let at_end = |kind: Option<TokenKind>| {
            matches!(kind, Some(TokenKind::CurlyClose) | Some(TokenKind::Eof))
        };

        while self.tok.is_some() && !at_end(self.tok_kind()) {
            if let Some(token) = &self.tok {
                last = token.clone();
            }
            if let Some(node) = self.parse_command(source, Terminators::BLOCK) {
                block.add(node);
            }
            if at_end(self.tok_kind()) {
                break;
            }
            if self.has_errors() {
                return block;
            }
            self.next_tok(source);
        }

        if self.tok_kind() != Some(TokenKind::CurlyClose) && !self.has_errors() {
            self.report(
                ErrorCode::WrongBlockTerminator,
                "block is not closed with '}'",
                Some(&last),
            );
        }
        block
    }
}

/// Parse a source string, failing on any diagnostic
pub fn parse(source: &str) -> ParseResult<TennNode> {
    let mut parser = Parser::new();
    let node = parser.parse(source);
    into_result(node, parser)
}

/// Decode and parse UTF-8 bytes, failing on any diagnostic
pub fn parse_bytes(bytes: &[u8]) -> ParseResult<TennNode> {
    let mut parser = Parser::new();
    let node = parser.parse_bytes(bytes);
    into_result(node, parser)
}

fn into_result(node: TennNode, mut parser: Parser) -> ParseResult<TennNode> {
    if parser.has_errors() {
        Err(parser.take_errors())
    } else {
        Ok(node)
    }
}
