use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for fail-fast parsing
pub type ParseResult<T> = Result<T, ParseErrors>;

/// Closed taxonomy of lexer and parser diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    UnexpectedToken,
    UnexpectedInput,
    InvalidCommandStart,
    WrongBlockTerminator,
    EndOfFileDuringStringRead,
    Utf8Error,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::UnexpectedToken => "unexpected token",
            ErrorCode::UnexpectedInput => "unexpected input",
            ErrorCode::InvalidCommandStart => "invalid command start",
            ErrorCode::WrongBlockTerminator => "wrong block terminator",
            ErrorCode::EndOfFileDuringStringRead => "end of file during string read",
            ErrorCode::Utf8Error => "UTF-8 decoding error",
        };
        f.write_str(name)
    }
}

/// A single diagnostic. `line` and `col` are zero based, `pos` is a char offset.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code} at {}:{}: {message}", .line + 1, .col + 1)]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub line: usize,
    pub col: usize,
    pub pos: usize,
    pub len: usize,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            line: 0,
            col: 0,
            pos: 0,
            len: 0,
        }
    }

    pub fn at(mut self, line: usize, col: usize, pos: usize, len: usize) -> Self {
        self.line = line;
        self.col = col;
        self.pos = pos;
        self.len = len;
        self
    }
}

/// Errors accumulated during one parse, in the order they were reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("no errors"),
            [single] => write!(f, "{}", single),
            [first, rest @ ..] => write!(f, "{} (and {} more)", first, rest.len()),
        }
    }
}

impl std::error::Error for ParseErrors {}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.errors.iter()
    }
}

/// Pretty-print errors with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &ParseErrors) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();
    let source_len = source.chars().count();

    for error in &errors.errors {
        let start = error.pos.min(source_len);
        let end = (error.pos + error.len.max(1)).min(source_len).max(start);

        let report = Report::build(ReportKind::Error, filename, start)
            .with_code(format!("{:?}", error.code))
            .with_message(error.code.to_string())
            .with_label(
                Label::new((filename, start..end))
                    .with_color(Color::Red)
                    .with_message(&error.message),
            )
            .finish();

        if let Err(err) = report.write((filename, Source::from(source)), &mut output) {
            tracing::warn!("failed to render diagnostic: {}", err);
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
