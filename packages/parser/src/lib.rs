pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod token;

#[cfg(test)]
mod tests_parser;
#[cfg(test)]
mod tests_printer;

pub use ast::{NodeKind, TennNode};
#[cfg(feature = "pretty-errors")]
pub use error::format_errors;
pub use error::{ErrorCode, ParseError, ParseErrors, ParseResult};
pub use lexer::{tokenize, Lexer, TokenSource};
pub use parser::{parse, parse_bytes, Parser};
pub use printer::print;
pub use token::{Token, TokenKind};
