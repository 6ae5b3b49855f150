//! Document parser and language utilities

mod document;
mod lexer;
mod parser;
mod schema;
mod span;

#[cfg(test)]
mod tests;

pub use self::document::parse_document;
pub use self::schema::parse_schema_document;

pub use self::lexer::{Lexer, LexerError, Token, TokenKind};
pub use self::parser::{ParseError, ParseResult};
pub use self::span::{SourcePosition, Span, Spanning};
