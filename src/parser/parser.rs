use std::{error::Error, fmt};

use indexmap::IndexMap;

use crate::{
    ast::TypeDescriptor,
    parser::{Lexer, LexerError, Spanning, Token, TokenKind},
};

/// Error while parsing a GraphQL document
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An unexpected token occurred in the source
    UnexpectedToken(String),

    /// The input source abruptly ended
    UnexpectedEndOfFile,

    /// An error during tokenization occurred
    Lexer(LexerError),

    /// A grammar rule was violated; the message names the rule
    Grammar(&'static str),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken(token) => write!(f, "Unexpected \"{token}\""),
            Self::UnexpectedEndOfFile => write!(f, "Unexpected end of input"),
            Self::Lexer(e) => e.fmt(f),
            Self::Grammar(msg) => f.write_str(msg),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lexer(e) => Some(e),
            Self::UnexpectedToken(_) | Self::UnexpectedEndOfFile | Self::Grammar(_) => None,
        }
    }
}

impl From<Spanning<LexerError>> for Spanning<ParseError> {
    fn from(e: Spanning<LexerError>) -> Self {
        Spanning::new(ParseError::Lexer(e.item), e.span)
    }
}

#[doc(hidden)]
pub type ParseResult<T> = Result<T, Spanning<ParseError>>;

/// Builds the error for a token no grammar rule could make sense of.
pub(crate) fn unexpected(tok: Spanning<Token<'_>>) -> Spanning<ParseError> {
    match tok.item {
        Token::EndOfFile => Spanning::new(ParseError::UnexpectedEndOfFile, tok.span),
        other => Spanning::new(ParseError::UnexpectedToken(other.to_string()), tok.span),
    }
}

pub(crate) fn grammar_error<T>(
    lex: &Lexer<'_>,
    msg: &'static str,
) -> Result<T, Spanning<ParseError>> {
    Err(Spanning::new(ParseError::Grammar(msg), lex.last().span))
}

/// Consumes a name token and returns its literal, or fails with the given
/// grammar message.
pub(crate) fn expect_name(lex: &mut Lexer<'_>, msg: &'static str) -> ParseResult<String> {
    let tok = lex.advance()?;
    match tok.item {
        Token::Name(name) => Ok(name.into()),
        Token::EndOfFile => Err(Spanning::new(ParseError::UnexpectedEndOfFile, tok.span)),
        _ => Err(Spanning::new(ParseError::Grammar(msg), tok.span)),
    }
}

/// Parses a type reference: `Name`, `[Type]` or `{name: Type, …}`, each
/// optionally followed by `!` flipping nullability off.
pub(crate) fn parse_type(lex: &mut Lexer<'_>) -> ParseResult<TypeDescriptor> {
    let tok = lex.advance()?;
    match tok.item {
        Token::Name(name) => {
            let non_null = lex.optional(TokenKind::ExclamationMark)?;
            Ok(TypeDescriptor::Base {
                name: name.into(),
                nullable: !non_null,
            })
        }
        Token::BracketOpen => {
            let of = parse_type(lex)?;
            if !lex.expect(TokenKind::BracketClose)? {
                return grammar_error(lex, "Unclosed list type");
            }
            let non_null = lex.optional(TokenKind::ExclamationMark)?;
            Ok(TypeDescriptor::List {
                of: Box::new(of),
                nullable: !non_null,
            })
        }
        Token::CurlyOpen => {
            let mut fields = IndexMap::new();
            loop {
                if lex.optional(TokenKind::CurlyClose)? {
                    break;
                }
                let key = expect_name(lex, "Input object type must have a key")?;
                if !lex.expect(TokenKind::Colon)? {
                    return grammar_error(lex, "Input object key must have a type");
                }
                let value = parse_type(lex)?;
                fields.insert(key, value);
            }
            let non_null = lex.optional(TokenKind::ExclamationMark)?;
            Ok(TypeDescriptor::InputObject {
                fields,
                nullable: !non_null,
            })
        }
        _ => Err(Spanning::new(ParseError::Grammar("Invalid type"), tok.span)),
    }
}
