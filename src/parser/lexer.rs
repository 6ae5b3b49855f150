use std::{fmt, iter::Peekable, str::CharIndices};

use derive_more::with_trait::{Display, Error};

use crate::parser::{SourcePosition, Spanning};

/// A single token in the input source
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token<'a> {
    Name(&'a str),
    Int(&'a str),
    Float(&'a str),
    /// Contents of a string literal, without the enclosing quotes. Escape
    /// sequences are carried verbatim; the parser decodes them.
    String(&'a str),
    /// A `$`-prefixed variable reference, without the `$`.
    Variable(&'a str),
    ExclamationMark,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    CurlyOpen,
    CurlyClose,
    Ellipsis,
    Colon,
    Equals,
    At,
    Pipe,
    EndOfFile,
}

/// Discriminant of a [`Token`], used by the parser to match tokens without
/// caring about their literal contents.
#[expect(missing_docs, reason = "self-explanatory")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Name,
    Int,
    Float,
    String,
    Variable,
    ExclamationMark,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    CurlyOpen,
    CurlyClose,
    Ellipsis,
    Colon,
    Equals,
    At,
    Pipe,
    EndOfFile,
}

impl Token<'_> {
    /// Returns the [`TokenKind`] of this [`Token`].
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Name(_) => TokenKind::Name,
            Self::Int(_) => TokenKind::Int,
            Self::Float(_) => TokenKind::Float,
            Self::String(_) => TokenKind::String,
            Self::Variable(_) => TokenKind::Variable,
            Self::ExclamationMark => TokenKind::ExclamationMark,
            Self::ParenOpen => TokenKind::ParenOpen,
            Self::ParenClose => TokenKind::ParenClose,
            Self::BracketOpen => TokenKind::BracketOpen,
            Self::BracketClose => TokenKind::BracketClose,
            Self::CurlyOpen => TokenKind::CurlyOpen,
            Self::CurlyClose => TokenKind::CurlyClose,
            Self::Ellipsis => TokenKind::Ellipsis,
            Self::Colon => TokenKind::Colon,
            Self::Equals => TokenKind::Equals,
            Self::At => TokenKind::At,
            Self::Pipe => TokenKind::Pipe,
            Self::EndOfFile => TokenKind::EndOfFile,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(s) | Self::Int(s) | Self::Float(s) => write!(f, "{s}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Variable(s) => write!(f, "${s}"),
            Self::ExclamationMark => write!(f, "!"),
            Self::ParenOpen => write!(f, "("),
            Self::ParenClose => write!(f, ")"),
            Self::BracketOpen => write!(f, "["),
            Self::BracketClose => write!(f, "]"),
            Self::CurlyOpen => write!(f, "{{"),
            Self::CurlyClose => write!(f, "}}"),
            Self::Ellipsis => write!(f, "..."),
            Self::Colon => write!(f, ":"),
            Self::Equals => write!(f, "="),
            Self::At => write!(f, "@"),
            Self::Pipe => write!(f, "|"),
            Self::EndOfFile => write!(f, "End of file"),
        }
    }
}

/// Error when tokenizing the input source
#[derive(Clone, Debug, Display, Eq, Error, PartialEq)]
pub enum LexerError {
    /// An unknown character was found
    ///
    /// Unknown characters are characters that do not occur anywhere in the
    /// GraphQL language, such as `?` or `%`.
    #[display("Unknown character \"{_0}\"")]
    UnknownCharacter(#[error(not(source))] char),

    /// An unexpected character was found
    ///
    /// Unexpected characters are characters that _do_ exist in the GraphQL
    /// language, but is not expected at the current position in the document.
    #[display("Unexpected character \"{_0}\"")]
    UnexpectedCharacter(#[error(not(source))] char),

    /// An unterminated string literal was found
    #[display("Unterminated string literal")]
    UnterminatedString,

    /// A raw line terminator was found inside a string literal
    #[display("Line terminator in string literal")]
    LineTerminatorInString,

    /// The input source was unexpectedly terminated
    ///
    /// Emitted when the current token requires a succeeding character, but
    /// the source has reached EOF. Emitted when scanning e.g. `-`.
    #[display("Unexpected end of input")]
    UnexpectedEndOfFile,
}

pub type LexerResult<'a> = Result<Spanning<Token<'a>>, Spanning<LexerError>>;

/// Tokenizer over a GraphQL source string with a one-token lookahead.
///
/// The grammar-facing operations ([`advance`], [`expect`], [`optional`],
/// [`last_is`], [`discard`]) all work on significant tokens; whitespace,
/// commas and comments are skipped transparently. A failed [`optional`]
/// leaves the peeked token buffered, so the following [`advance`] or
/// [`expect`] consumes it without re-reading the stream. This lets the
/// parser speculate on the next token without backtracking.
///
/// [`advance`]: Lexer::advance
/// [`expect`]: Lexer::expect
/// [`optional`]: Lexer::optional
/// [`last_is`]: Lexer::last_is
/// [`discard`]: Lexer::discard
#[derive(Debug)]
pub struct Lexer<'a> {
    iterator: Peekable<CharIndices<'a>>,
    source: &'a str,
    position: SourcePosition,
    last: Spanning<Token<'a>>,
    buffered: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new [`Lexer`] over the given source string.
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            iterator: source.char_indices().peekable(),
            source,
            position: SourcePosition::origin(),
            last: Spanning::at(Token::EndOfFile, SourcePosition::origin()),
            buffered: false,
        }
    }

    /// Consumes one significant token and returns it.
    pub fn advance(&mut self) -> LexerResult<'a> {
        if self.buffered {
            self.buffered = false;
        } else {
            self.last = self.scan_token()?;
        }
        Ok(self.last)
    }

    /// Consumes one significant token and reports whether it is of the
    /// expected kind. The consumed token is available through [`Lexer::last`].
    pub fn expect(&mut self, expected: TokenKind) -> Result<bool, Spanning<LexerError>> {
        let tok = self.advance()?;
        Ok(tok.item.kind() == expected)
    }

    /// Peeks one significant token and consumes it only when it is of the
    /// expected kind. On a mismatch the token stays buffered for the next
    /// [`Lexer::advance`] or [`Lexer::expect`].
    pub fn optional(&mut self, expected: TokenKind) -> Result<bool, Spanning<LexerError>> {
        let tok = self.advance()?;
        if tok.item.kind() == expected {
            Ok(true)
        } else {
            self.buffered = true;
            Ok(false)
        }
    }

    /// Reports whether the last consumed token is of the given kind, without
    /// touching the stream.
    #[must_use]
    pub fn last_is(&self, expected: TokenKind) -> bool {
        self.last.item.kind() == expected
    }

    /// Consumes one significant token and ignores it.
    pub fn discard(&mut self) -> Result<(), Spanning<LexerError>> {
        self.advance().map(drop)
    }

    /// Returns the last consumed token.
    #[must_use]
    pub fn last(&self) -> Spanning<Token<'a>> {
        self.last
    }

    /// Returns the current position in the source.
    #[must_use]
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    fn peek_char(&mut self) -> Option<(usize, char)> {
        self.iterator.peek().map(|&(idx, ch)| (idx, ch))
    }

    fn next_char(&mut self) -> Option<(usize, char)> {
        let next = self.iterator.next();

        if let Some((_, ch)) = next {
            self.position.bump(ch);
        }

        next
    }

    fn emit_single_char(&mut self, t: Token<'a>) -> Spanning<Token<'a>> {
        let start_pos = self.position;
        self.next_char();
        Spanning::single(t, start_pos)
    }

    fn scan_over_ignored(&mut self) {
        while let Some((_, ch)) = self.peek_char() {
            if is_ignored_char(ch) {
                self.next_char();
            } else if ch == '#' {
                self.next_char();
                while let Some((_, ch)) = self.peek_char() {
                    if is_line_terminator(ch) {
                        break;
                    }
                    self.next_char();
                }
            } else {
                break;
            }
        }
    }

    fn scan_token(&mut self) -> LexerResult<'a> {
        self.scan_over_ignored();

        let ch = self.peek_char().map(|(_, ch)| ch);

        match ch {
            Some('!') => Ok(self.emit_single_char(Token::ExclamationMark)),
            Some('(') => Ok(self.emit_single_char(Token::ParenOpen)),
            Some(')') => Ok(self.emit_single_char(Token::ParenClose)),
            Some('[') => Ok(self.emit_single_char(Token::BracketOpen)),
            Some(']') => Ok(self.emit_single_char(Token::BracketClose)),
            Some('{') => Ok(self.emit_single_char(Token::CurlyOpen)),
            Some('}') => Ok(self.emit_single_char(Token::CurlyClose)),
            Some(':') => Ok(self.emit_single_char(Token::Colon)),
            Some('=') => Ok(self.emit_single_char(Token::Equals)),
            Some('@') => Ok(self.emit_single_char(Token::At)),
            Some('|') => Ok(self.emit_single_char(Token::Pipe)),
            Some('.') => self.scan_ellipsis(),
            Some('"') => self.scan_string(),
            Some('$') => self.scan_variable(),
            Some(ch) => {
                if is_number_start(ch) {
                    self.scan_number()
                } else if is_name_start(ch) {
                    self.scan_name().map(|s| s.map(Token::Name))
                } else {
                    Err(Spanning::at(
                        LexerError::UnknownCharacter(ch),
                        self.position,
                    ))
                }
            }
            None => Ok(Spanning::at(Token::EndOfFile, self.position)),
        }
    }

    fn scan_ellipsis(&mut self) -> LexerResult<'a> {
        let start_pos = self.position;

        for _ in 0..3 {
            let (_, ch) = self
                .next_char()
                .ok_or_else(|| Spanning::at(LexerError::UnexpectedEndOfFile, self.position))?;
            if ch != '.' {
                return Err(Spanning::at(
                    LexerError::UnexpectedCharacter('.'),
                    start_pos,
                ));
            }
        }

        Ok(Spanning::between(Token::Ellipsis, start_pos, self.position))
    }

    fn scan_name(&mut self) -> Result<Spanning<&'a str>, Spanning<LexerError>> {
        let start_pos = self.position;
        let (start_idx, start_ch) = self
            .next_char()
            .ok_or_else(|| Spanning::at(LexerError::UnexpectedEndOfFile, self.position))?;
        debug_assert!(is_name_start(start_ch));

        let mut end_idx = start_idx;

        while let Some((idx, ch)) = self.peek_char() {
            if is_name_cont(ch) {
                self.next_char();
                end_idx = idx;
            } else {
                break;
            }
        }

        Ok(Spanning::between(
            &self.source[start_idx..=end_idx],
            start_pos,
            self.position,
        ))
    }

    fn scan_variable(&mut self) -> LexerResult<'a> {
        let start_pos = self.position;
        self.next_char();

        match self.peek_char() {
            Some((_, ch)) if is_name_start(ch) => {
                let name = self.scan_name()?;
                Ok(Spanning::between(
                    Token::Variable(name.item),
                    start_pos,
                    self.position,
                ))
            }
            Some((_, ch)) => Err(Spanning::at(
                LexerError::UnexpectedCharacter(ch),
                self.position,
            )),
            None => Err(Spanning::at(
                LexerError::UnexpectedEndOfFile,
                self.position,
            )),
        }
    }

    fn scan_string(&mut self) -> LexerResult<'a> {
        let start_pos = self.position;
        self.next_char();

        let mut contents_start = None;
        let mut escaped = false;
        while let Some((idx, ch)) = self.next_char() {
            if contents_start.is_none() {
                contents_start = Some(idx);
            }
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    let start = contents_start.unwrap_or(idx);
                    return Ok(Spanning::between(
                        Token::String(&self.source[start..idx]),
                        start_pos,
                        self.position,
                    ));
                }
                c if is_line_terminator(c) => {
                    return Err(Spanning::at(
                        LexerError::LineTerminatorInString,
                        self.position,
                    ));
                }
                _ => {}
            }
        }

        Err(Spanning::at(LexerError::UnterminatedString, self.position))
    }

    fn scan_number(&mut self) -> LexerResult<'a> {
        let start_pos = self.position;
        let (start_idx, first) = self
            .peek_char()
            .ok_or_else(|| Spanning::at(LexerError::UnexpectedEndOfFile, self.position))?;

        let mut end_idx = start_idx;
        let mut is_float = false;

        if first == '-' {
            self.next_char();
            match self.peek_char() {
                Some((_, ch)) if ch.is_ascii_digit() => {}
                Some((_, ch)) => {
                    return Err(Spanning::at(
                        LexerError::UnexpectedCharacter(ch),
                        self.position,
                    ));
                }
                None => {
                    return Err(Spanning::at(
                        LexerError::UnexpectedEndOfFile,
                        self.position,
                    ));
                }
            }
        }

        // Integral part. A leading zero must not be followed by another
        // digit or an exponent marker.
        let mut leading_zero = false;
        let mut first_digit = true;
        while let Some((idx, ch)) = self.peek_char() {
            if !ch.is_ascii_digit() {
                if leading_zero && (ch == 'e' || ch == 'E') {
                    return Err(Spanning::at(
                        LexerError::UnexpectedCharacter(ch),
                        self.position,
                    ));
                }
                break;
            }
            if leading_zero {
                return Err(Spanning::at(
                    LexerError::UnexpectedCharacter('0'),
                    self.position,
                ));
            }
            if first_digit && ch == '0' {
                leading_zero = true;
            }
            first_digit = false;
            self.next_char();
            end_idx = idx;
        }

        if let Some((idx, '.')) = self.peek_char() {
            is_float = true;
            self.next_char();
            end_idx = idx;
            while let Some((idx, ch)) = self.peek_char() {
                if !ch.is_ascii_digit() {
                    break;
                }
                self.next_char();
                end_idx = idx;
            }
        }

        if let Some((idx, ch)) = self.peek_char() {
            if ch == 'e' || ch == 'E' {
                is_float = true;
                self.next_char();
                end_idx = idx;
                if let Some((idx, ch)) = self.peek_char() {
                    if ch == '+' || ch == '-' {
                        self.next_char();
                        end_idx = idx;
                    }
                }
                while let Some((idx, ch)) = self.peek_char() {
                    if !ch.is_ascii_digit() {
                        break;
                    }
                    self.next_char();
                    end_idx = idx;
                }
            }
        }

        let number = &self.source[start_idx..=end_idx];
        let token = if is_float {
            Token::Float(number)
        } else {
            Token::Int(number)
        };

        Ok(Spanning::between(token, start_pos, self.position))
    }
}

fn is_ignored_char(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' // tab
            | '\u{000b}' // vertical tab
            | '\u{000c}' // form feed
            | '\u{0020}' // space
            | '\u{00a0}' // nbsp
            | ','
    ) || is_line_terminator(c)
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\u{000a}' | '\u{000d}' | '\u{2028}' | '\u{2029}')
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_cont(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit()
}

fn is_number_start(c: char) -> bool {
    c == '-' || c.is_ascii_digit()
}
