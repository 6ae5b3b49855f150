use indexmap::IndexMap;

use crate::{
    ast::{
        Definition, Directive, Document, Field, Fragment, FragmentSpread, InputValue, Operation,
        OperationType, Selection, VariableDefinition,
    },
    parser::{
        parser::{expect_name, grammar_error, parse_type, unexpected, ParseResult},
        Lexer, ParseError, Spanning, Token, TokenKind,
    },
};

/// Parses an executable GraphQL document.
///
/// A document whose first significant token is `{` is the shorthand form:
/// a single anonymous query operation. Otherwise the document is a series
/// of `query`, `mutation` and `fragment` definitions.
pub fn parse_document(source: &str) -> ParseResult<Document> {
    let mut lex = Lexer::new(source);
    let mut doc = Document::default();

    if lex.optional(TokenKind::CurlyOpen)? {
        let selection_set = parse_selection_set(&mut lex)?;
        doc.definitions.push(Definition::Operation(Operation {
            name: String::new(),
            operation_type: OperationType::Query,
            variable_definitions: Vec::new(),
            directives: Vec::new(),
            selection_set,
        }));
        return Ok(doc);
    }

    loop {
        if lex.optional(TokenKind::Name)? {
            let def = match lex.last().item {
                Token::Name("query") => {
                    Definition::Operation(parse_operation(&mut lex, OperationType::Query)?)
                }
                Token::Name("mutation") => {
                    Definition::Operation(parse_operation(&mut lex, OperationType::Mutation)?)
                }
                Token::Name("fragment") => {
                    Definition::Fragment(parse_fragment_definition(&mut lex)?)
                }
                _ => {
                    return grammar_error(
                        &lex,
                        "Beginning of definition not one of query, mutation or fragment",
                    );
                }
            };
            doc.definitions.push(def);
        } else {
            let tok = lex.advance()?;
            return match tok.item {
                Token::EndOfFile => Ok(doc),
                _ => Err(unexpected(tok)),
            };
        }
    }
}

/// Parses an operation definition. The leading `query`/`mutation` keyword
/// has already been consumed. The operation name is optional: the keyword
/// form may still be anonymous, e.g. `query($x: Int) { … }`.
fn parse_operation(lex: &mut Lexer<'_>, operation_type: OperationType) -> ParseResult<Operation> {
    let name = if lex.optional(TokenKind::Name)? {
        match lex.last().item {
            Token::Name(name) => name.to_owned(),
            _ => String::new(),
        }
    } else {
        String::new()
    };

    let variable_definitions = if lex.optional(TokenKind::ParenOpen)? {
        parse_variable_definitions(lex)?
    } else {
        Vec::new()
    };

    let directives = if lex.optional(TokenKind::At)? {
        parse_directives(lex)?
    } else {
        Vec::new()
    };

    if !lex.expect(TokenKind::CurlyOpen)? {
        return grammar_error(lex, "Operation definition must have a selection set");
    }
    let selection_set = parse_selection_set(lex)?;

    Ok(Operation {
        name,
        operation_type,
        variable_definitions,
        directives,
        selection_set,
    })
}

/// Parses a fragment definition. The leading `fragment` keyword has already
/// been consumed.
fn parse_fragment_definition(lex: &mut Lexer<'_>) -> ParseResult<Fragment> {
    let name = expect_name(lex, "No name for fragment")?;

    let tok = lex.advance()?;
    if tok.item != Token::Name("on") {
        return grammar_error(lex, "Fragment name must be followed by 'on'");
    }

    let type_condition = expect_name(lex, "Fragment definition must be on a type")?;

    let directives = if lex.optional(TokenKind::At)? {
        parse_directives(lex)?
    } else {
        Vec::new()
    };

    if !lex.expect(TokenKind::CurlyOpen)? {
        return grammar_error(lex, "Fragment definition must have a selection set");
    }
    let selection_set = parse_selection_set(lex)?;

    Ok(Fragment {
        name,
        type_condition,
        directives,
        selection_set,
    })
}

/// Parses the body of a selection set. The opening `{` has already been
/// consumed.
pub(crate) fn parse_selection_set(lex: &mut Lexer<'_>) -> ParseResult<Vec<Selection>> {
    let mut set = Vec::new();

    loop {
        let tok = lex.advance()?;
        match tok.item {
            Token::Name(name) => {
                let name = name.to_owned();
                set.push(Selection::Field(parse_field(lex, name)?));
            }
            Token::Ellipsis => set.push(parse_fragment_selection(lex)?),
            Token::CurlyClose => return Ok(set),
            Token::EndOfFile => {
                return Err(Spanning::new(
                    ParseError::Grammar("Unclosed selection set"),
                    tok.span,
                ));
            }
            _ => return Err(unexpected(tok)),
        }
    }
}

/// Parses a field. The first name token (the alias or the field name) has
/// already been consumed and is passed in.
fn parse_field(lex: &mut Lexer<'_>, first_name: String) -> ParseResult<Field> {
    let mut name = first_name;
    let mut alias = None;

    if lex.optional(TokenKind::Colon)? {
        alias = Some(name);
        name = expect_name(lex, "Alias without a name")?;
    }

    let arguments = if lex.optional(TokenKind::ParenOpen)? {
        parse_arguments(lex)?
    } else {
        Vec::new()
    };

    let directives = if lex.optional(TokenKind::At)? {
        parse_directives(lex)?
    } else {
        Vec::new()
    };

    let selection_set = if lex.optional(TokenKind::CurlyOpen)? {
        Some(parse_selection_set(lex)?)
    } else {
        None
    };

    Ok(Field {
        alias,
        name,
        arguments,
        directives,
        selection_set,
    })
}

/// Parses the selection following a `...` token: either a fragment spread
/// or, when the next name is the `on` sentinel, an inline fragment.
fn parse_fragment_selection(lex: &mut Lexer<'_>) -> ParseResult<Selection> {
    let name = expect_name(lex, "Invalid fragment name in spread")?;

    if name == "on" {
        let type_condition = expect_name(lex, "Fragment definition must be on a type")?;

        let directives = if lex.optional(TokenKind::At)? {
            parse_directives(lex)?
        } else {
            Vec::new()
        };

        if !lex.expect(TokenKind::CurlyOpen)? {
            return grammar_error(lex, "Inline fragment must have a selection set");
        }
        let selection_set = parse_selection_set(lex)?;

        return Ok(Selection::InlineFragment(Fragment {
            name: String::new(),
            type_condition,
            directives,
            selection_set,
        }));
    }

    let directives = if lex.optional(TokenKind::At)? {
        parse_directives(lex)?
    } else {
        Vec::new()
    };

    Ok(Selection::FragmentSpread(FragmentSpread {
        name,
        directives,
    }))
}

/// Parses directives. The first `@` has already been consumed.
pub(crate) fn parse_directives(lex: &mut Lexer<'_>) -> ParseResult<Vec<Directive>> {
    let mut directives = Vec::new();

    loop {
        let name = expect_name(lex, "Expected name in directive")?;
        let arguments = if lex.optional(TokenKind::ParenOpen)? {
            parse_arguments(lex)?
        } else {
            Vec::new()
        };
        directives.push(Directive { name, arguments });

        if !lex.optional(TokenKind::At)? {
            return Ok(directives);
        }
    }
}

/// Parses an argument list. The opening `(` has already been consumed.
pub(crate) fn parse_arguments(lex: &mut Lexer<'_>) -> ParseResult<Vec<(String, InputValue)>> {
    let mut arguments = Vec::new();

    loop {
        let tok = lex.advance()?;
        match tok.item {
            Token::Name(key) => {
                let key = key.to_owned();
                if !lex.expect(TokenKind::Colon)? {
                    return grammar_error(lex, "Argument key without value");
                }
                let value = parse_value(lex)?;
                arguments.push((key, value));
            }
            Token::ParenClose => return Ok(arguments),
            Token::EndOfFile => {
                return Err(Spanning::new(ParseError::UnexpectedEndOfFile, tok.span));
            }
            _ => return Err(unexpected(tok)),
        }
    }
}

/// Parses variable definitions. The opening `(` has already been consumed.
fn parse_variable_definitions(lex: &mut Lexer<'_>) -> ParseResult<Vec<VariableDefinition>> {
    let mut variables = Vec::new();

    loop {
        let tok = lex.advance()?;
        match tok.item {
            Token::Variable(name) => {
                let name = name.to_owned();
                if !lex.expect(TokenKind::Colon)? {
                    return grammar_error(lex, "Variable without type");
                }
                let var_type = parse_type(lex)?;
                let default = if lex.optional(TokenKind::Equals)? {
                    Some(parse_value(lex)?)
                } else {
                    None
                };
                variables.push(VariableDefinition {
                    name,
                    var_type,
                    default,
                });
            }
            Token::ParenClose => return Ok(variables),
            Token::EndOfFile => {
                return Err(Spanning::new(ParseError::UnexpectedEndOfFile, tok.span));
            }
            _ => return Err(unexpected(tok)),
        }
    }
}

/// Parses a value literal.
pub(crate) fn parse_value(lex: &mut Lexer<'_>) -> ParseResult<InputValue> {
    let tok = lex.advance()?;
    match tok.item {
        Token::Int(lit) => lit.parse().map(InputValue::Int).map_err(|_| {
            Spanning::new(ParseError::Grammar("Invalid integer literal"), tok.span)
        }),
        Token::Float(lit) => lit
            .parse()
            .map(InputValue::Float)
            .map_err(|_| Spanning::new(ParseError::Grammar("Invalid float literal"), tok.span)),
        Token::String(lit) => Ok(InputValue::String(unescape_string(lit))),
        Token::Variable(name) => Ok(InputValue::Variable(name.into())),
        Token::Name("true") => Ok(InputValue::Boolean(true)),
        Token::Name("false") => Ok(InputValue::Boolean(false)),
        Token::Name("null") => Err(Spanning::new(
            ParseError::Grammar("Value cannot be null"),
            tok.span,
        )),
        Token::Name(name) => Ok(InputValue::Enum(name.into())),
        Token::CurlyOpen => parse_object_value(lex),
        Token::BracketOpen => parse_list_value(lex),
        _ => Err(unexpected(tok)),
    }
}

fn parse_list_value(lex: &mut Lexer<'_>) -> ParseResult<InputValue> {
    let mut items = Vec::new();

    loop {
        if lex.optional(TokenKind::BracketClose)? {
            return Ok(InputValue::List(items));
        }
        items.push(parse_value(lex)?);
    }
}

fn parse_object_value(lex: &mut Lexer<'_>) -> ParseResult<InputValue> {
    let mut fields = IndexMap::new();

    loop {
        if lex.optional(TokenKind::CurlyClose)? {
            return Ok(InputValue::Object(fields));
        }
        let key = expect_name(lex, "Object value must have a key")?;
        if !lex.expect(TokenKind::Colon)? {
            return grammar_error(lex, "Object value must have a value");
        }
        let value = parse_value(lex)?;
        fields.insert(key, value);
    }
}

/// Decodes the escape sequences of a string literal.
///
/// The lexer carries literal contents verbatim; this is where `\n`, `\"`,
/// `\uXXXX` and friends become the characters they denote. Unknown escapes
/// keep the escaped character as-is.
fn unescape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000c}'),
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
