use indexmap::IndexMap;

use crate::{
    ast::{
        ArgumentDeclaration, Definition, Document, EnumDefinition, InterfaceDefinition,
        ObjectDefinition, ScalarDefinition, ScalarKind, TypeDefinition, TypeField, UnionDefinition,
    },
    parser::{
        parser::{expect_name, grammar_error, parse_type, unexpected, ParseResult},
        Lexer, ParseError, Spanning, Token, TokenKind,
    },
};

/// Parses a type-system document: a series of `type`, `interface`, `enum`,
/// `union` and `scalar` definitions.
pub fn parse_schema_document(source: &str) -> ParseResult<Document> {
    let mut lex = Lexer::new(source);
    let mut doc = Document::default();

    loop {
        if lex.optional(TokenKind::Name)? {
            let def = match lex.last().item {
                Token::Name("type") => TypeDefinition::Object(parse_object_definition(&mut lex)?),
                Token::Name("interface") => {
                    TypeDefinition::Interface(parse_interface_definition(&mut lex)?)
                }
                Token::Name("enum") => TypeDefinition::Enum(parse_enum_definition(&mut lex)?),
                Token::Name("union") => TypeDefinition::Union(parse_union_definition(&mut lex)?),
                Token::Name("scalar") => {
                    TypeDefinition::Scalar(parse_scalar_definition(&mut lex)?)
                }
                _ => {
                    return grammar_error(
                        &lex,
                        "Beginning of definition not one of type, interface, enum, union or scalar",
                    );
                }
            };
            doc.definitions.push(Definition::Type(def));
        } else {
            let tok = lex.advance()?;
            return match tok.item {
                Token::EndOfFile => Ok(doc),
                _ => Err(unexpected(tok)),
            };
        }
    }
}

fn parse_object_definition(lex: &mut Lexer<'_>) -> ParseResult<ObjectDefinition> {
    let name = expect_name(lex, "Expected name in type declaration")?;

    let mut implements = Vec::new();
    if lex.optional(TokenKind::Colon)? {
        while lex.optional(TokenKind::Name)? {
            implements.push(name_literal(lex));
        }
        if implements.is_empty() {
            return grammar_error(lex, "Implements list must have at least one name");
        }
    }

    if !lex.expect(TokenKind::CurlyOpen)? {
        return grammar_error(lex, "Type declaration must have a body");
    }
    let fields = parse_type_fields(lex, "Type declaration must have at least one field")?;

    Ok(ObjectDefinition {
        name,
        fields,
        implements,
    })
}

fn parse_interface_definition(lex: &mut Lexer<'_>) -> ParseResult<InterfaceDefinition> {
    let name = expect_name(lex, "Expected name in interface declaration")?;

    if !lex.expect(TokenKind::CurlyOpen)? {
        return grammar_error(lex, "Interface declaration must have a body");
    }
    let fields = parse_type_fields(lex, "Interface declaration must have at least one field")?;

    Ok(InterfaceDefinition { name, fields })
}

fn parse_type_fields(lex: &mut Lexer<'_>, empty_msg: &'static str) -> ParseResult<Vec<TypeField>> {
    let mut fields = Vec::new();

    while lex.optional(TokenKind::Name)? {
        let name = name_literal(lex);
        fields.push(parse_type_field(lex, name)?);
    }

    if fields.is_empty() {
        return grammar_error(lex, empty_msg);
    }
    if !lex.expect(TokenKind::CurlyClose)? {
        return grammar_error(lex, "Invalid field declaration");
    }

    Ok(fields)
}

/// Parses a field declaration: `name(arg: Type, …)? : Type`. The field name
/// has already been consumed and is passed in.
fn parse_type_field(lex: &mut Lexer<'_>, name: String) -> ParseResult<TypeField> {
    let arguments = if lex.optional(TokenKind::ParenOpen)? {
        parse_argument_declarations(lex)?
    } else {
        Vec::new()
    };

    if !lex.expect(TokenKind::Colon)? {
        return grammar_error(lex, "Type field must have a type");
    }
    let field_type = parse_type(lex)?;

    Ok(TypeField::new(name, field_type, arguments))
}

/// Parses argument declarations. The opening `(` has already been consumed.
fn parse_argument_declarations(lex: &mut Lexer<'_>) -> ParseResult<Vec<ArgumentDeclaration>> {
    let mut arguments = Vec::new();

    loop {
        let tok = lex.advance()?;
        match tok.item {
            Token::Name(key) => {
                let key = key.to_owned();
                if !lex.expect(TokenKind::Colon)? {
                    return grammar_error(lex, "Argument declaration without a type");
                }
                let arg_type = parse_type(lex)?;
                arguments.push(ArgumentDeclaration { key, arg_type });
            }
            Token::ParenClose => return Ok(arguments),
            Token::EndOfFile => {
                return Err(Spanning::new(ParseError::UnexpectedEndOfFile, tok.span));
            }
            _ => return Err(unexpected(tok)),
        }
    }
}

fn parse_enum_definition(lex: &mut Lexer<'_>) -> ParseResult<EnumDefinition> {
    let name = expect_name(lex, "Expected name in enum declaration")?;

    if !lex.expect(TokenKind::CurlyOpen)? {
        return grammar_error(lex, "Enum declaration must have a body");
    }

    let mut values = IndexMap::new();
    let mut index = 0;
    while lex.optional(TokenKind::Name)? {
        let value = name_literal(lex);
        if values.insert(value, index).is_some() {
            return grammar_error(lex, "Repeated value in enum");
        }
        index += 1;
    }

    if values.is_empty() {
        return grammar_error(lex, "Enum declaration must have at least one value");
    }
    if !lex.expect(TokenKind::CurlyClose)? {
        return grammar_error(lex, "Invalid enum declaration");
    }

    Ok(EnumDefinition { name, values })
}

fn parse_union_definition(lex: &mut Lexer<'_>) -> ParseResult<UnionDefinition> {
    let name = expect_name(lex, "Expected name in union declaration")?;

    if !lex.expect(TokenKind::Equals)? {
        return grammar_error(lex, "Union declaration must contain a list of members");
    }

    let mut members = Vec::new();
    loop {
        let member = expect_name(lex, "Expected member name in union declaration")?;
        members.push(crate::ast::TypeDescriptor::named(member));

        if !lex.optional(TokenKind::Pipe)? {
            break;
        }
    }

    Ok(UnionDefinition::new(name, members))
}

fn parse_scalar_definition(lex: &mut Lexer<'_>) -> ParseResult<ScalarDefinition> {
    let name = expect_name(lex, "Expected name of scalar declaration")?;
    let base = expect_name(lex, "Expected base type of new scalar")?;

    let kind = match base.as_str() {
        "Int" => ScalarKind::Int,
        "Float" => ScalarKind::Float,
        "String" => ScalarKind::String,
        "Boolean" => ScalarKind::Boolean,
        _ => return grammar_error(lex, "Unknown base type for scalar"),
    };

    Ok(ScalarDefinition { name, kind })
}

fn name_literal(lex: &Lexer<'_>) -> String {
    match lex.last().item {
        Token::Name(name) => name.to_owned(),
        _ => unreachable!("name_literal called without a name token"),
    }
}
