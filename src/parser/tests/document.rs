use crate::{
    ast::{
        Definition, Document, Field, InputValue, OperationType, Selection, TypeDescriptor,
    },
    parser::{parse_document, ParseError},
};

fn parse(source: &str) -> Document {
    parse_document(source).unwrap_or_else(|e| panic!("Parse error for {source:#?}: {e}"))
}

fn parse_error(source: &str) -> ParseError {
    match parse_document(source) {
        Ok(doc) => panic!("Expected parse error for {source:#?}, got {doc:#?}"),
        Err(e) => e.item,
    }
}

fn single_operation(doc: &Document) -> &crate::ast::Operation {
    match doc.definitions.as_slice() {
        [Definition::Operation(op)] => op,
        other => panic!("Expected a single operation, got {other:#?}"),
    }
}

fn field(sel: &Selection) -> &Field {
    match sel {
        Selection::Field(field) => field,
        other => panic!("Expected a field, got {other:#?}"),
    }
}

#[test]
fn empty_document() {
    assert_eq!(parse("").definitions, Vec::new());
}

#[test]
fn shorthand_document_is_an_anonymous_query() {
    let doc = parse("{ id, name }");
    let op = single_operation(&doc);

    assert_eq!(op.name, "");
    assert_eq!(op.operation_type, OperationType::Query);
    assert_eq!(
        op.selection_set
            .iter()
            .map(|s| field(s).name.as_str())
            .collect::<Vec<_>>(),
        ["id", "name"]
    );
}

#[test]
fn named_query_with_nested_selections() {
    let doc = parse(
        r#"
        query NestedQuery {
            hero {
                name
                friends {
                    name
                    appearsIn
                }
            }
        }
        "#,
    );
    let op = single_operation(&doc);

    assert_eq!(op.name, "NestedQuery");
    let hero = field(&op.selection_set[0]);
    assert_eq!(hero.name, "hero");
    let subfields = hero.selection_set.as_ref().unwrap();
    assert_eq!(field(&subfields[0]).name, "name");
    let friends = field(&subfields[1]);
    assert_eq!(friends.selection_set.as_ref().unwrap().len(), 2);
}

#[test]
fn field_arguments() {
    let doc = parse(r#"query FetchLukeQuery { human(id: "1000") { name } }"#);
    let human = field(&single_operation(&doc).selection_set[0]);

    assert_eq!(
        human.arguments,
        vec![("id".to_owned(), InputValue::String("1000".into()))]
    );
}

#[test]
fn aliased_fields() {
    let doc = parse(
        r#"
        query FetchLukeAndLeiaAliased {
            luke: human(id: "1000") { name }
            leia: human(id: "1003") { name }
        }
        "#,
    );
    let op = single_operation(&doc);

    let luke = field(&op.selection_set[0]);
    assert_eq!(luke.alias.as_deref(), Some("luke"));
    assert_eq!(luke.name, "human");
    assert_eq!(luke.response_key(), "luke");

    let leia = field(&op.selection_set[1]);
    assert_eq!(leia.response_key(), "leia");
}

#[test]
fn variable_definitions() {
    let doc = parse(r#"query FetchSomeIDQuery($someId: String!) { human(id: $someId) { name } }"#);
    let op = single_operation(&doc);

    assert_eq!(op.variable_definitions.len(), 1);
    let var = &op.variable_definitions[0];
    assert_eq!(var.name, "someId");
    assert_eq!(
        var.var_type,
        TypeDescriptor::Base {
            name: "String".into(),
            nullable: false,
        }
    );
    assert_eq!(var.default, None);

    let human = field(&op.selection_set[0]);
    assert_eq!(
        human.arguments,
        vec![("id".to_owned(), InputValue::Variable("someId".into()))]
    );
}

#[test]
fn variable_default_values() {
    let doc = parse(r#"query Q($size: Int = 10) { profilePic(size: $size) { url } }"#);
    let var = &single_operation(&doc).variable_definitions[0];

    assert_eq!(var.default, Some(InputValue::Int(10)));
    assert!(var.var_type.nullable());
}

#[test]
fn list_typed_variables() {
    let doc = parse(r#"query Q($ids: [ID!]!) { humans(ids: $ids) { name } }"#);
    let var = &single_operation(&doc).variable_definitions[0];

    assert_eq!(var.var_type.to_string(), "[ID!]!");
    assert!(!var.var_type.nullable());
}

#[test]
fn fragment_definitions_and_spreads() {
    let doc = parse(
        r#"
        query UseFragment {
            luke: human(id: "1000") { ...HumanFragment }
        }
        fragment HumanFragment on Human {
            name
            homePlanet
        }
        "#,
    );

    assert_eq!(doc.definitions.len(), 2);
    let Definition::Fragment(frag) = &doc.definitions[1] else {
        panic!("Expected a fragment definition");
    };
    assert_eq!(frag.name, "HumanFragment");
    assert_eq!(frag.type_condition, "Human");

    let op = match &doc.definitions[0] {
        Definition::Operation(op) => op,
        other => panic!("Expected an operation, got {other:#?}"),
    };
    let luke = field(&op.selection_set[0]);
    match &luke.selection_set.as_ref().unwrap()[0] {
        Selection::FragmentSpread(spread) => assert_eq!(spread.name, "HumanFragment"),
        other => panic!("Expected a fragment spread, got {other:#?}"),
    }
}

#[test]
fn inline_fragments() {
    let doc = parse(
        r#"
        query inlineFragmentTyping {
            profiles(handles: ["zuck", "cocacola"]) {
                handle
                ... on User {
                    friends { count }
                }
                ... on Page {
                    likers { count }
                }
            }
        }
        "#,
    );
    let profiles = field(&single_operation(&doc).selection_set[0]);

    assert_eq!(
        profiles.arguments,
        vec![(
            "handles".to_owned(),
            InputValue::List(vec![
                InputValue::String("zuck".into()),
                InputValue::String("cocacola".into()),
            ])
        )]
    );

    let subs = profiles.selection_set.as_ref().unwrap();
    match &subs[1] {
        Selection::InlineFragment(frag) => {
            assert_eq!(frag.name, "");
            assert_eq!(frag.type_condition, "User");
        }
        other => panic!("Expected an inline fragment, got {other:#?}"),
    }
    match &subs[2] {
        Selection::InlineFragment(frag) => assert_eq!(frag.type_condition, "Page"),
        other => panic!("Expected an inline fragment, got {other:#?}"),
    }
}

#[test]
fn directives_on_fields_and_spreads() {
    let doc = parse(
        r#"
        query Q($s: Boolean!) {
            hero {
                name @skip(if: $s)
                ...F @include(if: true)
            }
        }
        fragment F on Human { id }
        "#,
    );
    let op = match &doc.definitions[0] {
        Definition::Operation(op) => op,
        other => panic!("Expected an operation, got {other:#?}"),
    };
    let hero = field(&op.selection_set[0]);
    let subs = hero.selection_set.as_ref().unwrap();

    let name = field(&subs[0]);
    assert_eq!(name.directives.len(), 1);
    assert_eq!(name.directives[0].name, "skip");
    assert_eq!(
        name.directives[0].argument("if"),
        Some(&InputValue::Variable("s".into()))
    );

    match &subs[1] {
        Selection::FragmentSpread(spread) => {
            assert_eq!(spread.directives[0].name, "include");
            assert_eq!(
                spread.directives[0].argument("if"),
                Some(&InputValue::Boolean(true))
            );
        }
        other => panic!("Expected a fragment spread, got {other:#?}"),
    }
}

#[test]
fn mutation_operations() {
    let doc = parse(r#"mutation M { create(name: "x") { id } }"#);
    let op = single_operation(&doc);

    assert_eq!(op.operation_type, OperationType::Mutation);
    assert_eq!(op.name, "M");
}

#[test]
fn value_literals() {
    let doc = parse(
        r#"{ f(a: 1, b: -4.5, c: "str", d: true, e: COLOR, g: [1, 2], h: {x: 1, y: "z"}) }"#,
    );
    let f = field(&single_operation(&doc).selection_set[0]);
    let arg = |key: &str| {
        f.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };

    assert_eq!(arg("a"), InputValue::Int(1));
    assert_eq!(arg("b"), InputValue::Float(-4.5));
    assert_eq!(arg("c"), InputValue::String("str".into()));
    assert_eq!(arg("d"), InputValue::Boolean(true));
    assert_eq!(arg("e"), InputValue::Enum("COLOR".into()));
    assert_eq!(
        arg("g"),
        InputValue::List(vec![InputValue::Int(1), InputValue::Int(2)])
    );
    match arg("h") {
        InputValue::Object(fields) => {
            assert_eq!(fields["x"], InputValue::Int(1));
            assert_eq!(fields["y"], InputValue::String("z".into()));
        }
        other => panic!("Expected an object value, got {other:#?}"),
    }
}

#[test]
fn string_escapes_are_decoded() {
    let doc = parse(r#"{ f(a: "a\"b\\c\ndA") }"#);
    let f = field(&single_operation(&doc).selection_set[0]);

    assert_eq!(
        f.arguments[0].1,
        InputValue::String("a\"b\\c\ndA".into())
    );
}

#[test]
fn null_literals_are_rejected() {
    assert_eq!(
        parse_error("{ f(a: null) }"),
        ParseError::Grammar("Value cannot be null")
    );
}

#[test]
fn invalid_number_literals() {
    assert_eq!(
        parse_error("{ f(a: 123456789012345678901234567890) }"),
        ParseError::Grammar("Invalid integer literal")
    );
}

#[test]
fn keyword_operations_may_be_anonymous() {
    let doc = parse("query($s: Boolean!) { hero @skip(if: $s) { name } }");
    let op = single_operation(&doc);

    assert_eq!(op.name, "");
    assert_eq!(op.variable_definitions[0].name, "s");
}

#[test]
fn grammar_errors() {
    assert_eq!(
        parse_error("query Q"),
        ParseError::Grammar("Operation definition must have a selection set")
    );
    assert_eq!(
        parse_error("frag X on Y { a }"),
        ParseError::Grammar("Beginning of definition not one of query, mutation or fragment")
    );
    assert_eq!(
        parse_error("fragment X { a }"),
        ParseError::Grammar("Fragment name must be followed by 'on'")
    );
    assert_eq!(
        parse_error("{ a"),
        ParseError::Grammar("Unclosed selection set")
    );
    assert_eq!(
        parse_error("{ a(x) }"),
        ParseError::Grammar("Argument key without value")
    );
}

// Re-parsing a rendered document must produce a structurally equal AST.
#[test]
fn parse_display_round_trip() {
    let sources = [
        "{ id, name }",
        "query HeroNameQuery { hero { name } }",
        r#"query FetchLukeQuery { human(id: "1000") { name } }"#,
        r#"query Q($someId: String!) { human(id: $someId) { name } }"#,
        r#"query Q($size: Int = 10, $on: Boolean!) { pic(size: $size) @include(if: $on) { url } }"#,
        r#"query A { luke: human(id: "1000") { ...HumanFragment } }
           fragment HumanFragment on Human { name homePlanet }"#,
        r#"{ profiles(handles: ["zuck", "cocacola"]) { handle ... on User { friends { count } } } }"#,
        r#"mutation M { create(name: "x\n\"quoted\"") { id } }"#,
        r#"{ f(a: 1, b: -4.5, c: [1, 2], d: {x: ONE}) }"#,
    ];

    for source in sources {
        let parsed = parse(source);
        let rendered = parsed.to_string();
        assert_eq!(parse(&rendered), parsed, "for {source:#?} => {rendered:#?}");
    }
}
