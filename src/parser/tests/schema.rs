use crate::{
    ast::{Definition, Document, ScalarKind, TypeDefinition},
    parser::{parse_schema_document, ParseError},
};

// The validation-suite menagerie from the GraphQL specification examples.
const PET_SCHEMA: &str = r#"
enum DogCommand { SIT, DOWN, HEEL }

type Dog : Pet {
  name: String!
  nickname: String
  barkVolume: Int
  doesKnowCommand(dogCommand: DogCommand!) : Boolean!
  isHouseTrained(atOtherHomes: Boolean): Boolean!
}

interface Sentient {
  name: String!
}

interface Pet {
  name: String!
}

type Alien : Sentient {
  name: String!
  homePlanet: String
}

type Human : Sentient {
  name: String!
}

type Cat : Pet {
  name: String!
  nickname: String
  meowVolume: Int
}

union CatOrDog = Cat | Dog
union DogOrHuman = Dog | Human
union HumanOrAlien = Human | Alien
"#;

fn parse(source: &str) -> Document {
    parse_schema_document(source).unwrap_or_else(|e| panic!("Parse error for {source:#?}: {e}"))
}

fn parse_error(source: &str) -> ParseError {
    match parse_schema_document(source) {
        Ok(doc) => panic!("Expected parse error for {source:#?}, got {doc:#?}"),
        Err(e) => e.item,
    }
}

fn type_definitions(doc: &Document) -> Vec<&TypeDefinition> {
    doc.definitions
        .iter()
        .map(|def| match def {
            Definition::Type(def) => def,
            other => panic!("Expected a type definition, got {other:#?}"),
        })
        .collect()
}

#[test]
fn parses_the_pet_schema() {
    let doc = parse(PET_SCHEMA);
    let defs = type_definitions(&doc);

    let names: Vec<_> = defs.iter().map(|d| d.name()).collect();
    assert_eq!(
        names,
        [
            "DogCommand",
            "Dog",
            "Sentient",
            "Pet",
            "Alien",
            "Human",
            "Cat",
            "CatOrDog",
            "DogOrHuman",
            "HumanOrAlien",
        ]
    );

    let expected_fields: &[(&str, &[&str])] = &[
        (
            "Dog",
            &[
                "name",
                "nickname",
                "barkVolume",
                "doesKnowCommand",
                "isHouseTrained",
            ],
        ),
        ("Sentient", &["name"]),
        ("Pet", &["name"]),
        ("Alien", &["name", "homePlanet"]),
        ("Human", &["name"]),
        ("Cat", &["name", "nickname", "meowVolume"]),
    ];
    for (name, fields) in expected_fields {
        let def = defs.iter().find(|d| d.name() == *name).unwrap();
        for field in *fields {
            assert!(
                def.field(field).is_some(),
                "expected type '{name}' to have field '{field}'"
            );
        }
    }
}

#[test]
fn object_fields_carry_arguments_and_nullability() {
    let doc = parse(PET_SCHEMA);
    let defs = type_definitions(&doc);
    let dog = defs.iter().find(|d| d.name() == "Dog").unwrap();

    let command = dog.field("doesKnowCommand").unwrap();
    assert_eq!(command.field_type.to_string(), "Boolean!");
    assert_eq!(command.arguments.len(), 1);
    assert_eq!(command.arguments[0].key, "dogCommand");
    assert_eq!(command.arguments[0].arg_type.to_string(), "DogCommand!");

    let nickname = dog.field("nickname").unwrap();
    assert!(nickname.field_type.nullable());
}

#[test]
fn objects_record_their_interfaces() {
    let doc = parse(PET_SCHEMA);
    let defs = type_definitions(&doc);

    let TypeDefinition::Object(dog) = defs.iter().find(|d| d.name() == "Dog").unwrap() else {
        panic!("Dog must be an object");
    };
    assert_eq!(dog.implements, ["Pet"]);
}

#[test]
fn enums_preserve_declaration_order() {
    let doc = parse(PET_SCHEMA);
    let defs = type_definitions(&doc);

    let TypeDefinition::Enum(commands) = defs[0] else {
        panic!("DogCommand must be an enum");
    };
    assert_eq!(
        commands.values.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
        [("SIT", 0), ("DOWN", 1), ("HEEL", 2)]
    );
}

#[test]
fn unions_list_their_members() {
    let doc = parse(PET_SCHEMA);
    let defs = type_definitions(&doc);

    let TypeDefinition::Union(cat_or_dog) = defs.iter().find(|d| d.name() == "CatOrDog").unwrap()
    else {
        panic!("CatOrDog must be a union");
    };
    assert_eq!(
        cat_or_dog
            .members
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        ["Cat", "Dog"]
    );
}

#[test]
fn scalars_declare_a_base_kind() {
    let doc = parse("scalar UserId Int scalar Payload String");
    let defs = type_definitions(&doc);

    let TypeDefinition::Scalar(user_id) = defs[0] else {
        panic!("UserId must be a scalar");
    };
    assert_eq!(user_id.kind, ScalarKind::Int);

    let TypeDefinition::Scalar(payload) = defs[1] else {
        panic!("Payload must be a scalar");
    };
    assert_eq!(payload.kind, ScalarKind::String);
}

#[test]
fn list_and_non_null_field_types() {
    let doc = parse("type Human { friends: [Human]! ids: [ID!] }");
    let defs = type_definitions(&doc);

    let human = defs[0];
    assert_eq!(human.field("friends").unwrap().field_type.to_string(), "[Human]!");
    assert_eq!(human.field("ids").unwrap().field_type.to_string(), "[ID!]");
}

#[test]
fn grammar_errors() {
    assert_eq!(
        parse_error("type Dog {}"),
        ParseError::Grammar("Type declaration must have at least one field")
    );
    assert_eq!(
        parse_error("enum E { A, A }"),
        ParseError::Grammar("Repeated value in enum")
    );
    assert_eq!(
        parse_error("enum E { }"),
        ParseError::Grammar("Enum declaration must have at least one value")
    );
    assert_eq!(
        parse_error("scalar S Complex"),
        ParseError::Grammar("Unknown base type for scalar")
    );
    assert_eq!(
        parse_error("union U = |"),
        ParseError::Grammar("Expected member name in union declaration")
    );
    assert_eq!(
        parse_error("type Dog : { name: String }"),
        ParseError::Grammar("Implements list must have at least one name")
    );
    assert_eq!(
        parse_error("schema { query: Query }"),
        ParseError::Grammar(
            "Beginning of definition not one of type, interface, enum, union or scalar"
        )
    );
}

#[test]
fn parse_display_round_trip() {
    let doc = parse(PET_SCHEMA);
    let rendered = doc.to_string();
    assert_eq!(parse(&rendered), doc, "for {rendered:#?}");
}
