/*!

# larch

`larch` is a dynamic GraphQL execution engine. It accepts GraphQL
documents over HTTP, validates them against a registered type system, and
executes the selected operation by dispatching resolver callbacks over a
tree of response nodes, producing a JSON response.

Unlike code-first GraphQL libraries, the type system here is data: a
schema is parsed from a small type-system DSL (or registered
programmatically), resolvers are attached per abstract type name at
runtime, and requests execute against the frozen registry.

```rust
use std::collections::HashMap;

use larch::{execute_sync, parse_document, parse_schema_document, resolver_fn, Schema};

let mut schema = Schema::new();
let types = parse_schema_document("type Query { id: Int name: String }").unwrap();
schema.add_document(&types).unwrap();
schema.set_query_root("Query").unwrap();
schema
    .register_resolver(
        "Query",
        resolver_fn(|node| {
            node.set("id", 1);
            node.set("name", "a");
            Ok(())
        }),
    )
    .unwrap();
schema.finalize().unwrap();

let document = parse_document("{ id, name }").unwrap();
let (data, errors) = execute_sync(&schema, &document, None, &HashMap::new()).unwrap();

assert!(errors.is_empty());
assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"id":1,"name":"a"}"#);
```

The pieces:

- [`parser`]: lexer and parser for executable and type-system documents.
- [`Schema`]: the registry holding types, resolvers and operation roots,
  frozen by [`Schema::finalize`] before any request is served.
- [`execute`]: selection expansion under `@skip`/`@include`, concurrent
  resolver dispatch with per-node completion, deterministic JSON output.
- [`http`]: an `axum` router exposing the engine over `GET`/`POST`.

Schema introspection and subscriptions are not implemented.

*/
#![warn(missing_docs)]

use std::fmt;

mod ast;
mod executor;
pub mod http;
pub mod parser;
mod schema;
mod value;

pub use crate::{
    ast::{
        ArgumentDeclaration, Definition, Directive, Document, EnumDefinition, Field, Fragment,
        FragmentSpread, InputValue, InterfaceDefinition, ObjectDefinition, Operation,
        OperationType, ScalarDefinition, ScalarKind, Selection, TypeDefinition, TypeDescriptor,
        TypeField, UnionDefinition, VariableDefinition,
    },
    executor::{
        execute, execute_sync, execute_with_options, resolver_fn, ExecuteOptions, ExecutionError,
        FieldError, FieldResult, Resolver, ResponseNode, Variables,
    },
    parser::{parse_document, parse_schema_document, ParseError, Spanning},
    schema::{default_schema, install_default, Schema, SchemaError},
    value::{ResultMap, Value},
};

/// An error that prevented request execution
#[derive(Debug, PartialEq)]
#[allow(missing_docs)]
pub enum GraphQLError {
    Parse(Spanning<ParseError>),
    InvalidVariables(String),
    UnfinalizedSchema,
    Execution(Vec<ExecutionError>),
    ResolverPanic(String),
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GraphQLError::Parse(error) => write!(f, "{error}"),
            GraphQLError::InvalidVariables(message) => write!(f, "{message}"),
            GraphQLError::UnfinalizedSchema => {
                write!(f, "Schema must be finalized before executing requests")
            }
            GraphQLError::Execution(errors) => {
                for error in errors {
                    writeln!(f, "{error}")?;
                }
                Ok(())
            }
            GraphQLError::ResolverPanic(message) => write!(f, "Resolver panicked: {message}"),
        }
    }
}

impl std::error::Error for GraphQLError {}

impl From<Spanning<ParseError>> for GraphQLError {
    fn from(e: Spanning<ParseError>) -> GraphQLError {
        GraphQLError::Parse(e)
    }
}
