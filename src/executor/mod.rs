//! Resolve a parsed document to response values.

use std::{
    collections::HashMap,
    fmt,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use fnv::FnvHashMap;
use futures::{future, future::BoxFuture, FutureExt};
use serde::Serialize;

use crate::{
    ast::{
        Definition, Directive, Document, Fragment, InputValue, Operation, OperationType, Selection,
    },
    schema::Schema,
    value::{ResultMap, Value},
    GraphQLError,
};

mod response;


pub use self::response::ResponseNode;

/// The map of variables supplied with a request, substituted during
/// argument computation.
pub type Variables = HashMap<String, InputValue>;

/// Error type for errors that occur during field resolution
///
/// They can be converted to from any type that implements [`fmt::Display`],
/// which makes error chaining with the `?` operator a breeze:
///
/// ```rust
/// # use larch::FieldError;
/// fn get_string(data: Vec<u8>) -> Result<String, FieldError> {
///     let s = String::from_utf8(data)?;
///     Ok(s)
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    message: String,
}

impl<T: fmt::Display> From<T> for FieldError {
    fn from(e: T) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

impl FieldError {
    /// The human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The result of resolving a response node.
pub type FieldResult<T> = Result<T, FieldError>;

/// Error that occurred while executing a request.
///
/// Serialized into the `errors` array of the response body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    /// Creates an error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// User-supplied callback bound to an abstract type.
///
/// A resolver receives the [`ResponseNode`] created for a field whose type
/// it is registered for. It must populate the node's result map with a
/// value for every leaf field that will be requested, fan list-typed nodes
/// out into siblings with [`ResponseNode::push_sibling`], and may mark the
/// node `null` via [`ResponseNode::set_null`]. Completion is signalled by
/// the executor after the resolver returns and the sub-tree settles, never
/// by the resolver itself.
///
/// Any `Fn(&ResponseNode) -> FieldResult<()>` closure is a resolver;
/// implement the trait directly when resolution needs to await I/O.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Populates the given response node.
    async fn resolve(&self, node: &ResponseNode) -> FieldResult<()>;
}

#[async_trait]
impl<F> Resolver for F
where
    F: Fn(&ResponseNode) -> FieldResult<()> + Send + Sync,
{
    async fn resolve(&self, node: &ResponseNode) -> FieldResult<()> {
        self(node)
    }
}

/// Wraps a closure into a shareable [`Resolver`] handle.
pub fn resolver_fn<F>(f: F) -> Arc<dyn Resolver>
where
    F: Fn(&ResponseNode) -> FieldResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Knobs for a single execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecuteOptions {
    /// When `true`, request errors accumulate and execution continues as
    /// far as it can; the partial response is returned alongside the
    /// errors. When `false` (the default) the first error aborts the
    /// request in favour of an error body. Accumulation is meant for
    /// development setups.
    pub lazy_errors: bool,
}

/// Marker for an execution cut short by an error in strict mode. The
/// error itself has already been recorded on the context.
struct Interrupted;

type ExpandResult = Result<(), Interrupted>;

/// Per-request execution state.
struct ExecutionContext<'a> {
    schema: &'a Schema,
    variables: &'a Variables,
    fragments: FnvHashMap<&'a str, &'a Fragment>,
    errors: Mutex<Vec<ExecutionError>>,
    lazy_errors: bool,
    serial: bool,
}

impl ExecutionContext<'_> {
    /// Records a request error. In strict mode the returned marker
    /// short-circuits the caller.
    fn report(&self, message: impl Into<String>) -> ExpandResult {
        self.errors.lock().unwrap().push(ExecutionError::new(message));
        if self.lazy_errors {
            Ok(())
        } else {
            Err(Interrupted)
        }
    }
}

/// Executes the selected operation of a parsed document against a
/// finalized schema.
///
/// Returns the response data together with any request errors collected
/// along the way, or a [`GraphQLError`] when the request failed outright.
/// Panics from resolver code are caught here, at the request boundary, and
/// converted into an error result.
pub async fn execute(
    schema: &Schema,
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    execute_with_options(
        schema,
        document,
        operation_name,
        variables,
        ExecuteOptions::default(),
    )
    .await
}

/// [`execute`] with explicit [`ExecuteOptions`].
pub async fn execute_with_options(
    schema: &Schema,
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
    options: ExecuteOptions,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    if !schema.is_finalized() {
        return Err(GraphQLError::UnfinalizedSchema);
    }

    match AssertUnwindSafe(run(schema, document, operation_name, variables, options))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!(panic = message, "resolver panicked");
            Err(GraphQLError::ResolverPanic(message.into()))
        }
    }
}

/// Blocking wrapper around [`execute`], for callers without a runtime.
/// Resolvers must not depend on a reactor being present.
pub fn execute_sync(
    schema: &Schema,
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    futures::executor::block_on(execute(schema, document, operation_name, variables))
}

async fn run(
    schema: &Schema,
    document: &Document,
    operation_name: Option<&str>,
    variables: &Variables,
    options: ExecuteOptions,
) -> Result<(Value, Vec<ExecutionError>), GraphQLError> {
    let mut errors = Vec::new();

    let Some(setup) = scan_definitions(document, operation_name, &mut errors) else {
        return Err(GraphQLError::Execution(errors));
    };
    if !errors.is_empty() && !options.lazy_errors {
        return Err(GraphQLError::Execution(errors));
    }

    let Some(root_index) = schema.operation_root(setup.operation.operation_type) else {
        errors.push(ExecutionError::new(
            "Schema does not provide a root object for the selected operation",
        ));
        return Err(GraphQLError::Execution(errors));
    };

    let ctx = ExecutionContext {
        schema,
        variables,
        fragments: setup.fragments,
        errors: Mutex::new(errors),
        lazy_errors: options.lazy_errors,
        // Sibling top-level mutation fields must observe serial, in-order
        // execution; queries dispatch concurrently.
        serial: setup.operation.operation_type == OperationType::Mutation,
    };

    let root = ResponseNode::root(root_index);
    let root_def = schema.type_at(root_index);
    tracing::debug!(
        operation = %setup.operation.name,
        root = root_def.name(),
        "executing request"
    );

    let _: ExpandResult = async {
        invoke_resolver(&ctx, &root).await?;

        let mut pending = Vec::new();
        expand_fields(&ctx, &setup.operation.selection_set, &root, &mut pending)?;
        dispatch(ctx.serial, pending).await
    }
    .await;
    root.mark_resolved();

    let mut errors = ctx.errors.into_inner().unwrap();
    if !errors.is_empty() && !options.lazy_errors {
        return Err(GraphQLError::Execution(errors));
    }

    match root.collect(schema) {
        Ok(data) => Ok((data, errors)),
        Err(e) => {
            errors.push(e);
            Err(GraphQLError::Execution(errors))
        }
    }
}

struct RequestSetup<'a> {
    fragments: FnvHashMap<&'a str, &'a Fragment>,
    operation: &'a Operation,
}

/// Collects the document's fragments by name and selects the active
/// operation, checking definition uniqueness along the way.
fn scan_definitions<'a>(
    document: &'a Document,
    operation_name: Option<&str>,
    errors: &mut Vec<ExecutionError>,
) -> Option<RequestSetup<'a>> {
    let mut fragments = FnvHashMap::default();
    let mut operations: Vec<&'a Operation> = Vec::new();

    for def in &document.definitions {
        match def {
            Definition::Operation(op) => {
                if operations.iter().any(|o| o.name == op.name) {
                    errors.push(ExecutionError::new(format!(
                        "Multiple operations named '{}'",
                        op.name
                    )));
                    continue;
                }
                operations.push(op);
            }
            Definition::Fragment(frag) => {
                if fragments.contains_key(frag.name.as_str()) {
                    errors.push(ExecutionError::new(format!(
                        "Multiple fragments named '{}'",
                        frag.name
                    )));
                } else {
                    fragments.insert(frag.name.as_str(), frag);
                }
            }
            Definition::Type(_) => {
                errors.push(ExecutionError::new(
                    "Type system definitions are not executable",
                ));
            }
        }
    }

    if operations.len() > 1 && operations.iter().any(|o| o.name.is_empty()) {
        errors.push(ExecutionError::new(
            "Unnamed operation must be the only one in a document",
        ));
    }

    let operation = match operation_name {
        Some(name) if !name.is_empty() => {
            let found = operations.iter().find(|o| o.name == name).copied();
            if found.is_none() {
                errors.push(ExecutionError::new(format!(
                    "Expecting operation named '{name}', but none found"
                )));
            }
            found
        }
        _ => match operations.as_slice() {
            [single] => Some(*single),
            [] => {
                errors.push(ExecutionError::new("Document contains no operations"));
                None
            }
            _ => {
                errors.push(ExecutionError::new(
                    "An operation name is required to select among multiple operations",
                ));
                None
            }
        },
    };

    operation.map(|operation| RequestSetup {
        fragments,
        operation,
    })
}

/// Expands a selection set onto `parent`: fragments are flattened under
/// the directive gate, field names are registered in lexical order, and a
/// child node with its execution future is created for every included
/// abstract field. Registration is synchronous; the collected futures are
/// driven afterwards by [`dispatch`].
fn expand_fields<'r>(
    ctx: &'r ExecutionContext<'r>,
    selection_set: &'r [Selection],
    parent: &Arc<ResponseNode>,
    pending: &mut Vec<BoxFuture<'r, ExpandResult>>,
) -> ExpandResult {
    let parent_def = ctx.schema.type_at(parent.type_index());

    for selection in selection_set {
        match selection {
            Selection::FragmentSpread(spread) => {
                if !should_include(ctx, &spread.directives)? {
                    continue;
                }
                match ctx.fragments.get(spread.name.as_str()) {
                    Some(fragment) => {
                        expand_fields(ctx, &fragment.selection_set, parent, pending)?;
                    }
                    None => {
                        ctx.report(format!("No fragment named '{}' found", spread.name))?;
                    }
                }
            }

            // The type condition is not filtered on here; resolvers decide
            // which inline selections apply to the concrete value.
            Selection::InlineFragment(fragment) => {
                if !should_include(ctx, &fragment.directives)? {
                    continue;
                }
                expand_fields(ctx, &fragment.selection_set, parent, pending)?;
            }

            Selection::Field(field) => {
                if !should_include(ctx, &field.directives)? {
                    continue;
                }

                let Some(type_field) = parent_def.field(&field.name) else {
                    ctx.report(format!(
                        "Type '{}' has no field named '{}'",
                        parent_def.name(),
                        field.name
                    ))?;
                    continue;
                };

                parent.push_field(field.response_key().to_owned(), field.name.clone());

                let Some(definition_index) = type_field.definition_index() else {
                    ctx.report(format!(
                        "Field '{}' has no resolvable base type",
                        field.name
                    ))?;
                    continue;
                };
                let field_def = ctx.schema.type_at(definition_index);
                let sub_selection = field.selection_set.as_deref().filter(|s| !s.is_empty());

                if !field_def.is_abstract() {
                    if sub_selection.is_some() {
                        ctx.report(format!(
                            "Field '{}' of scalar type cannot have a sub-selection",
                            field.name
                        ))?;
                    }
                    continue;
                }

                let Some(sub_selection) = sub_selection else {
                    ctx.report(format!(
                        "Field '{}' of abstract type must have a sub-selection",
                        field.name
                    ))?;
                    continue;
                };

                let args = compute_arguments(ctx, &field.arguments)?;
                let child = ResponseNode::child(
                    parent,
                    field.response_key().to_owned(),
                    definition_index,
                    type_field.field_type.nullable(),
                    args,
                );
                pending.push(execute_node(ctx, sub_selection, child));
            }
        }
    }

    Ok(())
}

/// Runs one abstract field: invokes the resolver for the node's result
/// type, expands the field's sub-selection, and settles once every
/// descendant has settled.
fn execute_node<'r>(
    ctx: &'r ExecutionContext<'r>,
    selection_set: &'r [Selection],
    node: Arc<ResponseNode>,
) -> BoxFuture<'r, ExpandResult> {
    async move {
        invoke_resolver(ctx, &node).await?;

        let mut pending = Vec::new();
        expand_fields(ctx, selection_set, &node, &mut pending)?;
        dispatch(ctx.serial, pending).await?;

        node.mark_resolved();
        Ok(())
    }
    .boxed()
}

/// Invokes the resolver registered for a node's result type. Every
/// abstract node goes through here, the operation root included: a
/// missing resolver and a failed resolver are request errors either way.
async fn invoke_resolver(ctx: &ExecutionContext<'_>, node: &ResponseNode) -> ExpandResult {
    let def = ctx.schema.type_at(node.type_index());

    match ctx.schema.resolver(def.name()) {
        Some(resolver) => {
            if let Err(e) = resolver.resolve(node).await {
                tracing::warn!(
                    type_name = def.name(),
                    error = e.message(),
                    "resolver failed"
                );
                ctx.report(format!(
                    "Resolver for type '{}' failed: {}",
                    def.name(),
                    e.message()
                ))?;
            }
        }
        None => {
            ctx.report(format!("No resolver registered for type '{}'", def.name()))?;
        }
    }

    Ok(())
}

/// Drives the futures collected for one node's children: concurrently for
/// queries, one at a time in query order for mutations. A parent settles
/// only after all of these settle, which is the tree's completion
/// synchronization.
async fn dispatch(serial: bool, pending: Vec<BoxFuture<'_, ExpandResult>>) -> ExpandResult {
    if serial {
        for fut in pending {
            fut.await?;
        }
    } else {
        for result in future::join_all(pending).await {
            result?;
        }
    }
    Ok(())
}

/// Evaluates the `@skip`/`@include` gate on a selection. `@skip` with a
/// true argument excludes unconditionally and outranks `@include`; any
/// other directive is ignored.
fn should_include(ctx: &ExecutionContext<'_>, directives: &[Directive]) -> Result<bool, Interrupted> {
    let mut include = true;

    for directive in directives {
        if directive.name != "skip" && directive.name != "include" {
            continue;
        }
        let Some(arg) = directive.argument("if") else {
            continue;
        };
        let Some(value) = resolve_value(ctx, arg)? else {
            continue;
        };
        let Some(flag) = value.as_bool() else {
            ctx.report("Value given to @skip or @include must be Boolean")?;
            continue;
        };

        if directive.name == "skip" && flag {
            return Ok(false);
        }
        if directive.name == "include" && !flag {
            include = false;
        }
    }

    Ok(include)
}

/// Computes the argument table for a field: variable references are
/// resolved against the request variables, literals pass through as their
/// underlying values.
fn compute_arguments(
    ctx: &ExecutionContext<'_>,
    arguments: &[(String, InputValue)],
) -> Result<ResultMap, Interrupted> {
    let mut map = ResultMap::new();
    for (key, value) in arguments {
        if let Some(value) = resolve_value(ctx, value)? {
            map.insert(key.clone(), value);
        }
    }
    Ok(map)
}

/// Resolves an input value to its underlying [`Value`], substituting
/// variable references. An undefined variable is a request error; in lazy
/// mode the value is simply dropped.
fn resolve_value(ctx: &ExecutionContext<'_>, value: &InputValue) -> Result<Option<Value>, Interrupted> {
    match value {
        InputValue::Variable(name) => match ctx.variables.get(name) {
            Some(value) => resolve_value(ctx, value),
            None => {
                ctx.report(format!("Undefined variable '${name}'"))?;
                Ok(None)
            }
        },
        InputValue::Int(v) => Ok(Some(Value::Int(*v))),
        InputValue::Float(v) => Ok(Some(Value::Float(*v))),
        InputValue::Boolean(v) => Ok(Some(Value::Boolean(*v))),
        InputValue::String(v) => Ok(Some(Value::String(v.clone()))),
        InputValue::Enum(v) => Ok(Some(Value::String(v.clone()))),
        InputValue::List(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                if let Some(value) = resolve_value(ctx, item)? {
                    list.push(value);
                }
            }
            Ok(Some(Value::List(list)))
        }
        InputValue::Object(fields) => {
            let mut map = ResultMap::new();
            for (key, value) in fields {
                if let Some(value) = resolve_value(ctx, value)? {
                    map.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(map)))
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "resolver panicked"
    }
}
