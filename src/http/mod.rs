//! HTTP endpoint for serving GraphQL requests.
//!
//! One route handles the whole engine: `GET` carries the document in the
//! `query` parameter, `POST` carries it as the request body; `variables`
//! (a JSON object) and `operationName` come from the query string in both
//! cases. Everything else the engine needs lives behind [`crate::Schema`].

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, Serializer},
    Deserialize, Serialize,
};

use crate::{
    ast::InputValue,
    executor::{execute, ExecutionError, Variables},
    parser::parse_document,
    schema::Schema,
    value::Value,
    GraphQLError,
};

#[cfg(test)]
mod tests;

/// A single GraphQL request, assembled from the HTTP surface.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphQLRequest {
    /// GraphQL document to execute.
    pub query: String,

    /// Name of the operation to execute, when the document contains
    /// several.
    pub operation_name: Option<String>,

    /// Variables as undecoded JSON object text.
    pub variables: Option<String>,
}

impl GraphQLRequest {
    /// Parses and executes this request against the given schema.
    pub async fn execute(&self, schema: &Schema) -> GraphQLResponse {
        let variables = match self.variables.as_deref() {
            Some(json) if !json.is_empty() => match decode_variables(json) {
                Ok(vars) => vars,
                Err(message) => {
                    return GraphQLResponse(Err(GraphQLError::InvalidVariables(message)));
                }
            },
            _ => Variables::new(),
        };

        let document = match parse_document(&self.query) {
            Ok(doc) => doc,
            Err(e) => return GraphQLResponse(Err(GraphQLError::Parse(e))),
        };

        GraphQLResponse(
            execute(
                schema,
                &document,
                self.operation_name.as_deref(),
                &variables,
            )
            .await,
        )
    }
}

/// Simple wrapper around the result of executing a GraphQL request.
///
/// Serializes into the response envelope (`data` plus an `errors` array
/// when errors occurred) and implements [`IntoResponse`] with the status
/// mapping of the engine: client-side parse failures are 400, internal
/// failures are 500.
#[derive(Debug)]
pub struct GraphQLResponse(Result<(Value, Vec<ExecutionError>), GraphQLError>);

impl GraphQLResponse {
    /// Wraps an execution result.
    #[must_use]
    pub fn from_result(result: Result<(Value, Vec<ExecutionError>), GraphQLError>) -> Self {
        Self(result)
    }

    /// Whether the request produced data.
    ///
    /// There may still be errors in the response even when it is
    /// considered OK; that is by design in GraphQL.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }
}

impl Serialize for GraphQLResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Message<'a> {
            message: &'a str,
        }

        match &self.0 {
            Ok((data, errors)) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_key("data")?;
                map.serialize_value(data)?;
                if !errors.is_empty() {
                    map.serialize_key("errors")?;
                    map.serialize_value(errors)?;
                }
                map.end()
            }
            Err(GraphQLError::Execution(errors)) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_key("errors")?;
                map.serialize_value(errors)?;
                map.end()
            }
            Err(e) => {
                let message = e.to_string();
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_key("errors")?;
                map.serialize_value(&[Message { message: &message }])?;
                map.end()
            }
        }
    }
}

impl IntoResponse for GraphQLResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Ok(_) => StatusCode::OK,
            Err(GraphQLError::Parse(_) | GraphQLError::InvalidVariables(_)) => {
                StatusCode::BAD_REQUEST
            }
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParams {
    query: Option<String>,
    operation_name: Option<String>,
    variables: Option<String>,
}

/// Builds the router serving the GraphQL endpoint at `/graphql`.
///
/// Methods other than `GET` and `POST` are answered with 405 and an
/// `Allow` header.
pub fn graphql_router(schema: Arc<Schema>) -> Router {
    Router::new()
        .route("/graphql", get(handle_get).post(handle_post))
        .with_state(schema)
}

/// Binds `addr` and serves the GraphQL endpoint until the task is
/// cancelled.
pub async fn serve(schema: Arc<Schema>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::debug!(%addr, "listening");
    axum::serve(listener, graphql_router(schema)).await
}

async fn handle_get(
    State(schema): State<Arc<Schema>>,
    Query(params): Query<RequestParams>,
) -> Response {
    let Some(query) = params.query else {
        return (StatusCode::BAD_REQUEST, "No GraphQL query present").into_response();
    };

    GraphQLRequest {
        query,
        operation_name: params.operation_name,
        variables: params.variables,
    }
    .execute(&schema)
    .await
    .into_response()
}

async fn handle_post(
    State(schema): State<Arc<Schema>>,
    Query(params): Query<RequestParams>,
    body: String,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "No GraphQL query present").into_response();
    }

    GraphQLRequest {
        query: body,
        operation_name: params.operation_name,
        variables: params.variables,
    }
    .execute(&schema)
    .await
    .into_response()
}

/// Decodes the `variables` request parameter: a JSON object mapping
/// variable names to values.
fn decode_variables(json: &str) -> Result<Variables, String> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| format!("Invalid variables JSON: {e}"))?;

    object
        .into_iter()
        .map(|(name, value)| {
            json_to_input(value)
                .map(|v| (name.clone(), v))
                .map_err(|e| format!("Invalid value for variable '${name}': {e}"))
        })
        .collect()
}

fn json_to_input(value: serde_json::Value) -> Result<InputValue, String> {
    match value {
        serde_json::Value::Null => Err("null is not a valid variable value".into()),
        serde_json::Value::Bool(b) => Ok(InputValue::Boolean(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(InputValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(InputValue::Float(f))
            } else {
                Err(format!("number {n} is out of range"))
            }
        }
        serde_json::Value::String(s) => Ok(InputValue::String(s)),
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(json_to_input)
            .collect::<Result<_, _>>()
            .map(InputValue::List),
        serde_json::Value::Object(fields) => fields
            .into_iter()
            .map(|(k, v)| json_to_input(v).map(|v| (k, v)))
            .collect::<Result<IndexMap<_, _>, _>>()
            .map(InputValue::Object),
    }
}

