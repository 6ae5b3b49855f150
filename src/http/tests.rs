use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value as Json};
use tower::ServiceExt;

use crate::{http::graphql_router, parser::parse_schema_document, resolver_fn, Schema};

fn test_schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    let doc = parse_schema_document(
        "type Query { id: Int human(id: String!): Human } type Human { name: String }",
    )
    .unwrap();
    schema.add_document(&doc).unwrap();
    schema.set_query_root("Query").unwrap();
    schema
        .register_resolver(
            "Query",
            resolver_fn(|node| {
                node.set("id", 1);
                Ok(())
            }),
        )
        .unwrap();
    schema
        .register_resolver(
            "Human",
            resolver_fn(|node| {
                let name = match node.args().get_str("id") {
                    Some("1000") => "Luke".to_owned(),
                    Some(other) => format!("H{other}"),
                    None => "unknown".to_owned(),
                };
                node.set("name", name);
                Ok(())
            }),
        )
        .unwrap();
    schema.finalize().unwrap();
    Arc::new(schema)
}

async fn body_json(response: axum::response::Response) -> Json {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_without_query_is_bad_request() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .uri("/graphql")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_methods_get_405_with_allow_header() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/graphql")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response
        .headers()
        .get(header::ALLOW)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(allow.contains("GET") && allow.contains("POST"), "Allow: {allow}");
}

#[tokio::test]
async fn get_executes_the_query_parameter() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .uri("/graphql?query=%7Bid%7D")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"data": {"id": 1}}));
}

#[tokio::test]
async fn post_body_is_the_document() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/graphql")
                .body(Body::from(r#"{ human(id: "1000") { name } }"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"data": {"human": {"name": "Luke"}}})
    );
}

#[tokio::test]
async fn variables_are_decoded_from_the_query_string() {
    // query($x: String!) { human(id: $x) { name } } with {"x": "1000"}
    let uri = "/graphql?query=query%28%24x%3AString%21%29%7Bhuman%28id%3A%24x%29%7Bname%7D%7D\
               &variables=%7B%22x%22%3A%221000%22%7D";
    let response = graphql_router(test_schema())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"data": {"human": {"name": "Luke"}}})
    );
}

#[tokio::test]
async fn parse_failures_are_bad_requests_with_an_errors_body() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/graphql")
                .body(Body::from("query {"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body.get("errors").is_some(), "body: {body}");
}

#[tokio::test]
async fn execution_failures_are_internal_errors() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/graphql")
                .body(Body::from("{ nope }"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(
        body["errors"][0]["message"],
        "Type 'Query' has no field named 'nope'"
    );
}

#[tokio::test]
async fn invalid_variables_json_is_a_bad_request() {
    let response = graphql_router(test_schema())
        .oneshot(
            Request::builder()
                .uri("/graphql?query=%7Bid%7D&variables=not-json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
