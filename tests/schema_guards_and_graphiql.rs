use axum::{body::Body, http::Request, http::StatusCode};
use graphql_gateway::infrastructure::config::Config;
use serde_json::json;


use test_harness::{build_app, post_json, send, send_json, test_config, token_for};

fn guarded(chain: &[&str]) -> Config {
    let mut config = test_config();
    config.graphql.middleware_schema.insert(
        "myservice".to_string(),
        chain.iter().map(|name| name.to_string()).collect(),
    );
    config
}

fn authorized_post(uri: &str, role: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token_for(role)))
        .body(Body::from(json!({ "query": "{ hello }" }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn auth_guard_rejects_anonymous_requests() {
    let app = build_app(guarded(&["auth"]));

    let (status, body) =
        send_json(&app, post_json("/graphql/MyService", json!({ "query": "{ hello }" }))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "authentication required" }));

    let (status, _) = send_json(&app, authorized_post("/graphql/MyService", "viewer")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn role_guard_requires_matching_role() {
    let app = build_app(guarded(&["auth", "role:admin"]));

    let (status, _) = send_json(&app, authorized_post("/graphql/MyService", "viewer")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send_json(&app, authorized_post("/graphql/MyService", "admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "hello": "world" } }));
}

#[tokio::test]
async fn guards_only_apply_to_their_schema() {
    let app = build_app(guarded(&["auth"]));

    let (status, _) = send_json(
        &app,
        post_json("/graphql", json!({ "query": "{ services { name } }" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn default_schema_selects_guards_when_route_names_none() {
    let mut config = guarded(&["auth"]);
    config.graphql.schema = Some("MyService".to_string());
    let app = build_app(config);

    let (status, _) = send_json(
        &app,
        post_json("/graphql", json!({ "query": "{ services { name } }" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn graphiql_renders_for_schema() {
    let app = build_app(test_config());
    let request = Request::builder()
        .uri("/graphql/MyService/graphiql")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(&app, request).await;
    let html = String::from_utf8(body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/html"));
    assert!(html.contains("url: \"/graphql/MyService\""));
}

#[tokio::test]
async fn graphiql_without_schema_targets_default_endpoint() {
    let app = build_app(test_config());
    let request = Request::builder()
        .uri("/graphql/graphiql")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("url: \"/graphql\""));
}

#[tokio::test]
async fn graphiql_can_be_disabled() {
    let mut config = test_config();
    config.graphql.graphiql.enabled = false;
    let app = build_app(config);
    let request = Request::builder()
        .uri("/graphql/graphiql")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not_found" }));
}
