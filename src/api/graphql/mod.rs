//! GraphQL endpoints: query execution (single or batched) and the GraphiQL explorer.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    middleware::from_fn,
    response::Html,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::infrastructure::state::AppState;

use self::{middleware::apply_schema_guards, response::JsonResponse};

pub mod json;
pub mod middleware;
pub mod response;

/// Route parameter naming the schema a request targets.
pub const SCHEMA_PARAM: &str = "graphql_schema";

pub fn router() -> Router {
    Router::new()
        .route("/", get(query).post(query))
        .route("/graphiql", get(graphiql))
        .route("/:graphql_schema", get(query).post(query))
        .route("/:graphql_schema/graphiql", get(graphiql))
        .route_layer(from_fn(apply_schema_guards))
}

async fn query(
    Extension(state): Extension<Arc<AppState>>,
    schema: Option<Path<String>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> JsonResponse {
    let schema = schema.map(|Path(schema)| schema);
    let input = request_input(params, &body);
    let response = state.dispatcher.query(&headers, schema.as_deref(), input).await;

    JsonResponse::new(
        response,
        state.response_headers.clone(),
        state.config.graphql.json_encoding_options,
    )
}

async fn graphiql(
    Extension(state): Extension<Arc<AppState>>,
    schema: Option<Path<String>>,
) -> Result<Html<String>, (StatusCode, Json<Value>)> {
    if !state.config.graphql.graphiql.enabled {
        return Err(crate::api::not_found().await);
    }

    let schema = schema.map(|Path(schema)| schema);
    let endpoint = endpoint(&state.config.graphql.prefix, schema.as_deref());
    state
        .views
        .render_graphiql(schema.as_deref(), &endpoint)
        .map(Html)
        .map_err(|err| {
            error!(error = ?err, "failed to render graphiql view");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "failed to render view" })),
            )
        })
}

/// Merges query-string parameters beneath the members of a JSON object body.
/// Bodies that are empty or not JSON contribute nothing.
fn request_input(params: HashMap<String, String>, body: &[u8]) -> Value {
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "ignoring request body that is not json");
                None
            }
        }
    };

    let mut input: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    match parsed {
        Some(Value::Object(members)) => {
            input.extend(members);
            Value::Object(input)
        }
        Some(Value::Array(items)) => Value::Array(items),
        _ => Value::Object(input),
    }
}

fn endpoint(prefix: &str, schema: Option<&str>) -> String {
    let prefix = prefix.trim_matches('/');
    match schema {
        Some(schema) => format!("/{prefix}/{schema}"),
        None => format!("/{prefix}"),
    }
}
