//! The GraphQL query dispatcher.
//!
//! A request body is either a single query input (it has a top-level `query`
//! member) or a batch of them. Every input is executed on its own: its
//! variables are decoded, a context is built from the caller's credentials,
//! the schema named by the route is resolved and the engine runs the query.
//! A failing input is replaced by an error document and never affects the
//! other inputs of a batch.
//!
//! Only single requests are classified for authorization. When their errors
//! satisfy the configured [`UnauthorizedRule`] the response status becomes 403;
//! batches are always answered with 200.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    domain::models::{DispatchResponse, Operation, Principal, QueryInput, QueryPayload},
    infrastructure::{
        auth::AuthProvider,
        config::{GraphQLConfig, UnauthorizedRule},
    },
    services::{
        engine::{ExecutionEngine, ExecutionRequest},
        errors::DispatchError,
        formatter::{formatter_for, ErrorFormatter},
        schema::SchemaResolver,
    },
};

pub struct Dispatcher {
    resolver: Arc<dyn SchemaResolver>,
    engine: Arc<dyn ExecutionEngine>,
    auth: Arc<dyn AuthProvider>,
    error_formatter: ErrorFormatter,
    variables_input_name: String,
    unauthorized_rule: UnauthorizedRule,
}

impl Dispatcher {
    pub fn new(
        config: &GraphQLConfig,
        resolver: Arc<dyn SchemaResolver>,
        engine: Arc<dyn ExecutionEngine>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            resolver,
            engine,
            auth,
            error_formatter: formatter_for(config.error_formatter),
            variables_input_name: config.variables_input_name.clone(),
            unauthorized_rule: config.unauthorized_rule,
        }
    }

    /// Replaces the formatter selected by `graphql.error_formatter`.
    pub fn with_error_formatter(mut self, formatter: ErrorFormatter) -> Self {
        self.error_formatter = formatter;
        self
    }

    /// Executes the query or batch in `body` against the schema named `schema`.
    pub async fn query(
        &self,
        headers: &HeaderMap,
        schema: Option<&str>,
        body: Value,
    ) -> DispatchResponse {
        match Operation::from(body) {
            Operation::Single(input) => {
                debug!(schema, "dispatching graphql query");
                let outcome = self.execute_query(headers, schema, &input).await;
                let authorized = match &outcome {
                    Ok(payload) => self.unauthorized_rule.is_authorized(payload.errors()),
                    Err(_) => true,
                };
                let status = if authorized {
                    StatusCode::OK
                } else {
                    StatusCode::FORBIDDEN
                };

                DispatchResponse {
                    status,
                    body: into_body(schema, outcome),
                }
            }
            Operation::Batch(inputs) => {
                debug!(schema, size = inputs.len(), "dispatching graphql batch");
                let mut results = Vec::with_capacity(inputs.len());
                for input in &inputs {
                    let outcome = self.execute_query(headers, schema, input).await;
                    results.push(into_body(schema, outcome));
                }

                DispatchResponse {
                    status: StatusCode::OK,
                    body: Value::Array(results),
                }
            }
        }
    }

    /// Executes one query input. `schema` of `None` (or empty) selects the
    /// default schema.
    pub async fn execute_query(
        &self,
        headers: &HeaderMap,
        schema: Option<&str>,
        input: &Value,
    ) -> Result<QueryPayload, DispatchError> {
        let input = QueryInput::from_value(input, &self.variables_input_name)
            .map_err(DispatchError::InvalidVariables)?;
        let context = self.query_context(headers).await;
        let executable = self.resolver.resolve(schema)?;

        let result = self
            .engine
            .execute(
                &executable,
                ExecutionRequest {
                    query: input.query.unwrap_or_default(),
                    variables: input.variables,
                    operation_name: input.operation_name,
                    context,
                },
            )
            .await
            .map_err(DispatchError::Execution)?;

        if result.errors.is_empty() {
            return Ok(QueryPayload {
                data: result.data,
                errors: None,
            });
        }

        let errors = result
            .errors
            .iter()
            .map(|error| (self.error_formatter)(error))
            .collect();
        Ok(QueryPayload {
            data: result.data,
            errors: Some(errors),
        })
    }

    /// The caller's principal, or `None` when the lookup fails.
    async fn query_context(&self, headers: &HeaderMap) -> Option<Principal> {
        match self.auth.user(headers).await {
            Ok(principal) => principal,
            Err(err) => {
                warn!(error = %err, "failed to resolve graphql context user");
                None
            }
        }
    }
}

fn into_body(schema: Option<&str>, outcome: Result<QueryPayload, DispatchError>) -> Value {
    match outcome {
        Ok(payload) => payload.into_value(),
        Err(err) => {
            warn!(schema, error = %err, "graphql query failed");
            err.to_response_body()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::models::{ExecutionResult, GraphQLError, UNAUTHORIZED},
        infrastructure::{auth::AuthError, registry::InMemoryServiceRegistry},
        services::schema::{ExecutableSchema, ServiceSchemaResolver},
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Answers by query text and records every request it sees.
    #[derive(Default)]
    struct ScriptedEngine {
        seen: Mutex<Vec<ExecutionRequest>>,
    }

    #[async_trait]
    impl ExecutionEngine for ScriptedEngine {
        async fn execute(
            &self,
            _schema: &ExecutableSchema,
            request: ExecutionRequest,
        ) -> anyhow::Result<ExecutionResult> {
            self.seen.lock().push(request.clone());
            match request.query.as_str() {
                "{ hello }" => Ok(ExecutionResult::data(json!({ "hello": "world" }))),
                "{ secret }" => Ok(ExecutionResult {
                    data: Value::Null,
                    errors: vec![GraphQLError::new(UNAUTHORIZED)],
                }),
                "{ secrets }" => Ok(ExecutionResult {
                    data: Value::Null,
                    errors: vec![GraphQLError::new(UNAUTHORIZED), GraphQLError::new(UNAUTHORIZED)],
                }),
                "{ mixed }" => Ok(ExecutionResult {
                    data: Value::Null,
                    errors: vec![
                        GraphQLError::new(UNAUTHORIZED),
                        GraphQLError::new("Cannot query field \"mixed\""),
                    ],
                }),
                "{ boom }" => anyhow::bail!("resolver panicked"),
                other => Ok(ExecutionResult::data(json!({ "query": other }))),
            }
        }
    }

    struct FixedAuth(Result<Option<Principal>, ()>);

    #[async_trait]
    impl AuthProvider for FixedAuth {
        async fn user(&self, _headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
            self.0.clone().map_err(|_| AuthError::Invalid)
        }
    }

    fn admin() -> Principal {
        Principal {
            user_id: uuid::Uuid::nil(),
            role: "admin".to_string(),
        }
    }

    fn dispatcher_with(
        config: &GraphQLConfig,
        auth: FixedAuth,
    ) -> (Dispatcher, Arc<ScriptedEngine>) {
        let engine = Arc::new(ScriptedEngine::default());
        let resolver = Arc::new(ServiceSchemaResolver::new(Arc::new(
            InMemoryServiceRegistry::new(),
        )));
        let dispatcher = Dispatcher::new(config, resolver, engine.clone(), Arc::new(auth));
        (dispatcher, engine)
    }

    fn dispatcher() -> (Dispatcher, Arc<ScriptedEngine>) {
        dispatcher_with(&GraphQLConfig::default(), FixedAuth(Ok(None)))
    }

    #[tokio::test]
    async fn single_query_returns_data_only() {
        let (dispatcher, _) = dispatcher();

        let response = dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ hello }" }))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!({ "data": { "hello": "world" } }));
    }

    #[tokio::test]
    async fn unauthorized_only_errors_are_forbidden() {
        let (dispatcher, _) = dispatcher();

        for query in ["{ secret }", "{ secrets }"] {
            let response = dispatcher
                .query(&HeaderMap::new(), None, json!({ "query": query }))
                .await;

            assert_eq!(response.status, StatusCode::FORBIDDEN);
            assert_eq!(response.body["data"], Value::Null);
            assert!(response.body["errors"]
                .as_array()
                .unwrap()
                .iter()
                .all(|error| error == &json!({ "message": "Unauthorized" })));
        }
    }

    #[tokio::test]
    async fn mixed_errors_stay_ok_by_default() {
        let (dispatcher, _) = dispatcher();

        let response = dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ mixed }" }))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn any_unauthorized_rule_forbids_mixed_errors() {
        let config = GraphQLConfig {
            unauthorized_rule: UnauthorizedRule::AnyUnauthorized,
            ..GraphQLConfig::default()
        };
        let (dispatcher, _) = dispatcher_with(&config, FixedAuth(Ok(None)));

        let response = dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ mixed }" }))
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn batches_keep_order_and_skip_authorization() {
        let (dispatcher, engine) = dispatcher();

        let response = dispatcher
            .query(
                &HeaderMap::new(),
                None,
                json!([{ "query": "{a}" }, { "query": "{ secret }" }, { "query": "{b}" }]),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.body,
            json!([
                { "data": { "query": "{a}" } },
                { "data": null, "errors": [{ "message": "Unauthorized" }] },
                { "data": { "query": "{b}" } },
            ])
        );
        let order: Vec<_> = engine.seen.lock().iter().map(|r| r.query.clone()).collect();
        assert_eq!(order, vec!["{a}", "{ secret }", "{b}"]);
    }

    #[tokio::test]
    async fn failing_batch_item_does_not_affect_siblings() {
        let (dispatcher, _) = dispatcher();

        let response = dispatcher
            .query(
                &HeaderMap::new(),
                None,
                json!([{ "query": "{ hello }" }, { "query": "{ boom }" }, { "query": "{ hello }" }]),
            )
            .await;

        let items = response.body.as_array().unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(items[0], json!({ "data": { "hello": "world" } }));
        assert_eq!(items[1]["error"]["code"], json!(500));
        assert_eq!(
            items[1]["error"]["message"],
            json!("Query execution failed: resolver panicked")
        );
        assert_eq!(items[2], json!({ "data": { "hello": "world" } }));
    }

    #[tokio::test]
    async fn failed_single_query_is_not_forbidden() {
        let (dispatcher, _) = dispatcher();

        let response = dispatcher
            .query(&HeaderMap::new(), Some("Nowhere"), json!({ "query": "{ hello }" }))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["error"]["code"], json!(404));
        assert_eq!(
            response.body["error"]["message"],
            json!("Service 'nowhere' not found.")
        );
    }

    #[tokio::test]
    async fn encoded_variables_reach_engine_decoded() {
        let (dispatcher, engine) = dispatcher();

        dispatcher
            .query(
                &HeaderMap::new(),
                None,
                json!([
                    { "query": "{ a }", "variables": { "id": 1, "tags": ["x"] } },
                    { "query": "{ a }", "variables": "{\"id\": 1, \"tags\": [\"x\"]}" },
                ]),
            )
            .await;

        let seen = engine.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].variables, Some(json!({ "id": 1, "tags": ["x"] })));
        assert_eq!(seen[0].variables, seen[1].variables);
    }

    #[tokio::test]
    async fn malformed_variables_fail_only_that_input() {
        let (dispatcher, engine) = dispatcher();

        let response = dispatcher
            .query(
                &HeaderMap::new(),
                None,
                json!({ "query": "{ hello }", "variables": "{broken" }),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["error"]["code"], json!(400));
        assert!(engine.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn context_carries_principal() {
        let (dispatcher, engine) =
            dispatcher_with(&GraphQLConfig::default(), FixedAuth(Ok(Some(admin()))));

        dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ hello }" }))
            .await;

        assert_eq!(engine.seen.lock()[0].context, Some(admin()));
    }

    #[tokio::test]
    async fn auth_failure_yields_empty_context() {
        let (dispatcher, engine) =
            dispatcher_with(&GraphQLConfig::default(), FixedAuth(Err(())));

        let response = dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ hello }" }))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(engine.seen.lock()[0].context, None);
    }

    #[tokio::test]
    async fn operation_name_and_custom_variables_field_are_forwarded() {
        let config = GraphQLConfig {
            variables_input_name: "params".to_string(),
            ..GraphQLConfig::default()
        };
        let (dispatcher, engine) = dispatcher_with(&config, FixedAuth(Ok(None)));

        dispatcher
            .query(
                &HeaderMap::new(),
                None,
                json!({ "query": "{ hello }", "params": "{\"x\": 1}", "operationName": "Hello" }),
            )
            .await;

        let seen = engine.seen.lock();
        assert_eq!(seen[0].variables, Some(json!({ "x": 1 })));
        assert_eq!(seen[0].operation_name.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn custom_error_formatter_is_used() {
        let (dispatcher, _) = dispatcher();
        let dispatcher = dispatcher.with_error_formatter(Arc::new(|error: &GraphQLError| {
            json!({ "message": error.message, "custom": true })
        }));

        let response = dispatcher
            .query(&HeaderMap::new(), None, json!({ "query": "{ secret }" }))
            .await;

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            response.body["errors"],
            json!([{ "message": "Unauthorized", "custom": true }])
        );
    }

    #[tokio::test]
    async fn empty_body_is_an_empty_batch() {
        let (dispatcher, engine) = dispatcher();

        let response = dispatcher.query(&HeaderMap::new(), None, json!({})).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!([]));
        assert!(engine.seen.lock().is_empty());
    }
}
