use anyhow::Context as _;
use async_graphql::{Request, ServerError, Variables};
use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::models::{ErrorLocation, ExecutionResult, GraphQLError, Principal},
    services::schema::ExecutableSchema,
};

/// Everything the engine needs besides the schema. The root value is always null.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    pub query: String,
    pub variables: Option<Value>,
    pub operation_name: Option<String>,
    /// Made available to resolvers as `ctx.data_opt::<Principal>()`.
    pub context: Option<Principal>,
}

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Runs one request. GraphQL errors belong in the returned result; `Err` is
    /// reserved for failures of the engine itself.
    async fn execute(
        &self,
        schema: &ExecutableSchema,
        request: ExecutionRequest,
    ) -> anyhow::Result<ExecutionResult>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncGraphqlEngine;

#[async_trait]
impl ExecutionEngine for AsyncGraphqlEngine {
    async fn execute(
        &self,
        schema: &ExecutableSchema,
        request: ExecutionRequest,
    ) -> anyhow::Result<ExecutionResult> {
        let mut graphql_request = Request::new(request.query);
        if let Some(variables) = request.variables {
            graphql_request = graphql_request.variables(Variables::from_json(variables));
        }
        if let Some(operation_name) = request.operation_name {
            graphql_request = graphql_request.operation_name(operation_name);
        }
        if let Some(principal) = request.context {
            graphql_request = graphql_request.data(principal);
        }

        let response = schema.execute(graphql_request).await;
        let data = response
            .data
            .into_json()
            .context("execution produced data that cannot be represented as JSON")?;

        Ok(ExecutionResult {
            data,
            errors: response.errors.into_iter().map(GraphQLError::from).collect(),
        })
    }
}

impl From<ServerError> for GraphQLError {
    fn from(error: ServerError) -> Self {
        let locations = error
            .locations
            .iter()
            .map(|pos| ErrorLocation {
                line: pos.line,
                column: pos.column,
            })
            .collect();
        let path = error
            .path
            .iter()
            .filter_map(|segment| serde_json::to_value(segment).ok())
            .collect();
        let extensions = error
            .extensions
            .as_ref()
            .and_then(|extensions| serde_json::to_value(extensions).ok())
            .and_then(|value| match value {
                Value::Object(map) if !map.is_empty() => Some(map),
                _ => None,
            });

        Self {
            message: error.message,
            locations,
            path,
            extensions,
        }
    }
}
