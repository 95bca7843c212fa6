use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Message an execution error carries when a resolver rejected the caller.
pub const UNAUTHORIZED: &str = "Unauthorized";

/// Member that marks a request body as a single query rather than a batch.
pub const QUERY_FIELD: &str = "query";

pub const OPERATION_NAME_FIELD: &str = "operationName";

/// The authenticated caller, handed to resolvers as the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: String,
}

/// One GraphQL request extracted from a request body or batch item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInput {
    pub query: Option<String>,
    pub variables: Option<Value>,
    pub operation_name: Option<String>,
}

impl QueryInput {
    /// Reads an input object. Variables found under `variables_field` may be
    /// given as a JSON document in a string, which is decoded here.
    pub fn from_value(input: &Value, variables_field: &str) -> Result<Self, serde_json::Error> {
        let text = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_owned);
        let variables = match input.get(variables_field) {
            None | Some(Value::Null) => None,
            Some(Value::String(encoded)) if encoded.trim().is_empty() => None,
            Some(Value::String(encoded)) => {
                Some(serde_json::from_str::<Value>(encoded)?).filter(|value| !value.is_null())
            }
            Some(value) => Some(value.clone()),
        };

        Ok(Self {
            query: text(QUERY_FIELD),
            variables,
            operation_name: text(OPERATION_NAME_FIELD),
        })
    }
}

/// A request body split into the inputs that have to be executed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Single(Value),
    Batch(Vec<Value>),
}

impl From<Value> for Operation {
    fn from(body: Value) -> Self {
        match body {
            Value::Object(map) if map.contains_key(QUERY_FIELD) => {
                Operation::Single(Value::Object(map))
            }
            Value::Object(map) => Operation::Batch(map.into_iter().map(|(_, v)| v).collect()),
            Value::Array(items) => Operation::Batch(items),
            _ => Operation::Batch(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

/// An error reported by the execution engine alongside (possibly partial) data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }
}

/// Outcome of a completed execution as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub data: Value,
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResult {
    pub fn data(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }
}

/// What a single query input contributes to the response body.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPayload {
    pub data: Value,
    pub errors: Option<Vec<Value>>,
}

impl QueryPayload {
    pub fn errors(&self) -> &[Value] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// `{ data }`, or `{ data, errors }` when errors were reported.
    pub fn into_value(self) -> Value {
        let mut body = Map::with_capacity(2);
        body.insert("data".to_string(), self.data);
        if let Some(errors) = self.errors {
            body.insert("errors".to_string(), Value::Array(errors));
        }
        Value::Object(body)
    }
}

/// Status and body produced by the dispatcher. Headers and encoding are applied
/// when the response is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Metadata describing a registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub service_type: String,
}

/// Metadata describing a kind of service the registry can host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTypeInfo {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub group: Option<String>,
}
