use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a single query input. Converted into an error document that takes
/// the input's place in the response; it never fails the whole request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Service '{0}' not found.")]
    ServiceNotFound(String),
    #[error("Invalid variables: {0}")]
    InvalidVariables(#[source] serde_json::Error),
    #[error("Service '{service}' did not provide a GraphQL schema: {reason:#}")]
    ServiceSchema {
        service: String,
        reason: anyhow::Error,
    },
    #[error("Invalid GraphQL schema: {0}")]
    Schema(String),
    #[error("Query execution failed: {0:#}")]
    Execution(anyhow::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::InvalidVariables(_) => StatusCode::BAD_REQUEST,
            DispatchError::ServiceSchema { .. }
            | DispatchError::Schema(_)
            | DispatchError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error document shared with the rest of the platform's REST responses.
    pub fn to_response_body(&self) -> Value {
        let status = self.status_code().as_u16();
        let context = match self {
            DispatchError::InvalidVariables(err) => {
                json!({ "line": err.line(), "column": err.column() })
            }
            DispatchError::ServiceNotFound(service) | DispatchError::ServiceSchema { service, .. } => {
                json!({ "service": service })
            }
            _ => Value::Null,
        };
        json!({
            "error": {
                "code": status,
                "status_code": status,
                "message": self.to_string(),
                "context": context,
            }
        })
    }
}
