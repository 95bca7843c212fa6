use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::error;

use crate::{
    api::graphql::json, domain::models::DispatchResponse, infrastructure::config::JsonEncodingOptions,
};

/// A dispatcher response rendered with the configured headers and encoding.
pub struct JsonResponse {
    pub status: StatusCode,
    pub body: Value,
    pub headers: HeaderMap,
    pub encoding: JsonEncodingOptions,
}

impl JsonResponse {
    pub fn new(response: DispatchResponse, headers: HeaderMap, encoding: JsonEncodingOptions) -> Self {
        Self {
            status: response.status,
            body: response.body,
            headers,
            encoding,
        }
    }
}

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        let bytes = match json::to_vec(&self.body, &self.encoding) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(error = ?err, "failed to encode graphql response");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "failed to encode response" })),
                )
                    .into_response();
            }
        };

        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            bytes,
        )
            .into_response();
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}
