use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::{domain::models::GraphQLError, infrastructure::config::ErrorFormatterKind};

/// Renders one execution error for the `errors` array of a response.
pub type ErrorFormatter = Arc<dyn Fn(&GraphQLError) -> Value + Send + Sync>;

pub fn formatter_for(kind: ErrorFormatterKind) -> ErrorFormatter {
    match kind {
        ErrorFormatterKind::Default => Arc::new(format_error),
        ErrorFormatterKind::Detailed => Arc::new(format_error_detailed),
    }
}

/// `{ message, locations }`, leaving out `locations` when there are none.
pub fn format_error(error: &GraphQLError) -> Value {
    Value::Object(message_and_locations(error))
}

pub fn format_error_detailed(error: &GraphQLError) -> Value {
    let mut formatted = message_and_locations(error);
    if !error.path.is_empty() {
        formatted.insert("path".to_string(), Value::Array(error.path.clone()));
    }
    if let Some(extensions) = &error.extensions {
        formatted.insert("extensions".to_string(), Value::Object(extensions.clone()));
    }
    Value::Object(formatted)
}

fn message_and_locations(error: &GraphQLError) -> Map<String, Value> {
    let mut formatted = Map::new();
    formatted.insert("message".to_string(), Value::String(error.message.clone()));
    if !error.locations.is_empty() {
        let locations = error
            .locations
            .iter()
            .map(|location| json!({ "line": location.line, "column": location.column }))
            .collect();
        formatted.insert("locations".to_string(), Value::Array(locations));
    }
    formatted
}
