//! Per-schema middleware chains configured under `graphql.middleware_schema`.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{
    api::graphql::SCHEMA_PARAM,
    domain::models::Principal,
    infrastructure::{config::GraphQLConfig, state::AppState},
};

/// A check run before a request reaches the GraphQL handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaGuard {
    /// `auth`: the request must carry valid credentials.
    Authenticated,
    /// `role:<name>`: the caller must hold the named role.
    Role(String),
}

impl SchemaGuard {
    pub fn check(&self, principal: Option<&Principal>) -> Result<(), GuardRejection> {
        let principal = principal.ok_or(GuardRejection::Unauthenticated)?;
        match self {
            SchemaGuard::Authenticated => Ok(()),
            SchemaGuard::Role(role) if principal.role.eq_ignore_ascii_case(role) => Ok(()),
            SchemaGuard::Role(role) => Err(GuardRejection::MissingRole(role.clone())),
        }
    }
}

impl FromStr for SchemaGuard {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once(':') {
            None if value.trim() == "auth" => Ok(SchemaGuard::Authenticated),
            Some(("role", role)) if !role.trim().is_empty() => {
                Ok(SchemaGuard::Role(role.trim().to_string()))
            }
            _ => anyhow::bail!("unknown graphql middleware {value:?}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GuardRejection {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role '{0}' required")]
    MissingRole(String),
    #[error("application state unavailable")]
    MissingState,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let status = match self {
            GuardRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            GuardRejection::MissingRole(_) => StatusCode::FORBIDDEN,
            GuardRejection::MissingState => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Guard chains keyed by lower-cased schema identifier.
#[derive(Debug, Default)]
pub struct SchemaGuards {
    chains: HashMap<String, Vec<SchemaGuard>>,
    default_schema: Option<String>,
}

impl SchemaGuards {
    pub fn from_config(config: &GraphQLConfig) -> anyhow::Result<Self> {
        let mut chains = HashMap::with_capacity(config.middleware_schema.len());
        for (schema, names) in &config.middleware_schema {
            let chain = names
                .iter()
                .map(|name| name.parse())
                .collect::<anyhow::Result<Vec<SchemaGuard>>>()?;
            chains.insert(schema.to_lowercase(), chain);
        }

        Ok(Self {
            chains,
            default_schema: config.schema.clone(),
        })
    }

    /// Chain for the schema named by the route, falling back to `graphql.schema`.
    pub fn chain_for(&self, route_schema: Option<&str>) -> &[SchemaGuard] {
        route_schema
            .or(self.default_schema.as_deref())
            .and_then(|schema| self.chains.get(&schema.to_lowercase()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub async fn apply_schema_guards(request: Request, next: Next) -> Result<Response, GuardRejection> {
    let (mut parts, body) = request.into_parts();
    let Some(state) = parts.extensions.get::<Arc<AppState>>().cloned() else {
        return Err(GuardRejection::MissingState);
    };

    let route_schema = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .ok()
        .and_then(|Path(mut params)| params.remove(SCHEMA_PARAM));
    let chain = state.guards.chain_for(route_schema.as_deref());

    if !chain.is_empty() {
        let principal = state.auth.user(&parts.headers).await.unwrap_or_default();
        for guard in chain {
            guard.check(principal.as_ref())?;
        }
    }

    let request = Request::from_parts(parts, body);
    Ok(next.run(request).await)
}
