use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::domain::models::UNAUTHORIZED;

pub const DEFAULT_GRAPHIQL_VIEW: &str = "graphql::graphiql";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub graphql: GraphQLConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphQLConfig {
    /// Path segment the GraphQL routes are nested under.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Schema used to pick a middleware chain when the route names none.
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub middleware_schema: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub json_encoding_options: JsonEncodingOptions,
    #[serde(default = "default_variables_input_name")]
    pub variables_input_name: String,
    #[serde(default)]
    pub error_formatter: ErrorFormatterKind,
    #[serde(default)]
    pub unauthorized_rule: UnauthorizedRule,
    #[serde(default)]
    pub graphiql: GraphiqlConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonEncodingOptions {
    #[serde(default)]
    pub pretty_print: bool,
    /// Write `/` as `\/`.
    #[serde(default)]
    pub escape_slashes: bool,
    /// Write every non-ASCII character as a `\uXXXX` escape.
    #[serde(default)]
    pub escape_unicode: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFormatterKind {
    /// `message` and `locations`.
    #[default]
    Default,
    /// `message`, `locations`, `path` and `extensions`.
    Detailed,
}

/// Decides whether the errors of a single (non-batch) result demand a 403.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedRule {
    /// Forbidden when there is at least one error and every error is `Unauthorized`.
    #[default]
    AllUnauthorized,
    /// Forbidden as soon as any error is `Unauthorized`, even when other
    /// errors were reported alongside it. Select this to keep the 403 behaviour
    /// of gateways that fold every error of a response into one decision.
    AnyUnauthorized,
}

impl UnauthorizedRule {
    pub fn is_authorized(self, errors: &[serde_json::Value]) -> bool {
        let unauthorized = |error: &serde_json::Value| {
            error.get("message").and_then(serde_json::Value::as_str) == Some(UNAUTHORIZED)
        };
        match self {
            UnauthorizedRule::AllUnauthorized => {
                errors.is_empty() || !errors.iter().all(unauthorized)
            }
            UnauthorizedRule::AnyUnauthorized => !errors.iter().any(unauthorized),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphiqlConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_graphiql_view")]
    pub view: String,
    /// Directory of additional tera templates that `view` may name.
    #[serde(default)]
    pub template_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
        }
    }
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            schema: None,
            middleware_schema: HashMap::new(),
            headers: HashMap::new(),
            json_encoding_options: JsonEncodingOptions::default(),
            variables_input_name: default_variables_input_name(),
            error_formatter: ErrorFormatterKind::default(),
            unauthorized_rule: UnauthorizedRule::default(),
            graphiql: GraphiqlConfig::default(),
        }
    }
}

impl Default for GraphiqlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            view: default_graphiql_view(),
            template_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("GRAPHQL_GATEWAY").separator("__"));
        let cfg = builder.build()?;
        let config: Config = cfg.try_deserialize()?;

        if config.graphql.variables_input_name.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "graphql.variables_input_name must not be empty".into(),
            ));
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

impl GraphQLConfig {
    /// Headers added to every GraphQL JSON response.
    pub fn response_headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| anyhow::anyhow!("invalid header name {name:?}: {err}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| anyhow::anyhow!("invalid value for header {name}: {err}"))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    /// Middleware chain configured for `schema`, compared case-insensitively.
    pub fn middleware_for(&self, schema: &str) -> Option<&[String]> {
        let schema = schema.to_lowercase();
        self.middleware_schema
            .iter()
            .find(|(key, _)| key.to_lowercase() == schema)
            .map(|(_, chain)| chain.as_slice())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_prefix() -> String {
    "graphql".to_string()
}

fn default_variables_input_name() -> String {
    "variables".to_string()
}

fn default_graphiql_view() -> String {
    DEFAULT_GRAPHIQL_VIEW.to_string()
}

fn default_true() -> bool {
    true
}
