use std::sync::Arc;

use axum::http::HeaderMap;

use crate::{
    api::graphql::middleware::SchemaGuards,
    infrastructure::{
        auth::{AuthProvider, JwtAuthProvider},
        config::Config,
        registry::ServiceRegistry,
        views::Views,
    },
    services::{
        dispatcher::Dispatcher, engine::AsyncGraphqlEngine, schema::ServiceSchemaResolver,
    },
};

pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub auth: Arc<dyn AuthProvider>,
    pub views: Views,
    pub guards: SchemaGuards,
    pub response_headers: HeaderMap,
}

impl AppState {
    /// Wires the default collaborators: JWT authentication, registry-backed
    /// schemas and the `async-graphql` engine.
    pub fn new(config: Arc<Config>, registry: Arc<dyn ServiceRegistry>) -> anyhow::Result<Self> {
        let auth: Arc<dyn AuthProvider> = Arc::new(JwtAuthProvider::new(&config.auth.jwt_secret));
        let dispatcher = Dispatcher::new(
            &config.graphql,
            Arc::new(ServiceSchemaResolver::new(registry)),
            Arc::new(AsyncGraphqlEngine),
            Arc::clone(&auth),
        );
        Self::with_dispatcher(config, dispatcher, auth)
    }

    pub fn with_dispatcher(
        config: Arc<Config>,
        dispatcher: Dispatcher,
        auth: Arc<dyn AuthProvider>,
    ) -> anyhow::Result<Self> {
        let views = Views::new(&config.graphql.graphiql)?;
        let guards = SchemaGuards::from_config(&config.graphql)?;
        let response_headers = config.graphql.response_headers()?;

        Ok(Self {
            config,
            dispatcher,
            auth,
            views,
            guards,
            response_headers,
        })
    }
}
