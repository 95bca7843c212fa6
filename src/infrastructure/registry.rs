use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    domain::models::{ServiceInfo, ServiceTypeInfo},
    services::schema::SchemaDefinition,
};

/// A named service that publishes a GraphQL schema.
pub trait GraphQLService: Send + Sync {
    fn info(&self) -> ServiceInfo;

    /// Builds a fresh definition of the service's schema. Called once per query.
    fn graphql_schema(&self) -> anyhow::Result<SchemaDefinition>;
}

pub trait ServiceRegistry: Send + Sync {
    /// Looks up a service by its normalized (lower-case) name.
    fn get_service(&self, name: &str) -> Option<Arc<dyn GraphQLService>>;
    fn services(&self) -> Vec<ServiceInfo>;
    fn service_types(&self) -> Vec<ServiceTypeInfo>;
}

#[derive(Default)]
pub struct InMemoryServiceRegistry {
    services: RwLock<BTreeMap<String, Arc<dyn GraphQLService>>>,
    types: RwLock<BTreeMap<String, ServiceTypeInfo>>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its lower-cased name, replacing any previous
    /// service with that name.
    pub fn register(&self, service: Arc<dyn GraphQLService>) {
        let name = service.info().name.to_lowercase();
        self.services.write().insert(name, service);
    }

    pub fn register_type(&self, info: ServiceTypeInfo) {
        self.types.write().insert(info.name.to_lowercase(), info);
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn get_service(&self, name: &str) -> Option<Arc<dyn GraphQLService>> {
        self.services.read().get(name).cloned()
    }

    fn services(&self) -> Vec<ServiceInfo> {
        self.services
            .read()
            .values()
            .map(|service| service.info())
            .collect()
    }

    fn service_types(&self) -> Vec<ServiceTypeInfo> {
        self.types.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl GraphQLService for Named {
        fn info(&self) -> ServiceInfo {
            ServiceInfo {
                name: self.0.to_string(),
                label: self.0.to_string(),
                description: None,
                service_type: "sql_db".to_string(),
            }
        }

        fn graphql_schema(&self) -> anyhow::Result<SchemaDefinition> {
            Ok(SchemaDefinition::default())
        }
    }

    #[test]
    fn services_are_keyed_by_lower_case_name() {
        let registry = InMemoryServiceRegistry::new();
        registry.register(Arc::new(Named("Inventory")));

        assert!(registry.get_service("inventory").is_some());
        assert!(registry.get_service("Inventory").is_none());
    }

    #[test]
    fn listings_are_sorted_by_name() {
        let registry = InMemoryServiceRegistry::new();
        registry.register(Arc::new(Named("zeta")));
        registry.register(Arc::new(Named("alpha")));

        let names: Vec<_> = registry.services().into_iter().map(|s| s.name).collect();

        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
