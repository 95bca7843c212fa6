//! Resolution of schema identifiers into executable `async-graphql` schemas.
//!
//! Services publish a [`SchemaDefinition`] made of dynamic fields and types;
//! [`build_schema`] assembles it under a `Query` root (and a `Mutation` root when
//! the service declares mutations). Requests that name no schema get the
//! default schema, which lists the registered services and service types.

use std::any::Any;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Object, Schema, SchemaError, Type, TypeRef,
};

use crate::{
    domain::models::{ServiceInfo, ServiceTypeInfo},
    infrastructure::registry::ServiceRegistry,
    services::errors::DispatchError,
};

pub type ExecutableSchema = Schema;

pub const QUERY_ROOT: &str = "Query";
pub const MUTATION_ROOT: &str = "Mutation";

const SERVICE_OBJECT: &str = "Service";
const SERVICE_TYPE_OBJECT: &str = "ServiceType";

/// The parts of a GraphQL schema a service contributes.
#[derive(Default)]
pub struct SchemaDefinition {
    pub query: Vec<Field>,
    pub mutation: Vec<Field>,
    pub types: Vec<Type>,
}

impl SchemaDefinition {
    pub fn query(mut self, field: Field) -> Self {
        self.query.push(field);
        self
    }

    pub fn mutation(mut self, field: Field) -> Self {
        self.mutation.push(field);
        self
    }

    pub fn register(mut self, ty: impl Into<Type>) -> Self {
        self.types.push(ty.into());
        self
    }
}

pub fn build_schema(definition: SchemaDefinition) -> Result<ExecutableSchema, SchemaError> {
    let SchemaDefinition {
        query,
        mutation,
        types,
    } = definition;
    let has_mutation = !mutation.is_empty();

    let mut builder = Schema::build(QUERY_ROOT, has_mutation.then_some(MUTATION_ROOT), None)
        .register(query.into_iter().fold(Object::new(QUERY_ROOT), Object::field));
    if has_mutation {
        builder =
            builder.register(mutation.into_iter().fold(Object::new(MUTATION_ROOT), Object::field));
    }
    for ty in types {
        builder = builder.register(ty);
    }
    builder.finish()
}

/// Schema served when a request names no service: the `services` and
/// `service_types` resolver groups over `registry`.
pub fn default_schema(
    registry: &Arc<dyn ServiceRegistry>,
) -> Result<ExecutableSchema, SchemaError> {
    let services = Arc::clone(registry);
    let service_types = Arc::clone(registry);

    let definition = SchemaDefinition::default()
        .query(
            Field::new(
                "services",
                TypeRef::named_nn_list_nn(SERVICE_OBJECT),
                move |_ctx| {
                    let services = services.services();
                    FieldFuture::new(async move {
                        Ok(Some(FieldValue::list(
                            services.into_iter().map(FieldValue::owned_any),
                        )))
                    })
                },
            )
            .description("Services registered with the gateway"),
        )
        .query(
            Field::new(
                "service_types",
                TypeRef::named_nn_list_nn(SERVICE_TYPE_OBJECT),
                move |_ctx| {
                    let types = service_types.service_types();
                    FieldFuture::new(async move {
                        Ok(Some(FieldValue::list(
                            types.into_iter().map(FieldValue::owned_any),
                        )))
                    })
                },
            )
            .description("Kinds of services the gateway can host"),
        )
        .register(
            Object::new(SERVICE_OBJECT)
                .field(text_field::<ServiceInfo>("name", true, |s| Some(s.name.clone())))
                .field(text_field::<ServiceInfo>("label", true, |s| Some(s.label.clone())))
                .field(text_field::<ServiceInfo>("description", false, |s| {
                    s.description.clone()
                }))
                .field(text_field::<ServiceInfo>("type", true, |s| {
                    Some(s.service_type.clone())
                })),
        )
        .register(
            Object::new(SERVICE_TYPE_OBJECT)
                .field(text_field::<ServiceTypeInfo>("name", true, |t| Some(t.name.clone())))
                .field(text_field::<ServiceTypeInfo>("label", true, |t| Some(t.label.clone())))
                .field(text_field::<ServiceTypeInfo>("description", false, |t| {
                    t.description.clone()
                }))
                .field(text_field::<ServiceTypeInfo>("group", false, |t| t.group.clone())),
        );

    build_schema(definition)
}

/// String field read from the parent value, which must be a `T`.
fn text_field<T: Any + Send + Sync>(
    name: &str,
    required: bool,
    read: fn(&T) -> Option<String>,
) -> Field {
    let ty = if required {
        TypeRef::named_nn(TypeRef::STRING)
    } else {
        TypeRef::named(TypeRef::STRING)
    };
    Field::new(name, ty, move |ctx| {
        FieldFuture::new(async move {
            let parent = ctx.parent_value.try_downcast_ref::<T>()?;
            Ok(read(parent).map(FieldValue::value))
        })
    })
}

/// Turns a schema identifier into the schema a query executes against.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, schema: Option<&str>) -> Result<ExecutableSchema, DispatchError>;
}

/// Resolves identifiers to services of a [`ServiceRegistry`].
pub struct ServiceSchemaResolver {
    registry: Arc<dyn ServiceRegistry>,
}

impl ServiceSchemaResolver {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self { registry }
    }
}

impl SchemaResolver for ServiceSchemaResolver {
    fn resolve(&self, schema: Option<&str>) -> Result<ExecutableSchema, DispatchError> {
        let Some(id) = schema.filter(|id| !id.is_empty()) else {
            return default_schema(&self.registry)
                .map_err(|err| DispatchError::Schema(err.to_string()));
        };

        let name = id.to_lowercase();
        let service = self
            .registry
            .get_service(&name)
            .ok_or_else(|| DispatchError::ServiceNotFound(name.clone()))?;
        let definition = service
            .graphql_schema()
            .map_err(|reason| DispatchError::ServiceSchema {
                service: name.clone(),
                reason,
            })?;
        build_schema(definition).map_err(|err| DispatchError::Schema(err.to_string()))
    }
}
