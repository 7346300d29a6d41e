/// GraphQL schema construction over Postgres
///
/// This module provides the type registry and the object, collection and
/// mutation builders, the resolvers that turn GraphQL selections into
/// projected SQL, and the config-driven `SchemaBuilder`.

mod builder;
mod collection;
mod context;
pub mod fields;
pub mod helpers;
mod mutation;
mod object;
mod registry;
mod resolver;
mod scalars;
mod selection;

pub use builder::SchemaBuilder;
pub use collection::{collection_name, CollectionOptions, CollectionType, InjectFn, ObjectRef, RecordType};
pub use context::{ExecutionContext, ObjectDirectory};
pub use fields::FieldDescriptor;
pub use helpers::{AuthUser, Role};
pub use mutation::{MutationRequest, MutationSpec, MutationType};
pub use object::{
    project_columns, FieldMeta, ObjectSpec, ObjectType, Projection, ResolveContext, ResolveRequest,
};
pub use registry::TypeRegistry;
pub use resolver::graphql_error;
pub use scalars::register_custom_scalars;
pub use selection::RequestedFields;
