/// Collection and record accessors
///
/// Both wrap an object by name and delegate to its resolution. A collection
/// marks the filters as a collection query and returns `{count,
/// countEstimate, records}`; a record returns the first row. Either may
/// inject filters derived from the parent row, which is how nested
/// relations are scoped to their parent.

use crate::error::Result;
use crate::query::{QueryFilters, Row};
use crate::schema::fields::{record_args, FieldDescriptor};
use crate::schema::object::{ObjectType, ResolveRequest};
use crate::schema::resolver::{
    decode_filters, execution_context, field_resolver, graphql_error, object_directory,
    parent_row, request_user, requested_fields, FieldResolver,
};

use async_graphql::dynamic::{Field, FieldFuture, FieldValue};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Derive child filters from the parent row
pub type InjectFn = Arc<dyn Fn(Option<&Row>, QueryFilters) -> Result<QueryFilters> + Send + Sync>;

/// The parts of an object a collection needs, available before the object
/// itself is built
#[derive(Debug, Clone)]
pub struct ObjectRef {
    pub name: String,
    pub description: String,
    pub arguments: IndexMap<String, FieldDescriptor>,
}

impl ObjectRef {
    pub fn new(name: impl Into<String>, arguments: IndexMap<String, FieldDescriptor>) -> Self {
        let name = name.into();
        Self {
            description: format!("No description for {}", name),
            name,
            arguments,
        }
    }
}

impl From<&ObjectType> for ObjectRef {
    fn from(object: &ObjectType) -> Self {
        Self {
            name: object.name().to_string(),
            description: object.description().to_string(),
            arguments: object.arguments().clone(),
        }
    }
}

#[derive(Clone, Default)]
pub struct CollectionOptions {
    pub inject: Option<InjectFn>,
    /// Namespaces the collection type under a parent type name
    pub parent: Option<String>,
    pub prefix: String,
}

impl CollectionOptions {
    pub fn inject<F>(mut self, inject: F) -> Self
    where
        F: Fn(Option<&Row>, QueryFilters) -> Result<QueryFilters> + Send + Sync + 'static,
    {
        self.inject = Some(Arc::new(inject));
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// `<parent><prefix><object>Collection`
pub fn collection_name(object: &str, parent: Option<&str>, prefix: &str) -> String {
    format!("{}{}{}Collection", parent.unwrap_or_default(), prefix, object)
}

pub struct CollectionType {
    name: String,
    object: String,
    arguments: IndexMap<String, FieldDescriptor>,
    inject: Option<InjectFn>,
}

impl CollectionType {
    pub fn new(object: &ObjectRef, options: CollectionOptions) -> Self {
        Self {
            name: collection_name(&object.name, options.parent.as_deref(), &options.prefix),
            object: object.name.clone(),
            arguments: object.arguments.clone(),
            inject: options.inject,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_name(&self) -> &str {
        &self.object
    }

    pub fn arguments(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.arguments
    }

    /// Mark as a collection query, then apply parent injection
    pub fn prepare_filters(&self, parent: Option<&Row>, mut filters: QueryFilters) -> Result<QueryFilters> {
        filters.is_collection = true;
        match &self.inject {
            Some(inject) => inject(parent, filters),
            None => Ok(filters),
        }
    }

    /// A field descriptor resolving this collection. It is marked as a
    /// relation so a parent object never selects it as a column.
    pub fn descriptor(self: &Arc<Self>) -> FieldDescriptor {
        FieldDescriptor::new(&self.name)
            .arguments(self.arguments.clone())
            .resolver(collection_resolver(Arc::clone(self)))
            .relation()
    }

    pub fn field(self: &Arc<Self>, name: &str) -> Field {
        self.descriptor().to_field(name)
    }
}

impl fmt::Debug for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionType")
            .field("name", &self.name)
            .field("object", &self.object)
            .field("inject", &self.inject.is_some())
            .finish()
    }
}

fn collection_resolver(collection: Arc<CollectionType>) -> FieldResolver {
    field_resolver(move |ctx| {
        let collection = Arc::clone(&collection);
        FieldFuture::new(async move {
            let exec = execution_context(&ctx).map_err(graphql_error)?;
            let object = object_directory(&ctx)
                .and_then(|directory| directory.get(collection.object_name()))
                .map_err(graphql_error)?;

            let parent = parent_row(&ctx);
            let filters = decode_filters(&ctx)
                .and_then(|filters| collection.prepare_filters(parent.as_ref(), filters))
                .map_err(graphql_error)?;

            let request = ResolveRequest {
                parent,
                filters,
                user: request_user(&ctx),
                fields: requested_fields(&ctx),
            };

            let envelope = object.resolve(exec, request).await.map_err(graphql_error)?;
            Ok(Some(FieldValue::owned_any(envelope.into_collection())))
        })
    })
}

/// Single-record accessor; not registered, so any number may exist per object
#[derive(Clone)]
pub struct RecordType {
    object: String,
    inject: Option<InjectFn>,
}

impl RecordType {
    pub fn new(object: &ObjectRef, inject: Option<InjectFn>) -> Self {
        Self {
            object: object.name.clone(),
            inject,
        }
    }

    pub fn object_name(&self) -> &str {
        &self.object
    }

    pub fn prepare_filters(&self, parent: Option<&Row>, filters: QueryFilters) -> Result<QueryFilters> {
        match &self.inject {
            Some(inject) => inject(parent, filters),
            None => Ok(filters),
        }
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor::new(&self.object)
            .arguments(record_args())
            .resolver(record_resolver(self.clone()))
            .relation()
    }

    pub fn field(&self, name: &str) -> Field {
        self.descriptor().to_field(name)
    }
}

fn record_resolver(record: RecordType) -> FieldResolver {
    let record = Arc::new(record);
    field_resolver(move |ctx| {
        let record = Arc::clone(&record);
        FieldFuture::new(async move {
            let exec = execution_context(&ctx).map_err(graphql_error)?;
            let object = object_directory(&ctx)
                .and_then(|directory| directory.get(record.object_name()))
                .map_err(graphql_error)?;

            let parent = parent_row(&ctx);
            let filters = decode_filters(&ctx)
                .and_then(|filters| record.prepare_filters(parent.as_ref(), filters))
                .map_err(graphql_error)?;

            let request = ResolveRequest {
                parent,
                filters,
                user: request_user(&ctx),
                fields: requested_fields(&ctx),
            };

            let envelope = object.resolve(exec, request).await.map_err(graphql_error)?;
            Ok(envelope.into_first().map(FieldValue::owned_any))
        })
    })
}
