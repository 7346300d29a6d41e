/// Type registry
///
/// Owns every named type of one schema. Builders are idempotent by name:
/// asking twice for the same object, collection, enum or input returns what
/// was registered first, so shared types are declared once. A name already
/// taken by a different kind of type is an error.

use crate::error::{DistraughtError, Result};
use crate::schema::collection::{CollectionOptions, CollectionType, InjectFn, ObjectRef, RecordType};
use crate::schema::context::{ExecutionContext, ObjectDirectory};
use crate::schema::fields::{FieldDescriptor, SORT_DIRECTION};
use crate::schema::mutation::{MutationSpec, MutationType};
use crate::schema::object::{ObjectSpec, ObjectType};
use crate::schema::resolver::collection_wrapper;
use crate::schema::scalars::register_custom_scalars;

use async_graphql::dynamic::{Enum, EnumItem, InputObject, Object, Schema};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeKind {
    Object,
    Collection,
    Enum,
    Input,
    Output,
}

#[derive(Debug, Clone)]
struct EnumDefinition {
    description: String,
    values: Vec<String>,
}

#[derive(Debug, Clone)]
struct TypeDefinition {
    description: String,
    fields: IndexMap<String, FieldDescriptor>,
}

pub struct TypeRegistry {
    kinds: IndexMap<String, TypeKind>,
    objects: IndexMap<String, Arc<ObjectType>>,
    collections: IndexMap<String, Arc<CollectionType>>,
    enums: IndexMap<String, EnumDefinition>,
    inputs: IndexMap<String, TypeDefinition>,
    outputs: IndexMap<String, TypeDefinition>,
    mutations: IndexMap<String, Arc<MutationType>>,
}

impl TypeRegistry {
    /// An empty registry holding only the `SortDirection` enum
    pub fn new() -> Self {
        let mut registry = Self {
            kinds: IndexMap::new(),
            objects: IndexMap::new(),
            collections: IndexMap::new(),
            enums: IndexMap::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            mutations: IndexMap::new(),
        };
        registry.kinds.insert(SORT_DIRECTION.to_string(), TypeKind::Enum);
        registry.enums.insert(
            SORT_DIRECTION.to_string(),
            EnumDefinition {
                description: "Sort direction".to_string(),
                values: vec!["ASC".to_string(), "DESC".to_string()],
            },
        );
        registry
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// `true` when `name` is already registered as `kind`
    fn claim(&mut self, name: &str, kind: TypeKind) -> Result<bool> {
        match self.kinds.get(name) {
            Some(existing) if *existing == kind => Ok(true),
            Some(existing) => Err(DistraughtError::SchemaGeneration(format!(
                "Type '{}' is already registered as {:?}",
                name, existing
            ))),
            None => {
                self.kinds.insert(name.to_string(), kind);
                Ok(false)
            }
        }
    }

    pub fn pg_object(&mut self, spec: ObjectSpec) -> Result<Arc<ObjectType>> {
        self.object_with(spec, ObjectType::pg)
    }

    pub fn pg_optimized_object(&mut self, spec: ObjectSpec) -> Result<Arc<ObjectType>> {
        self.object_with(spec, ObjectType::pg_optimized)
    }

    pub fn gql_object(&mut self, spec: ObjectSpec) -> Result<Arc<ObjectType>> {
        self.object_with(spec, ObjectType::gql)
    }

    fn object_with(
        &mut self,
        spec: ObjectSpec,
        build: fn(ObjectSpec) -> Result<ObjectType>,
    ) -> Result<Arc<ObjectType>> {
        if let Some(existing) = self.objects.get(spec.name()) {
            return Ok(Arc::clone(existing));
        }

        let object = Arc::new(build(spec)?);
        self.claim(object.name(), TypeKind::Object)?;
        tracing::debug!("Registered object type: {}", object.name());
        self.objects
            .insert(object.name().to_string(), Arc::clone(&object));
        Ok(object)
    }

    pub fn object(&self, name: &str) -> Option<&Arc<ObjectType>> {
        self.objects.get(name)
    }

    /// Collection wrapper for `object`, created once per composed name
    pub fn collection(
        &mut self,
        object: &ObjectRef,
        options: CollectionOptions,
    ) -> Result<Arc<CollectionType>> {
        let collection = CollectionType::new(object, options);
        if self.claim(collection.name(), TypeKind::Collection)? {
            if let Some(existing) = self.collections.get(collection.name()) {
                return Ok(Arc::clone(existing));
            }
        }

        let collection = Arc::new(collection);
        self.collections
            .insert(collection.name().to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    pub fn record(&self, object: &ObjectRef, inject: Option<InjectFn>) -> RecordType {
        RecordType::new(object, inject)
    }

    /// Enum type; returns a field descriptor of it
    pub fn options(&mut self, name: &str, description: &str, values: &[&str]) -> Result<FieldDescriptor> {
        if name.is_empty() {
            return Err(DistraughtError::Config("Invalid options: Name is required".to_string()));
        }
        if description.is_empty() {
            return Err(DistraughtError::Config(format!(
                "Invalid options: Description is required for {}",
                name
            )));
        }
        if values.is_empty() {
            return Err(DistraughtError::Config(format!(
                "Invalid options: Values are required for {}",
                name
            )));
        }

        if !self.claim(name, TypeKind::Enum)? {
            self.enums.insert(
                name.to_string(),
                EnumDefinition {
                    description: description.to_string(),
                    values: values.iter().map(|v| v.to_string()).collect(),
                },
            );
        }
        Ok(FieldDescriptor::new(name).description(description))
    }

    pub fn input_object(
        &mut self,
        name: &str,
        description: &str,
        fields: IndexMap<String, FieldDescriptor>,
    ) -> Result<FieldDescriptor> {
        validate_definition("input_object", name, &fields)?;
        if !self.claim(name, TypeKind::Input)? {
            self.inputs.insert(
                name.to_string(),
                TypeDefinition {
                    description: description.to_string(),
                    fields,
                },
            );
        }
        Ok(FieldDescriptor::new(name))
    }

    /// Object type for structured values (nested JSON), not backed by a table
    pub fn output_object(
        &mut self,
        name: &str,
        description: &str,
        fields: IndexMap<String, FieldDescriptor>,
    ) -> Result<FieldDescriptor> {
        validate_definition("output_object", name, &fields)?;
        if !self.claim(name, TypeKind::Output)? {
            self.outputs.insert(
                name.to_string(),
                TypeDefinition {
                    description: description.to_string(),
                    fields,
                },
            );
        }
        Ok(FieldDescriptor::new(name))
    }

    pub fn pg_mutation(&mut self, spec: MutationSpec) -> Result<Arc<MutationType>> {
        if let Some(existing) = self.mutations.get(spec.name()) {
            return Ok(Arc::clone(existing));
        }

        let mutation = Arc::new(MutationType::new(spec)?);
        // Mutation names live on the Mutation root, not in the type namespace
        self.mutations
            .insert(mutation.name().to_string(), Arc::clone(&mutation));
        Ok(mutation)
    }

    /// Assemble the executable schema. `query_fields` become the Query root;
    /// registered mutations become the Mutation root.
    pub fn build_schema(
        &self,
        query_fields: IndexMap<String, FieldDescriptor>,
        exec: ExecutionContext,
    ) -> Result<Schema> {
        if query_fields.is_empty() {
            return Err(DistraughtError::SchemaGeneration(
                "No query fields provided".to_string(),
            ));
        }
        for collection in self.collections.values() {
            if !self.objects.contains_key(collection.object_name()) {
                return Err(DistraughtError::SchemaGeneration(format!(
                    "Collection '{}' refers to unknown object '{}'",
                    collection.name(),
                    collection.object_name()
                )));
            }
        }

        let query = query_fields
            .iter()
            .fold(Object::new("Query"), |query, (name, field)| query.field(field.to_field(name)));

        let mutation_root = (!self.mutations.is_empty()).then(|| {
            self.mutations
                .iter()
                .fold(Object::new("Mutation"), |root, (name, mutation)| {
                    root.field(mutation.descriptor().to_field(name))
                })
        });

        let mut builder = Schema::build(
            "Query",
            mutation_root.as_ref().map(|_| "Mutation"),
            None,
        );

        for scalar in register_custom_scalars() {
            builder = builder.register(scalar);
        }

        for (name, definition) in &self.enums {
            let enum_type = definition
                .values
                .iter()
                .fold(Enum::new(name).description(&definition.description), |e, value| {
                    e.item(EnumItem::new(value))
                });
            builder = builder.register(enum_type);
        }

        for (name, definition) in &self.inputs {
            let input = definition.fields.iter().fold(
                InputObject::new(name).description(&definition.description),
                |input, (field_name, field)| input.field(field.to_input_value(field_name)),
            );
            builder = builder.register(input);
        }

        for (name, definition) in &self.outputs {
            let output = definition.fields.iter().fold(
                Object::new(name).description(&definition.description),
                |output, (field_name, field)| output.field(field.to_field(field_name)),
            );
            builder = builder.register(output);
        }

        for object in self.objects.values() {
            builder = builder.register(object.graphql_object());
        }

        for collection in self.collections.values() {
            builder = builder.register(collection_wrapper(collection.name(), collection.object_name()));
        }

        builder = builder.register(query);
        if let Some(root) = mutation_root {
            builder = builder.register(root);
        }

        tracing::info!(
            "Building schema with {} objects and {} collections",
            self.objects.len(),
            self.collections.len()
        );

        builder
            .data(exec)
            .data(ObjectDirectory::new(self.objects.clone()))
            .finish()
            .map_err(|e| DistraughtError::SchemaGeneration(format!("Failed to build schema: {}", e)))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_definition(kind: &str, name: &str, fields: &IndexMap<String, FieldDescriptor>) -> Result<()> {
    if name.is_empty() {
        return Err(DistraughtError::Config(format!("Invalid {}: Name is required", kind)));
    }
    if fields.is_empty() {
        return Err(DistraughtError::Config(format!(
            "Invalid {}: Fields are required for {}",
            kind, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Database, QueryBuilder, Row, SqlValue};
    use crate::schema::fields;
    use crate::schema::mutation::MutationRequest;
    use async_trait::async_trait;

    struct NoDatabase;

    #[async_trait]
    impl Database for NoDatabase {
        async fn fetch_rows(&self, _sql: &str, _bindings: &[SqlValue]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn user_spec() -> ObjectSpec {
        ObjectSpec::new("User")
            .column("id", fields::id())
            .resolve(|_, _, _| Ok(QueryBuilder::table("users")))
    }

    #[test]
    fn test_sort_direction_is_preregistered() {
        let registry = TypeRegistry::new();
        assert!(registry.has_type(SORT_DIRECTION));
    }

    #[test]
    fn test_objects_are_idempotent_by_name() {
        let mut registry = TypeRegistry::new();
        let first = registry.pg_object(user_spec()).unwrap();
        let second = registry.pg_object(user_spec().description("ignored")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_collection_identity() {
        let mut registry = TypeRegistry::new();
        let user = registry.pg_object(user_spec()).unwrap();
        let user_ref = ObjectRef::from(user.as_ref());

        let a = registry.collection(&user_ref, CollectionOptions::default()).unwrap();
        let b = registry.collection(&user_ref, CollectionOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let nested = registry
            .collection(&user_ref, CollectionOptions::default().parent("Team"))
            .unwrap();
        assert_eq!(nested.name(), "TeamUserCollection");
        assert!(!Arc::ptr_eq(&a, &nested));
    }

    #[test]
    fn test_name_clash_across_kinds() {
        let mut registry = TypeRegistry::new();
        registry.pg_object(user_spec()).unwrap();

        let mut input_fields = IndexMap::new();
        input_fields.insert("id".to_string(), fields::id());
        assert!(registry.input_object("User", "clash", input_fields).is_err());
    }

    #[test]
    fn test_mutations_share_no_namespace_with_types() {
        let mut registry = TypeRegistry::new();
        registry.pg_object(user_spec()).unwrap();

        let spec = || {
            MutationSpec::new("User")
                .description("Root field named like a type")
                .output(FieldDescriptor::new("User"))
                .resolve(|request: MutationRequest| async move { Ok(request.input) })
        };
        let first = registry.pg_mutation(spec()).unwrap();
        let second = registry.pg_mutation(spec()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // The type keeps its kind
        let mut input_fields = IndexMap::new();
        input_fields.insert("id".to_string(), fields::id());
        assert!(registry.input_object("User", "clash", input_fields).is_err());
        assert!(registry.object("User").is_some());
    }

    #[test]
    fn test_options_validation() {
        let mut registry = TypeRegistry::new();
        assert!(registry.options("", "d", &["A"]).is_err());
        assert!(registry.options("Status", "", &["A"]).is_err());
        assert!(registry.options("Status", "Order status", &[]).is_err());

        let status = registry.options("Status", "Order status", &["OPEN", "CLOSED"]).unwrap();
        assert_eq!(status.type_name(), "Status");
    }

    #[test]
    fn test_build_schema_requires_known_objects() {
        let mut registry = TypeRegistry::new();
        let orphan = ObjectRef::new("Ghost", IndexMap::new());
        let collection = registry.collection(&orphan, CollectionOptions::default()).unwrap();

        let mut query = IndexMap::new();
        query.insert("ghosts".to_string(), collection.descriptor());

        let exec = ExecutionContext::new(Arc::new(NoDatabase));
        assert!(registry.build_schema(query, exec).is_err());
    }
}
