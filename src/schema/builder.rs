/// GraphQL schema builder
///
/// This module provides the `SchemaBuilder` which generates a complete GraphQL schema
/// from the entities declared in configuration. Every entity becomes an optimized
/// Postgres object with a record and a collection field on the query root.

use crate::config::{ColumnConfig, ColumnKind, EntityConfig, RelationConfig, RelationKind};
use crate::error::{DistraughtError, Result};
use crate::query::{PgCast, QueryBuilder, QueryFilters, Row, SqlValue};
use crate::schema::collection::{CollectionOptions, InjectFn, ObjectRef};
use crate::schema::context::ExecutionContext;
use crate::schema::fields::{self, collection_args, FieldDescriptor};
use crate::schema::object::{ObjectSpec, ResolveContext};
use crate::schema::registry::TypeRegistry;

use async_graphql::dynamic::Schema;
use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Schema builder for generating GraphQL schemas from entity configuration
pub struct SchemaBuilder {
    registry: TypeRegistry,
    /// Extra query root fields, added after the generated ones
    query_fields: IndexMap<String, FieldDescriptor>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            query_fields: IndexMap::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// For registering hand-written objects, inputs and mutations next to
    /// the generated ones
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn query_field(&mut self, name: impl Into<String>, field: FieldDescriptor) -> &mut Self {
        self.query_fields.insert(name.into(), field);
        self
    }

    /// Build complete GraphQL schema from entities
    ///
    /// # Arguments
    ///
    /// * `entities` - List of entity configurations
    /// * `exec` - Database handle, cache and environment used by the resolvers
    ///
    /// # Returns
    ///
    /// A dynamic GraphQL schema with query resolvers
    pub fn build_schema(&mut self, entities: Vec<EntityConfig>, exec: ExecutionContext) -> Result<Schema> {
        if entities.is_empty() {
            return Err(DistraughtError::SchemaGeneration(
                "No entities provided".to_string(),
            ));
        }

        for entity in &entities {
            entity.validate().map_err(|e| {
                DistraughtError::Config(format!("Invalid entity '{}': {}", entity.graphql_name, e))
            })?;
        }

        // Relations may point at entities declared later, so every object is
        // known by reference before any of them is built
        let refs: IndexMap<String, ObjectRef> = entities
            .iter()
            .map(|entity| (entity.graphql_name.clone(), object_ref(entity)))
            .collect();

        let mut query_fields = IndexMap::new();

        for entity in &entities {
            tracing::info!("Building schema for entity: {}", entity.graphql_name);

            let mut columns: IndexMap<String, FieldDescriptor> = entity
                .columns
                .iter()
                .map(|column| {
                    (
                        column.name.to_lower_camel_case(),
                        column_descriptor(column, &entity.primary_key),
                    )
                })
                .collect();

            for relation in &entity.relation {
                let target = refs.get(&relation.entity).ok_or_else(|| {
                    DistraughtError::Config(format!(
                        "Relation '{}' of '{}' points at unknown entity '{}'",
                        relation.field, entity.graphql_name, relation.entity
                    ))
                })?;
                let field = self.relation_field(entity, relation, target)?;
                columns.insert(relation.field.clone(), field);
            }

            let mut spec = ObjectSpec::new(&entity.graphql_name)
                .columns(columns)
                .filters(filter_descriptors(entity))
                .table_name(&entity.table)
                .resolve(default_resolve(entity, &entities));
            if let Some(description) = &entity.description {
                spec = spec.description(description);
            }
            if let Some(roles) = &entity.allowed_roles {
                spec = spec.allowed_roles(roles.clone());
            }
            if let Some(environments) = &entity.allowed_environments {
                spec = spec.allowed_environments(environments.clone());
            }
            if let Some(ttl) = entity.cache_ttl_ms {
                spec = spec.cache_ttl(Duration::from_millis(ttl));
            }

            let object = self.registry.pg_optimized_object(spec)?;
            let object_ref = ObjectRef::from(object.as_ref());

            let record = self.registry.record(&object_ref, None);
            let collection = self
                .registry
                .collection(&object_ref, CollectionOptions::default())?;

            query_fields.insert(entity.graphql_name.to_lower_camel_case(), record.descriptor());
            query_fields.insert(
                format!("list_{}", entity.graphql_name.to_snake_case()),
                collection.descriptor(),
            );
        }

        query_fields.extend(self.query_fields.clone());

        let schema = self.registry.build_schema(query_fields, exec)?;
        tracing::info!("Schema built with {} entities", entities.len());

        Ok(schema)
    }

    /// Nested field scoped to the parent row: `child_column = parent[parent_field]`
    fn relation_field(
        &mut self,
        entity: &EntityConfig,
        relation: &RelationConfig,
        target: &ObjectRef,
    ) -> Result<FieldDescriptor> {
        let parent_key = relation.parent_field.to_lower_camel_case();
        let inject = inject_from_parent(relation.child_column.to_lower_camel_case(), parent_key.clone());

        let descriptor = match relation.kind {
            RelationKind::Collection => {
                let options = CollectionOptions {
                    inject: Some(inject),
                    parent: Some(entity.graphql_name.clone()),
                    prefix: relation.field.to_upper_camel_case(),
                };
                self.registry.collection(target, options)?.descriptor()
            }
            RelationKind::Record => self.registry.record(target, Some(inject)).descriptor(),
        };

        Ok(descriptor.parent_fields([parent_key]))
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn object_ref(entity: &EntityConfig) -> ObjectRef {
    let mut object_ref = ObjectRef::new(&entity.graphql_name, collection_args(&filter_descriptors(entity)));
    if let Some(description) = &entity.description {
        object_ref.description = description.clone();
    }
    object_ref
}

/// GraphQL field for a column; the primary key is always an `ID`
fn column_descriptor(column: &ColumnConfig, primary_key: &str) -> FieldDescriptor {
    let description = column
        .description
        .clone()
        .unwrap_or_else(|| format!("The {} column", column.name));

    let descriptor = if column.name == primary_key {
        fields::id()
    } else {
        match column.kind {
            ColumnKind::Id => fields::id().description(description),
            ColumnKind::String => fields::string(description),
            ColumnKind::Int => fields::int(description),
            ColumnKind::Float => fields::float(description),
            ColumnKind::Bool => fields::bool(description),
            ColumnKind::Date => fields::date(description),
            ColumnKind::Datetime => fields::datetime(description),
        }
    };

    if column.required {
        descriptor.required()
    } else {
        descriptor
    }
}

fn filter_descriptors(entity: &EntityConfig) -> IndexMap<String, FieldDescriptor> {
    entity
        .filters
        .iter()
        .filter_map(|name| entity.columns.iter().find(|c| &c.name == name))
        .map(|column| {
            let optional = ColumnConfig {
                required: false,
                ..column.clone()
            };
            (column.name.to_lower_camel_case(), column_descriptor(&optional, &entity.primary_key))
        })
        .collect()
}

/// A parent without the value matches nothing: the empty list renders as `FALSE`
fn inject_from_parent(child_key: String, parent_key: String) -> InjectFn {
    Arc::new(move |parent: Option<&Row>, filters: QueryFilters| -> Result<QueryFilters> {
        let value = parent
            .and_then(|row| row.get(&parent_key))
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        Ok(filters.with_filter(child_key.clone(), value))
    })
}

/// Bind a filter value the way its column type needs.
///
/// ID columns go through `where_id`; an undeclared relation column counts
/// as one, since it holds a parent key.
fn apply_filter(
    query: QueryBuilder,
    column: String,
    kind: Option<ColumnKind>,
    value: &serde_json::Value,
) -> QueryBuilder {
    let bind = |value: &serde_json::Value| match (kind, value) {
        (None | Some(ColumnKind::Id), serde_json::Value::String(id)) => SqlValue::from_id(id),
        (Some(ColumnKind::Date), value) => SqlValue::cast_json(value, PgCast::Date),
        (Some(ColumnKind::Datetime), value) => SqlValue::cast_json(value, PgCast::Timestamptz),
        (_, value) => SqlValue::from_json(value),
    };
    let is_id = matches!(kind, None | Some(ColumnKind::Id));

    match value {
        serde_json::Value::Null => query.where_null(column),
        serde_json::Value::Array(values) if is_id => query.where_id_in(column, values.iter().map(bind)),
        serde_json::Value::Array(values) => query.where_in(column, values.iter().map(bind)),
        other if is_id => query.where_id(column, bind(other)),
        other => query.where_eq(column, bind(other)),
    }
}

/// `SELECT ... FROM table`, narrowed by the primary key when `id` is given
/// and by every custom filter naming a known column. Known columns are the
/// declared ones plus the child columns of relations pointing here.
fn default_resolve(
    entity: &EntityConfig,
    entities: &[EntityConfig],
) -> impl Fn(Option<&Row>, &QueryFilters, &ResolveContext<'_>) -> Result<QueryBuilder> + Send + Sync + 'static {
    let table = entity.table.clone();
    let primary_key = format!("{}.{}", entity.table, entity.primary_key);

    let mut known: IndexMap<String, (String, Option<ColumnKind>)> = entity
        .columns
        .iter()
        .map(|c| {
            let kind = if c.name == entity.primary_key { ColumnKind::Id } else { c.kind };
            (c.name.to_lower_camel_case(), (c.name.clone(), Some(kind)))
        })
        .collect();
    for relation in entities.iter().flat_map(|e| &e.relation) {
        if relation.entity == entity.graphql_name {
            known
                .entry(relation.child_column.to_lower_camel_case())
                .or_insert_with(|| (relation.child_column.clone(), None));
        }
    }

    move |_parent: Option<&Row>, filters: &QueryFilters, _ctx: &ResolveContext<'_>| {
        let mut query = QueryBuilder::table(&table);

        if let Some(id) = &filters.id {
            query = query.where_id(primary_key.as_str(), SqlValue::from_id(id));
        }

        for (key, value) in &filters.custom {
            let Some((column, kind)) = known.get(key) else {
                tracing::debug!(table = %table, filter = %key, "ignoring unknown filter");
                continue;
            };
            query = apply_filter(query, format!("{}.{}", table, column), *kind, value);
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Database;
    use crate::schema::RequestedFields;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoDatabase;

    #[async_trait]
    impl Database for NoDatabase {
        async fn fetch_rows(&self, _sql: &str, _bindings: &[SqlValue]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn column(name: &str, kind: ColumnKind) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            kind,
            required: false,
            description: None,
        }
    }

    fn entities() -> Vec<EntityConfig> {
        vec![
            EntityConfig {
                graphql_name: "Customer".to_string(),
                table: "customers".to_string(),
                primary_key: "id".to_string(),
                description: Some("Customer data".to_string()),
                columns: vec![column("id", ColumnKind::Id), column("email", ColumnKind::String)],
                filters: vec!["email".to_string()],
                allowed_roles: None,
                allowed_environments: None,
                cache_ttl_ms: None,
                relation: vec![RelationConfig {
                    field: "orders".to_string(),
                    entity: "Order".to_string(),
                    kind: RelationKind::Collection,
                    child_column: "customer_id".to_string(),
                    parent_field: "id".to_string(),
                }],
            },
            EntityConfig {
                graphql_name: "Order".to_string(),
                table: "orders".to_string(),
                primary_key: "id".to_string(),
                description: None,
                columns: vec![column("id", ColumnKind::Id), column("total", ColumnKind::Float)],
                filters: Vec::new(),
                allowed_roles: None,
                allowed_environments: None,
                cache_ttl_ms: None,
                relation: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_no_entities() {
        let mut builder = SchemaBuilder::new();
        let exec = ExecutionContext::new(Arc::new(NoDatabase));
        assert!(builder.build_schema(Vec::new(), exec).is_err());
    }

    #[test]
    fn test_builds_root_and_relation_fields() {
        let mut builder = SchemaBuilder::new();
        let exec = ExecutionContext::new(Arc::new(NoDatabase));
        let schema = builder.build_schema(entities(), exec).unwrap();

        let sdl = schema.sdl();
        assert!(sdl.contains("customer(id: ID): Customer"));
        assert!(sdl.contains("list_customer("));
        assert!(sdl.contains("CustomerOrdersOrderCollection"));

        let customer = builder.registry().object("Customer").unwrap();
        let meta = customer.field_meta("orders").unwrap();
        assert!(meta.is_relation);
        assert_eq!(meta.parent_fields, vec!["id"]);
    }

    #[test]
    fn test_invalid_entity_is_a_config_error() {
        let mut entities = entities();
        entities[0].graphql_name = "customer".to_string();

        let mut builder = SchemaBuilder::new();
        let exec = ExecutionContext::new(Arc::new(NoDatabase));
        let err = builder.build_schema(entities, exec).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_default_resolve_applies_known_filters() {
        let entities = entities();
        let resolve = default_resolve(&entities[1], &entities);
        let fields = RequestedFields::new();
        let ctx = ResolveContext { user: None, fields: &fields };

        let mut filters = QueryFilters::collection()
            .with_filter("customerId", json!(7))
            .with_filter("unknown", json!("x"));
        filters.id = Some("3".to_string());

        let (sql, bindings) = resolve(None, &filters, &ctx).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT * FROM "orders" WHERE "orders"."id" = $1 AND "orders"."customer_id" = $2"#
        );
        assert_eq!(bindings, vec![SqlValue::Int(3), SqlValue::Int(7)]);
    }

    #[test]
    fn test_default_resolve_binds_by_column_kind() {
        let mut entities = entities();
        entities[1].columns.push(column("placed_on", ColumnKind::Date));
        entities[1].columns.push(column("shipped_at", ColumnKind::Datetime));
        let resolve = default_resolve(&entities[1], &entities);
        let fields = RequestedFields::new();
        let ctx = ResolveContext { user: None, fields: &fields };

        let filters = QueryFilters::collection()
            .with_filter("customerId", json!("2"))
            .with_filter("placedOn", json!("2024-01-05"))
            .with_filter("shippedAt", json!(["2024-01-05T10:00:00Z"]));

        let (sql, bindings) = resolve(None, &filters, &ctx).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT * FROM "orders" WHERE "orders"."customer_id" = $1 AND "orders"."placed_on" = $2::date AND "orders"."shipped_at" IN ($3::timestamptz)"#
        );
        assert_eq!(bindings[0], SqlValue::Int(2));
    }

    #[test]
    fn test_default_resolve_uuid_keys_compare_as_text() {
        let entities = entities();
        let uuid = "5f0c6e2a-1b7d-4c1e-9a43-2d1f0b6c9e11";
        let fields = RequestedFields::new();
        let ctx = ResolveContext { user: None, fields: &fields };

        let mut filters = QueryFilters::default();
        filters.id = Some(uuid.to_string());
        let resolve = default_resolve(&entities[0], &entities);
        let (sql, bindings) = resolve(None, &filters, &ctx).unwrap().to_sql();
        assert_eq!(sql, r#"SELECT * FROM "customers" WHERE "customers"."id"::text = $1"#);
        assert_eq!(bindings, vec![SqlValue::from(uuid)]);

        // Relation injection from a uuid parent
        let inject = inject_from_parent("customerId".to_string(), "id".to_string());
        let parent = json!({ "id": uuid }).as_object().cloned().unwrap();
        let filters = inject(Some(&parent), QueryFilters::collection()).unwrap();
        let resolve = default_resolve(&entities[1], &entities);
        let (sql, _) = resolve(Some(&parent), &filters, &ctx).unwrap().to_sql();
        assert_eq!(sql, r#"SELECT * FROM "orders" WHERE "orders"."customer_id"::text = $1"#);
    }

    #[test]
    fn test_missing_parent_value_matches_nothing() {
        let inject = inject_from_parent("customerId".to_string(), "id".to_string());
        let filters = inject(None, QueryFilters::collection()).unwrap();
        assert_eq!(filters.custom["customerId"], json!([]));

        let parent = json!({"id": 4}).as_object().cloned().unwrap();
        let filters = inject(Some(&parent), QueryFilters::collection()).unwrap();
        assert_eq!(filters.custom["customerId"], json!(4));
    }
}
