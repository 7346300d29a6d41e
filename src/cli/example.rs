use distraught::config::{ColumnConfig, ColumnKind, EntityConfig, RelationConfig, RelationKind};

/// Table metadata for each example table
struct TableMetadata {
    table: &'static str,
    graphql_name: &'static str,
    description: &'static str,
    columns: &'static [(&'static str, ColumnKind, bool)],
    filters: &'static [&'static str],
    cache_ttl_ms: Option<u64>,
}

/// Relation metadata: `(parent, field, child entity, kind, child column, parent field)`
type RelationMetadata = (
    &'static str,
    &'static str,
    &'static str,
    RelationKind,
    &'static str,
    &'static str,
);

/// Create example entities for a small shop: customers, their orders and
/// the items of each order
pub fn create_example_entities() -> Vec<EntityConfig> {
    let relations = get_relation_metadata();

    get_table_metadata()
        .into_iter()
        .map(|table| {
            let relation = relations
                .iter()
                .filter(|(parent, ..)| *parent == table.graphql_name)
                .map(|(_, field, entity, kind, child_column, parent_field)| RelationConfig {
                    field: field.to_string(),
                    entity: entity.to_string(),
                    kind: *kind,
                    child_column: child_column.to_string(),
                    parent_field: parent_field.to_string(),
                })
                .collect();

            tracing::debug!("Example entity {} over {}", table.graphql_name, table.table);

            EntityConfig {
                graphql_name: table.graphql_name.to_string(),
                table: table.table.to_string(),
                primary_key: "id".to_string(),
                description: Some(table.description.to_string()),
                columns: table
                    .columns
                    .iter()
                    .map(|(name, kind, required)| ColumnConfig {
                        name: name.to_string(),
                        kind: *kind,
                        required: *required,
                        description: None,
                    })
                    .collect(),
                filters: table.filters.iter().map(|f| f.to_string()).collect(),
                allowed_roles: None,
                allowed_environments: None,
                cache_ttl_ms: table.cache_ttl_ms,
                relation,
            }
        })
        .collect()
}

fn get_table_metadata() -> Vec<TableMetadata> {
    vec![
        TableMetadata {
            table: "customers",
            graphql_name: "Customer",
            description: "People who place orders.",
            columns: &[
                ("id", ColumnKind::Id, true),
                ("email", ColumnKind::String, true),
                ("first_name", ColumnKind::String, false),
                ("last_name", ColumnKind::String, false),
                ("created_at", ColumnKind::Datetime, false),
            ],
            filters: &["email"],
            cache_ttl_ms: None,
        },
        TableMetadata {
            table: "orders",
            graphql_name: "Order",
            description: "A purchase made by a customer.",
            columns: &[
                ("id", ColumnKind::Id, true),
                ("customer_id", ColumnKind::Int, true),
                ("status", ColumnKind::String, false),
                ("total", ColumnKind::Float, false),
                ("placed_on", ColumnKind::Date, false),
            ],
            filters: &["status", "customer_id"],
            cache_ttl_ms: Some(60_000),
        },
        TableMetadata {
            table: "order_items",
            graphql_name: "OrderItem",
            description: "One product line of an order.",
            columns: &[
                ("id", ColumnKind::Id, true),
                ("order_id", ColumnKind::Int, true),
                ("sku", ColumnKind::String, true),
                ("quantity", ColumnKind::Int, false),
                ("gift", ColumnKind::Bool, false),
            ],
            filters: &["sku"],
            cache_ttl_ms: None,
        },
    ]
}

fn get_relation_metadata() -> Vec<RelationMetadata> {
    vec![
        ("Customer", "orders", "Order", RelationKind::Collection, "customer_id", "id"),
        ("Order", "customer", "Customer", RelationKind::Record, "id", "customer_id"),
        ("Order", "items", "OrderItem", RelationKind::Collection, "order_id", "id"),
    ]
}
