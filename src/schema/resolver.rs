/// GraphQL resolver glue
///
/// Everything that touches async-graphql's dynamic resolver API lives here:
/// reading values off parent rows, decoding arguments into filters, reading
/// the selection set and the per-request user, and the shared collection
/// wrapper type `{count, countEstimate, records}`.

use crate::error::{DistraughtError, Result};
use crate::query::{Collection, QueryFilters, Row};
use crate::schema::context::{ExecutionContext, ObjectDirectory};
use crate::schema::helpers::AuthUser;
use crate::schema::selection::RequestedFields;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, ResolverContext, TypeRef};
use async_graphql::{ErrorExtensions, Name, Value};
use std::sync::Arc;

/// A boxed dynamic-schema resolver
pub type FieldResolver = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

/// Box a resolver closure, fixing its higher-ranked signature
pub fn field_resolver<F>(resolver: F) -> FieldResolver
where
    F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
{
    Arc::new(resolver)
}

/// Convert a crate error into a GraphQL error carrying `extensions.code`
pub fn graphql_error(err: DistraughtError) -> async_graphql::Error {
    err.extend()
}

/// Read `name` from the parent row.
///
/// With `stringify_ids`, numeric values are returned as strings so they
/// satisfy the `ID` type.
pub fn column_resolver(name: &str, stringify_ids: bool) -> FieldResolver {
    let name = name.to_string();
    field_resolver(move |ctx| {
        let name = name.clone();
        FieldFuture::new(async move {
            let value = parent_value(ctx.parent_value, &name);
            Ok(value.and_then(|value| to_field_value(value, stringify_ids)))
        })
    })
}

fn parent_value(parent: &FieldValue<'_>, name: &str) -> Option<serde_json::Value> {
    if let Some(row) = parent.downcast_ref::<Row>() {
        return row.get(name).cloned();
    }
    match parent.as_value() {
        Some(Value::Object(object)) => object
            .get(name)
            .cloned()
            .and_then(|value| value.into_json().ok()),
        _ => None,
    }
}

/// The parent row of the field being resolved, if the parent is a row
pub fn parent_row(ctx: &ResolverContext<'_>) -> Option<Row> {
    if let Some(row) = ctx.parent_value.downcast_ref::<Row>() {
        return Some(row.clone());
    }
    match ctx.parent_value.as_value() {
        Some(value @ Value::Object(_)) => match value.clone().into_json() {
            Ok(serde_json::Value::Object(row)) => Some(row),
            _ => None,
        },
        _ => None,
    }
}

/// Wrap a JSON value for output. Nested objects stay rows so that output
/// object fields can read them with [`column_resolver`].
pub fn to_field_value<'a>(value: serde_json::Value, stringify_ids: bool) -> Option<FieldValue<'a>> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Object(row) => Some(FieldValue::owned_any(row)),
        serde_json::Value::Array(items) => Some(FieldValue::list(items.into_iter().map(|item| {
            to_field_value(item, stringify_ids).unwrap_or(FieldValue::NULL)
        }))),
        serde_json::Value::Number(n) if stringify_ids => {
            Some(FieldValue::value(Value::String(n.to_string())))
        }
        other => Some(FieldValue::value(json_to_graphql_value(other))),
    }
}

pub fn json_to_graphql_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(async_graphql::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(json_to_graphql_value).collect())
        }
        serde_json::Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(k, v)| (Name::new(k), json_to_graphql_value(v)))
                .collect(),
        ),
    }
}

/// Field arguments as a JSON object keyed by argument name
pub fn decode_arguments(ctx: &ResolverContext<'_>) -> Result<Row> {
    let mut arguments = Row::new();
    for (name, value) in ctx.args.iter() {
        arguments.insert(name.to_string(), value.as_value().clone().into_json()?);
    }
    Ok(arguments)
}

pub fn decode_filters(ctx: &ResolverContext<'_>) -> Result<QueryFilters> {
    QueryFilters::from_arguments(decode_arguments(ctx)?)
}

pub fn requested_fields(ctx: &ResolverContext<'_>) -> RequestedFields {
    RequestedFields::from_selection(ctx.ctx.field())
}

/// The user attached to the request, if any
pub fn request_user(ctx: &ResolverContext<'_>) -> Option<AuthUser> {
    ctx.ctx.data_opt::<AuthUser>().cloned()
}

pub fn execution_context<'a>(ctx: &ResolverContext<'a>) -> Result<&'a ExecutionContext> {
    ctx.ctx.data::<ExecutionContext>().map_err(|_| {
        DistraughtError::SchemaGeneration("Execution context missing from schema data".to_string())
    })
}

pub fn object_directory<'a>(ctx: &ResolverContext<'a>) -> Result<&'a ObjectDirectory> {
    ctx.ctx.data::<ObjectDirectory>().map_err(|_| {
        DistraughtError::SchemaGeneration("Object directory missing from schema data".to_string())
    })
}

/// `{count, countEstimate, records}` for `object_name`
pub fn collection_wrapper(name: &str, object_name: &str) -> Object {
    Object::new(name)
        .description(format!("A collection of {} records", object_name))
        .field(
            Field::new("count", TypeRef::named(TypeRef::INT), |ctx| {
                FieldFuture::new(async move {
                    let collection = ctx.parent_value.try_downcast_ref::<Collection>()?;
                    Ok(collection.count.map(|n| FieldValue::value(Value::Number(n.into()))))
                })
            })
            .description("Count of all records that match user-specified filters"),
        )
        .field(
            Field::new("countEstimate", TypeRef::named(TypeRef::INT), |ctx| {
                FieldFuture::new(async move {
                    let collection = ctx.parent_value.try_downcast_ref::<Collection>()?;
                    Ok(collection
                        .count_estimate
                        .map(|n| FieldValue::value(Value::Number(n.into()))))
                })
            })
            .description("Count estimate of all records that match user-specified filters"),
        )
        .field(
            Field::new("records", TypeRef::named_list(object_name), |ctx| {
                FieldFuture::new(async move {
                    let collection = ctx.parent_value.try_downcast_ref::<Collection>()?;
                    let records = collection.records.iter().cloned().map(FieldValue::owned_any);
                    Ok(Some(FieldValue::list(records)))
                })
            })
            .description("A list of records matching the user-specified filters"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_graphql_value() {
        let value = json_to_graphql_value(json!({"a": 1, "b": [true, null], "c": 1.5, "d": "x"}));
        let Value::Object(object) = value else {
            panic!("Expected Value::Object");
        };
        assert_eq!(object.get("a").unwrap(), &Value::Number(1.into()));
        assert_eq!(
            object.get("b").unwrap(),
            &Value::List(vec![Value::Boolean(true), Value::Null])
        );
        assert_eq!(object.get("d").unwrap(), &Value::String("x".to_string()));
    }

    #[test]
    fn test_to_field_value_ids_become_strings() {
        let value = to_field_value(json!(42), true).unwrap();
        assert_eq!(value.as_value(), Some(&Value::String("42".to_string())));

        let value = to_field_value(json!(42), false).unwrap();
        assert_eq!(value.as_value(), Some(&Value::Number(42.into())));

        assert!(to_field_value(serde_json::Value::Null, true).is_none());
    }

    #[test]
    fn test_to_field_value_keeps_nested_rows() {
        let value = to_field_value(json!({"street": "Main"}), false).unwrap();
        let row = value.downcast_ref::<Row>().unwrap();
        assert_eq!(row.get("street"), Some(&json!("Main")));
    }

    #[test]
    fn test_parent_value_reads_rows_and_values() {
        let row = json!({"name": "Ada"}).as_object().cloned().unwrap();
        let owned = FieldValue::owned_any(row);
        assert_eq!(parent_value(&owned, "name"), Some(json!("Ada")));
        assert_eq!(parent_value(&owned, "missing"), None);

        let plain = FieldValue::value(json_to_graphql_value(json!({"name": "Bo"})));
        assert_eq!(parent_value(&plain, "name"), Some(json!("Bo")));
    }
}
