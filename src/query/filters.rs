/// Per-request query inputs: filters, count options and resolve output

use crate::error::{DistraughtError, Result};
use crate::query::adapter::ResultEnvelope;
use crate::query::builder::QueryBuilder;
use crate::schema::RequestedFields;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A database row, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Used when a collection query does not specify `limit`
pub const MAX_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filters supplied by the caller for one resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_dir: Option<SortDirection>,
    #[serde(default)]
    pub is_collection: bool,
    /// Any argument that is not one of the well-known keys above
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub custom: IndexMap<String, serde_json::Value>,
}

impl QueryFilters {
    pub fn collection() -> Self {
        Self {
            is_collection: true,
            ..Default::default()
        }
    }

    /// Build filters from decoded GraphQL arguments
    pub fn from_arguments(arguments: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut filters = QueryFilters::default();

        for (key, value) in arguments {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "id" => {
                    filters.id = Some(match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    });
                }
                "limit" => filters.limit = Some(non_negative(&key, &value)?),
                "offset" => filters.offset = Some(non_negative(&key, &value)?),
                "sortName" => {
                    filters.sort_name = value.as_str().map(str::to_string);
                }
                "sortDir" => {
                    let raw = value.as_str().unwrap_or_default();
                    filters.sort_dir = Some(SortDirection::parse(raw).ok_or_else(|| {
                        DistraughtError::InvalidArgument(format!("Invalid sort direction '{}'", raw))
                    })?);
                }
                _ => {
                    filters.custom.insert(key, value);
                }
            }
        }

        Ok(filters)
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    /// Effective limit for a collection query
    pub fn effective_limit(&self) -> u64 {
        self.limit.unwrap_or(MAX_LIMIT)
    }

    pub fn effective_offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Sort column in snake_case, table qualification preserved
    pub fn sort_column(&self) -> Option<String> {
        self.sort_name.as_ref().map(|name| {
            name.split('.')
                .map(|segment| segment.to_snake_case())
                .collect::<Vec<_>>()
                .join(".")
        })
    }
}

fn non_negative(key: &str, value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| DistraughtError::InvalidArgument(format!("'{}' must be a non-negative integer", key)))
}

/// Which aggregate queries to run, derived from the requested fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountOptions {
    pub with_count: bool,
    pub with_count_estimate: bool,
}

impl CountOptions {
    pub fn from_fields(fields: &RequestedFields) -> Self {
        Self {
            with_count: fields.contains("count"),
            with_count_estimate: fields.contains("countEstimate"),
        }
    }
}

/// Post-processing applied to a result before it is returned (and cached)
pub type Transform = Arc<dyn Fn(ResultEnvelope) -> Result<ResultEnvelope> + Send + Sync>;

#[derive(Clone)]
pub struct QueryOptions {
    pub query: QueryBuilder,
    pub columns: Option<Vec<String>>,
    pub transform: Option<Transform>,
}

impl QueryOptions {
    pub fn new(query: QueryBuilder) -> Self {
        Self {
            query,
            columns: None,
            transform: None,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(ResultEnvelope) -> Result<ResultEnvelope> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("query", &self.query)
            .field("columns", &self.columns)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// What an object's `resolve` callback hands back
#[derive(Debug, Clone)]
pub enum ResolvedQuery {
    Raw(QueryBuilder),
    WithOptions(QueryOptions),
}

impl ResolvedQuery {
    pub fn into_options(self) -> QueryOptions {
        match self {
            ResolvedQuery::Raw(query) => QueryOptions::new(query),
            ResolvedQuery::WithOptions(options) => options,
        }
    }
}

impl From<QueryBuilder> for ResolvedQuery {
    fn from(query: QueryBuilder) -> Self {
        ResolvedQuery::Raw(query)
    }
}

impl From<QueryOptions> for ResolvedQuery {
    fn from(options: QueryOptions) -> Self {
        ResolvedQuery::WithOptions(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_arguments_splits_known_and_custom_keys() {
        let filters = QueryFilters::from_arguments(args(json!({
            "id": 12,
            "limit": 10,
            "offset": 5,
            "sortName": "createdAt",
            "sortDir": "DESC",
            "status": "open",
            "ignored": null
        })))
        .unwrap();

        assert_eq!(filters.id.as_deref(), Some("12"));
        assert_eq!(filters.limit, Some(10));
        assert_eq!(filters.offset, Some(5));
        assert_eq!(filters.sort_dir, Some(SortDirection::Desc));
        assert_eq!(filters.custom.len(), 1);
        assert_eq!(filters.custom["status"], json!("open"));
        assert!(!filters.is_collection);
    }

    #[test]
    fn test_negative_limit_rejected() {
        assert!(QueryFilters::from_arguments(args(json!({"limit": -1}))).is_err());
    }

    #[test]
    fn test_defaults() {
        let filters = QueryFilters::collection();
        assert_eq!(filters.effective_limit(), 1000);
        assert_eq!(filters.effective_offset(), 0);
    }

    #[test]
    fn test_sort_column_is_snake_cased() {
        let filters = QueryFilters {
            sort_name: Some("users.createdAt".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.sort_column().as_deref(), Some("users.created_at"));
    }

    #[test]
    fn test_resolved_query_into_options() {
        let options = ResolvedQuery::from(QueryBuilder::table("t")).into_options();
        assert!(options.columns.is_none());
        assert!(options.transform.is_none());
    }
}
