/// Query adapter
///
/// Turns a base query plus caller filters into either a single record or a
/// paginated collection `{records, count, countEstimate}`. Count and
/// count-estimate statements are only issued when asked for, and all
/// statements for one collection run concurrently.

use crate::error::Result;
use crate::query::builder::{QueryBuilder, SqlValue};
use crate::query::database::Database;
use crate::query::filters::{CountOptions, QueryFilters, Row, SortDirection};

use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};

/// A page of records plus optional totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub records: Vec<Row>,
    pub count: Option<i64>,
    pub count_estimate: Option<i64>,
}

/// The result of one resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultEnvelope {
    Record(Option<Row>),
    Collection(Collection),
}

impl ResultEnvelope {
    /// First record of the result, whatever its shape
    pub fn into_first(self) -> Option<Row> {
        match self {
            ResultEnvelope::Record(row) => row,
            ResultEnvelope::Collection(collection) => collection.records.into_iter().next(),
        }
    }

    /// View the result as a collection; a single record becomes a page of
    /// at most one row without totals.
    pub fn into_collection(self) -> Collection {
        match self {
            ResultEnvelope::Collection(collection) => collection,
            ResultEnvelope::Record(row) => Collection {
                records: row.into_iter().collect(),
                count: None,
                count_estimate: None,
            },
        }
    }
}

/// Convert every key of a row to camelCase
pub fn camelize_row(row: Row) -> Row {
    row.into_iter()
        .map(|(key, value)| (key.to_lower_camel_case(), value))
        .collect()
}

/// Build and execute the statements for one resolution.
///
/// `columns` is applied as a projection on the record query only.
/// Database errors are returned as-is; nothing is retried.
pub async fn run_query(
    db: &dyn Database,
    filters: &QueryFilters,
    query: &QueryBuilder,
    columns: Option<&[String]>,
    count_options: CountOptions,
) -> Result<ResultEnvelope> {
    if !filters.is_collection {
        let mut record_query = query.clone().limit(1).offset(0);
        if let Some(columns) = columns {
            record_query.push_columns(columns);
        }

        let (sql, bindings) = record_query.to_sql();
        let row = db.fetch_rows(&sql, &bindings).await?.into_iter().next();
        return Ok(ResultEnvelope::Record(row.map(camelize_row)));
    }

    // Derive aggregates before pagination, sort and projection touch the query
    let count_query = query.clone().count_only();
    let estimate_query = query.clone();

    let mut record_query = query.clone();
    if let Some(sort_column) = filters.sort_column() {
        record_query = match filters.sort_dir {
            Some(SortDirection::Desc) => record_query.order_by_desc_nulls_last(sort_column),
            _ => record_query.order_by(sort_column, SortDirection::Asc),
        };
    }
    if let Some(columns) = columns {
        record_query.push_columns(columns);
    }
    let record_query = record_query
        .limit(filters.effective_limit())
        .offset(filters.effective_offset());

    let records = async {
        let (sql, bindings) = record_query.to_sql();
        db.fetch_rows(&sql, &bindings).await
    };

    let count = fetch_count(db, &count_query, count_options.with_count);
    let count_estimate =
        fetch_count_estimate(db, &estimate_query, count_options.with_count_estimate);

    let (records, count, count_estimate) = tokio::try_join!(records, count, count_estimate)?;

    Ok(ResultEnvelope::Collection(Collection {
        records: records.into_iter().map(camelize_row).collect(),
        count,
        count_estimate,
    }))
}

async fn fetch_count(db: &dyn Database, query: &QueryBuilder, enabled: bool) -> Result<Option<i64>> {
    if !enabled {
        return Ok(None);
    }
    let (sql, bindings) = query.to_sql();
    let rows = db.fetch_rows(&sql, &bindings).await?;
    Ok(Some(first_integer(&rows, "count")))
}

/// Planner-based estimate via the `count_estimate(text)` database function
async fn fetch_count_estimate(
    db: &dyn Database,
    query: &QueryBuilder,
    enabled: bool,
) -> Result<Option<i64>> {
    if !enabled {
        return Ok(None);
    }
    let inner = SqlValue::Text(query.to_inline_sql());
    let rows = db
        .fetch_rows("SELECT count_estimate($1) AS count_estimate", &[inner])
        .await?;
    Ok(Some(first_integer(&rows, "count_estimate")))
}

/// Read an integer column from the first row; missing or null reads as 0
fn first_integer(rows: &[Row], column: &str) -> i64 {
    rows.first()
        .and_then(|row| row.get(column))
        .and_then(|value| match value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or(0)
}
