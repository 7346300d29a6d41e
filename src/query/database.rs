/// Database handle used by the query adapter
///
/// The adapter only needs to run a parameterized SELECT and get rows back
/// as JSON objects, so that is the whole trait. `PgDatabase` is the real
/// implementation over a sqlx connection pool.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::query::builder::SqlValue;
use crate::query::filters::Row;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

#[async_trait]
pub trait Database: Send + Sync {
    /// Execute `sql` with `$n` bindings and return every row
    async fn fetch_rows(&self, sql: &str, bindings: &[SqlValue]) -> Result<Vec<Row>>;
}

/// Postgres-backed [`Database`]
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pool from configuration and wrap it.
    ///
    /// Callers queue for a connection when the pool is saturated, up to the
    /// configured acquire timeout.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(
            "Connecting to Postgres (min {} / max {} connections)",
            config.min_connections,
            config.max_connections
        );

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn fetch_rows(&self, sql: &str, bindings: &[SqlValue]) -> Result<Vec<Row>> {
        // One JSON object per row, column order preserved. A CTE also
        // accepts INSERT/UPDATE ... RETURNING.
        let wrapped = format!("WITH q AS ({}) SELECT row_to_json(q) FROM q", sql);

        tracing::debug!("Executing query: {}", sql);

        let mut query = sqlx::query_scalar::<_, Json<serde_json::Value>>(&wrapped);
        for binding in bindings {
            query = match binding {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Int(i) => query.bind(*i),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
                // The placeholder carries the cast, the wire value stays text
                SqlValue::Cast { value, .. } => query.bind(value.clone()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .filter_map(|Json(value)| match value {
                serde_json::Value::Object(row) => Some(row),
                _ => None,
            })
            .collect())
    }
}
