#![allow(dead_code)]

/// Test doubles shared by the integration tests

use async_trait::async_trait;
use distraught::error::{DistraughtError, Result};
use distraught::query::{Database, Row, SqlValue};
use std::sync::{Arc, Mutex};

type Responder = Arc<dyn Fn(&str, &[SqlValue]) -> Result<Vec<Row>> + Send + Sync>;

/// A `Database` that records every statement and answers with `responder`
#[derive(Clone)]
pub struct MockDatabase {
    calls: Arc<Mutex<Vec<(String, Vec<SqlValue>)>>>,
    responder: Responder,
}

impl MockDatabase {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &[SqlValue]) -> Result<Vec<Row>> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            responder: Arc::new(responder),
        }
    }

    /// Answers every statement with no rows
    pub fn empty() -> Self {
        Self::new(|_, _| Ok(Vec::new()))
    }

    /// Fails every statement the way an exhausted pool does
    pub fn failing() -> Self {
        Self::new(|_, _| Err(DistraughtError::Database(sqlx::Error::PoolTimedOut)))
    }

    pub fn calls(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.calls().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Database for MockDatabase {
    async fn fetch_rows(&self, sql: &str, bindings: &[SqlValue]) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings.to_vec()));
        (self.responder)(sql, bindings)
    }
}

pub fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("row must be a JSON object")
}

/// Parse `LIMIT n` / `OFFSET n` out of a rendered statement
pub fn clause(sql: &str, keyword: &str) -> Option<usize> {
    let start = sql.find(keyword)? + keyword.len();
    sql[start..]
        .trim_start()
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

/// An in-memory table answering the statements `run_query` issues: counts,
/// and `ORDER BY <sort_column> ... LIMIT ... OFFSET ...` over `rows`
pub fn table_responder(
    rows: Vec<Row>,
    sort_column: &'static str,
) -> impl Fn(&str, &[SqlValue]) -> Result<Vec<Row>> + Send + Sync + 'static {
    move |sql, _bindings| {
        if sql.starts_with("SELECT count(*)") {
            return Ok(vec![row(serde_json::json!({ "count": rows.len() }))]);
        }
        if sql.starts_with("SELECT count_estimate") {
            return Ok(vec![row(serde_json::json!({ "count_estimate": rows.len() + 3 }))]);
        }

        let mut result = rows.clone();
        let key = |r: &Row| r.get(sort_column).and_then(|v| v.as_str().map(str::to_string));
        if sql.contains("DESC NULLS LAST") {
            // Descending, NULLs after every value
            result.sort_by(|a, b| match (key(a), key(b)) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        } else if sql.contains(" ASC") {
            result.sort_by_key(|r| key(r));
        }

        let offset = clause(sql, "OFFSET").unwrap_or(0);
        let limit = clause(sql, "LIMIT").unwrap_or(usize::MAX);
        Ok(result.into_iter().skip(offset).take(limit).collect())
    }
}
