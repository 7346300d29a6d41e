/// Chainable SELECT builder for Postgres
///
/// `QueryBuilder` is a plain value: cloning it yields an independent query,
/// which is how the adapter derives count and count-estimate statements
/// from the same base query without one leaking into another.

use crate::query::filters::{Row, SortDirection};

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Postgres type a string parameter is cast to at its placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PgCast {
    Date,
    Timestamptz,
    Json,
}

impl PgCast {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PgCast::Date => "date",
            PgCast::Timestamptz => "timestamptz",
            PgCast::Json => "json",
        }
    }
}

/// A bind parameter.
///
/// Strings are sent as `TEXT`. Columns of another type need either a
/// `Cast` value, rendered as `$n::<type>`, or an ID comparison through
/// [`QueryBuilder::where_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Cast { value: String, cast: PgCast },
}

impl SqlValue {
    /// Convert a JSON value into a bind parameter.
    ///
    /// Arrays and objects are bound as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    /// GraphQL IDs arrive as strings; integer-looking ones are bound as BIGINT
    pub fn from_id(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(i) => SqlValue::Int(i),
            Err(_) => SqlValue::Text(id.to_string()),
        }
    }

    /// A string cast to `cast`; anything else is bound as-is
    pub fn cast_json(value: &serde_json::Value, cast: PgCast) -> Self {
        match value {
            serde_json::Value::String(s) => SqlValue::Cast {
                value: s.clone(),
                cast,
            },
            other => SqlValue::from_json(other),
        }
    }

    /// Render as an inline SQL literal
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => quote_literal(s),
            SqlValue::Cast { value, cast } => format!("{}::{}", quote_literal(value), cast.as_sql()),
        }
    }

    /// Suffix appended to this value's `$n` placeholder
    fn placeholder_cast(&self) -> String {
        match self {
            SqlValue::Cast { cast, .. } => format!("::{}", cast.as_sql()),
            _ => String::new(),
        }
    }

    /// The value as text, for comparing against `column::text`
    fn into_text(self) -> SqlValue {
        match self {
            SqlValue::Int(i) => SqlValue::Text(i.to_string()),
            SqlValue::Float(f) => SqlValue::Text(f.to_string()),
            SqlValue::Bool(b) => SqlValue::Text(b.to_string()),
            SqlValue::Cast { value, .. } => SqlValue::Text(value),
            other => other,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value as i64)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

/// Comparison operators accepted by `where_op`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    ILike,
}

impl Op {
    fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "<>",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => "LIKE",
            Op::ILike => "ILIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Column(String),
    Raw(String),
}

/// Column side of a comparison; `as_text` renders `column::text`
#[derive(Debug, Clone, PartialEq)]
struct Target {
    column: String,
    as_text: bool,
}

impl Target {
    fn plain(column: String) -> Self {
        Self { column, as_text: false }
    }

    fn to_sql(&self) -> String {
        if self.as_text {
            format!("{}::text", quote_identifier(&self.column))
        } else {
            quote_identifier(&self.column)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare { target: Target, op: Op, value: SqlValue },
    In { target: Target, values: Vec<SqlValue> },
    Null { column: String, negated: bool },
    Raw { sql: String, bindings: Vec<SqlValue> },
}

#[derive(Debug, Clone, PartialEq)]
enum Ordering {
    Column { column: String, direction: SortDirection },
    DescNullsLast { column: String },
}

/// Chainable, clonable SELECT query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    table: String,
    selections: Vec<Selection>,
    conditions: Vec<Condition>,
    orderings: Vec<Ordering>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    /// Start a query against `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selections: Vec::new(),
            conditions: Vec::new(),
            orderings: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Append columns to the select list.
    ///
    /// Entries containing `(` or whitespace are treated as raw expressions,
    /// everything else as a (possibly table-qualified) identifier.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_columns(columns);
        self
    }

    /// Alias of [`QueryBuilder::columns`]
    pub fn select<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns(columns)
    }

    pub fn push_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref();
            if column.contains('(') || column.contains(char::is_whitespace) {
                self.selections.push(Selection::Raw(column.to_string()));
            } else {
                self.selections.push(Selection::Column(column.to_string()));
            }
        }
    }

    pub fn select_raw(mut self, expression: impl Into<String>) -> Self {
        self.push_select_raw(expression);
        self
    }

    pub fn push_select_raw(&mut self, expression: impl Into<String>) {
        self.selections.push(Selection::Raw(expression.into()));
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.where_op(column, Op::Eq, value)
    }

    pub fn where_op(mut self, column: impl Into<String>, op: Op, value: impl Into<SqlValue>) -> Self {
        self.conditions.push(Condition::Compare {
            target: Target::plain(column.into()),
            op,
            value: value.into(),
        });
        self
    }

    /// Equality on an ID column of unknown Postgres type.
    ///
    /// Integer values compare directly. Anything else compares against
    /// `column::text`, which matches uuid and text keys alike.
    pub fn where_id(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        let as_text = !matches!(value, SqlValue::Int(_));
        let value = if as_text { value.into_text() } else { value };
        self.conditions.push(Condition::Compare {
            target: Target {
                column: column.into(),
                as_text,
            },
            op: Op::Eq,
            value,
        });
        self
    }

    /// `IN` on an ID column; see [`QueryBuilder::where_id`]
    pub fn where_id_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        let as_text = values.iter().any(|v| !matches!(v, SqlValue::Int(_)));
        let values = if as_text {
            values.into_iter().map(SqlValue::into_text).collect()
        } else {
            values
        };
        self.conditions.push(Condition::In {
            target: Target {
                column: column.into(),
                as_text,
            },
            values,
        });
        self
    }

    pub fn where_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.conditions.push(Condition::In {
            target: Target::plain(column.into()),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::Null {
            column: column.into(),
            negated: false,
        });
        self
    }

    pub fn where_not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition::Null {
            column: column.into(),
            negated: true,
        });
        self
    }

    /// Raw condition; `?` marks each binding in order
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        self.conditions.push(Condition::Raw {
            sql: sql.into(),
            bindings,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.orderings.push(Ordering::Column {
            column: column.into(),
            direction,
        });
        self
    }

    /// `ORDER BY column DESC NULLS LAST`
    pub fn order_by_desc_nulls_last(mut self, column: impl Into<String>) -> Self {
        self.orderings.push(Ordering::DescNullsLast {
            column: column.into(),
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Replace the projection with `count(*) AS count`, drop ordering and
    /// restrict to a single row.
    pub fn count_only(mut self) -> Self {
        self.selections = vec![Selection::Raw("count(*) AS count".to_string())];
        self.orderings.clear();
        self.limit = Some(1);
        self.offset = Some(0);
        self
    }

    pub fn selected_columns(&self) -> Vec<String> {
        self.selections
            .iter()
            .map(|s| match s {
                Selection::Column(c) | Selection::Raw(c) => c.clone(),
            })
            .collect()
    }

    /// Render with `$n` placeholders and the matching bind list
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut bindings = Vec::new();
        let sql = self.render(&mut |value: &SqlValue| {
            bindings.push(value.clone());
            format!("${}{}", bindings.len(), value.placeholder_cast())
        });
        (sql, bindings)
    }

    /// Render with literals inlined, for handing SQL text to a database function
    pub fn to_inline_sql(&self) -> String {
        self.render(&mut |value: &SqlValue| value.to_literal())
    }

    fn render(&self, bind: &mut dyn FnMut(&SqlValue) -> String) -> String {
        let mut sql = String::from("SELECT ");

        if self.selections.is_empty() {
            sql.push('*');
        } else {
            let list: Vec<String> = self
                .selections
                .iter()
                .map(|s| match s {
                    Selection::Column(c) => quote_identifier(c),
                    Selection::Raw(r) => r.clone(),
                })
                .collect();
            sql.push_str(&list.join(", "));
        }

        let _ = write!(sql, " FROM {}", quote_identifier(&self.table));

        if !self.conditions.is_empty() {
            let mut parts = Vec::with_capacity(self.conditions.len());
            for condition in &self.conditions {
                let part = match condition {
                    Condition::Compare { target, op, value } => {
                        format!("{} {} {}", target.to_sql(), op.as_sql(), bind(value))
                    }
                    Condition::In { target, values } => {
                        if values.is_empty() {
                            "FALSE".to_string()
                        } else {
                            let placeholders: Vec<String> = values.iter().map(|v| bind(v)).collect();
                            format!("{} IN ({})", target.to_sql(), placeholders.join(", "))
                        }
                    }
                    Condition::Null { column, negated } => {
                        if *negated {
                            format!("{} IS NOT NULL", quote_identifier(column))
                        } else {
                            format!("{} IS NULL", quote_identifier(column))
                        }
                    }
                    Condition::Raw { sql, bindings } => {
                        let mut rendered = String::with_capacity(sql.len());
                        let mut pending = bindings.iter();
                        for ch in sql.chars() {
                            if ch == '?' {
                                if let Some(value) = pending.next() {
                                    rendered.push_str(&bind(value));
                                    continue;
                                }
                            }
                            rendered.push(ch);
                        }
                        format!("({})", rendered)
                    }
                };
                parts.push(part);
            }
            let _ = write!(sql, " WHERE {}", parts.join(" AND "));
        }

        if !self.orderings.is_empty() {
            let parts: Vec<String> = self
                .orderings
                .iter()
                .map(|o| match o {
                    Ordering::Column { column, direction } => {
                        format!("{} {}", quote_identifier(column), direction.as_sql())
                    }
                    Ordering::DescNullsLast { column } => {
                        format!("{} DESC NULLS LAST", quote_identifier(column))
                    }
                })
                .collect();
            let _ = write!(sql, " ORDER BY {}", parts.join(", "));
        }

        if let Some(limit) = self.limit {
            let _ = write!(sql, " LIMIT {}", limit);
        }
        if let Some(offset) = self.offset {
            let _ = write!(sql, " OFFSET {}", offset);
        }

        sql
    }
}

/// Quote each dotted segment of an identifier; `*` stays bare
pub fn quote_identifier(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|segment| {
            if segment == "*" {
                segment.to_string()
            } else {
                format!("\"{}\"", segment.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The row as one JSON parameter; `json_populate_record` gives every
/// value its column's type
fn row_binding(row: &Row) -> SqlValue {
    SqlValue::Cast {
        value: serde_json::Value::Object(row.clone()).to_string(),
        cast: PgCast::Json,
    }
}

/// `INSERT INTO table (...) SELECT ... FROM json_populate_record(...) RETURNING *`
pub fn insert_returning(table: &str, row: &Row) -> (String, Vec<SqlValue>) {
    let table = quote_identifier(table);
    let columns: Vec<String> = row.keys().map(|k| quote_identifier(k)).collect();
    let columns = columns.join(", ");

    let sql = format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM json_populate_record(NULL::{table}, $1::json) RETURNING *"
    );
    (sql, vec![row_binding(row)])
}

/// `UPDATE table SET ... FROM json_populate_record(...) WHERE id_column = id RETURNING table.*`
///
/// `id` follows [`QueryBuilder::where_id`]: non-integer keys compare as text.
pub fn update_returning(
    table: &str,
    id_column: &str,
    id: SqlValue,
    row: &Row,
) -> (String, Vec<SqlValue>) {
    let assignments: Vec<String> = row
        .keys()
        .map(|column| {
            let column = quote_identifier(column);
            format!("{column} = \"r\".{column}")
        })
        .collect();

    let key = quote_identifier(&format!("{}.{}", table, id_column));
    let (key, id) = match id {
        SqlValue::Int(i) => (key, SqlValue::Int(i)),
        other => (format!("{}::text", key), other.into_text()),
    };

    let table = quote_identifier(table);
    let sql = format!(
        "UPDATE {table} SET {} FROM json_populate_record(NULL::{table}, $1::json) AS \"r\" WHERE {key} = $2 RETURNING {table}.*",
        assignments.join(", ")
    );
    (sql, vec![row_binding(row), id])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star_by_default() {
        let (sql, bindings) = QueryBuilder::table("users").to_sql();
        assert_eq!(sql, "SELECT * FROM \"users\"");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_columns_and_conditions() {
        let query = QueryBuilder::table("users")
            .columns(["users.id", "users.first_name"])
            .where_eq("status", "active")
            .where_op("age", Op::Gte, 18)
            .where_null("deleted_at")
            .limit(10)
            .offset(20);

        let (sql, bindings) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT \"users\".\"id\", \"users\".\"first_name\" FROM \"users\" \
             WHERE \"status\" = $1 AND \"age\" >= $2 AND \"deleted_at\" IS NULL LIMIT 10 OFFSET 20"
        );
        assert_eq!(bindings, vec![SqlValue::from("active"), SqlValue::Int(18)]);
    }

    #[test]
    fn test_raw_column_detection() {
        let query = QueryBuilder::table("users")
            .columns(["(SELECT count(*) FROM orders o WHERE o.user_id = users.id) AS order_count"]);
        let (sql, _) = query.to_sql();
        assert!(sql.starts_with("SELECT (SELECT count(*) FROM orders"));
    }

    #[test]
    fn test_where_raw_numbers_placeholders_after_previous_bindings() {
        let query = QueryBuilder::table("posts")
            .where_eq("author_id", 7)
            .where_raw("title ILIKE ? OR body ILIKE ?", vec!["%a%".into(), "%b%".into()]);
        let (sql, bindings) = query.to_sql();
        assert!(sql.ends_with("WHERE \"author_id\" = $1 AND (title ILIKE $2 OR body ILIKE $3)"));
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn test_where_in_empty_is_false() {
        let query = QueryBuilder::table("t").where_in("id", Vec::<i64>::new());
        assert_eq!(query.to_sql().0, "SELECT * FROM \"t\" WHERE FALSE");
    }

    #[test]
    fn test_desc_nulls_last() {
        let query = QueryBuilder::table("events").order_by_desc_nulls_last("created_at");
        assert_eq!(
            query.to_sql().0,
            "SELECT * FROM \"events\" ORDER BY \"created_at\" DESC NULLS LAST"
        );
    }

    #[test]
    fn test_count_only_replaces_projection() {
        let query = QueryBuilder::table("events")
            .columns(["id"])
            .where_eq("kind", "click")
            .order_by("id", SortDirection::Asc)
            .limit(50)
            .offset(100)
            .count_only();
        assert_eq!(
            query.to_sql().0,
            "SELECT count(*) AS count FROM \"events\" WHERE \"kind\" = $1 LIMIT 1 OFFSET 0"
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let base = QueryBuilder::table("events").where_eq("kind", "click");
        let paged = base.clone().limit(5);
        assert_ne!(base, paged);
        assert!(!base.to_sql().0.contains("LIMIT"));
    }

    #[test]
    fn test_inline_sql_escapes_quotes() {
        let query = QueryBuilder::table("users").where_eq("name", "O'Brien");
        assert_eq!(
            query.to_inline_sql(),
            "SELECT * FROM \"users\" WHERE \"name\" = 'O''Brien'"
        );
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users.*"), "\"users\".*");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_insert_and_update_returning() {
        let mut row = Row::new();
        row.insert("first_name".to_string(), serde_json::json!("Ada"));
        row.insert("age".to_string(), serde_json::json!(36));

        let (sql, bindings) = insert_returning("users", &row);
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"first_name\", \"age\") SELECT \"first_name\", \"age\" \
             FROM json_populate_record(NULL::\"users\", $1::json) RETURNING *"
        );
        assert_eq!(
            bindings,
            vec![SqlValue::Cast {
                value: r#"{"first_name":"Ada","age":36}"#.to_string(),
                cast: PgCast::Json,
            }]
        );

        let (sql, bindings) = update_returning("users", "id", SqlValue::Int(3), &row);
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"first_name\" = \"r\".\"first_name\", \"age\" = \"r\".\"age\" \
             FROM json_populate_record(NULL::\"users\", $1::json) AS \"r\" \
             WHERE \"users\".\"id\" = $2 RETURNING \"users\".*"
        );
        assert_eq!(bindings.last(), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn test_update_by_uuid_compares_as_text() {
        let mut row = Row::new();
        row.insert("email".to_string(), serde_json::json!("a@example.com"));

        let id = SqlValue::from_id("5f0c6e2a-1b7d-4c1e-9a43-2d1f0b6c9e11");
        let (sql, bindings) = update_returning("customers", "id", id, &row);
        assert!(sql.contains("WHERE \"customers\".\"id\"::text = $2"));
        assert_eq!(
            bindings[1],
            SqlValue::from("5f0c6e2a-1b7d-4c1e-9a43-2d1f0b6c9e11")
        );
    }

    #[test]
    fn test_cast_placeholders() {
        let query = QueryBuilder::table("orders")
            .where_eq("placed_on", SqlValue::cast_json(&serde_json::json!("2024-01-05"), PgCast::Date))
            .where_in(
                "shipped_at",
                [SqlValue::cast_json(&serde_json::json!("2024-01-05T10:00:00Z"), PgCast::Timestamptz)],
            );
        let (sql, bindings) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"orders\" WHERE \"placed_on\" = $1::date AND \"shipped_at\" IN ($2::timestamptz)"
        );
        assert_eq!(
            bindings[0],
            SqlValue::Cast {
                value: "2024-01-05".to_string(),
                cast: PgCast::Date
            }
        );
        assert_eq!(
            query.to_inline_sql(),
            "SELECT * FROM \"orders\" WHERE \"placed_on\" = '2024-01-05'::date \
             AND \"shipped_at\" IN ('2024-01-05T10:00:00Z'::timestamptz)"
        );
    }

    #[test]
    fn test_where_id() {
        let (sql, bindings) = QueryBuilder::table("orders").where_id("orders.id", "A-3").to_sql();
        assert_eq!(sql, "SELECT * FROM \"orders\" WHERE \"orders\".\"id\"::text = $1");
        assert_eq!(bindings, vec![SqlValue::from("A-3")]);

        let (sql, bindings) = QueryBuilder::table("orders")
            .where_id("orders.id", SqlValue::from_id("3"))
            .to_sql();
        assert_eq!(sql, "SELECT * FROM \"orders\" WHERE \"orders\".\"id\" = $1");
        assert_eq!(bindings, vec![SqlValue::Int(3)]);

        let uuid = "5f0c6e2a-1b7d-4c1e-9a43-2d1f0b6c9e11";
        let (sql, bindings) = QueryBuilder::table("customers")
            .where_id("customers.id", SqlValue::from_id(uuid))
            .to_sql();
        assert_eq!(sql, "SELECT * FROM \"customers\" WHERE \"customers\".\"id\"::text = $1");
        assert_eq!(bindings, vec![SqlValue::from(uuid)]);

        let (sql, bindings) = QueryBuilder::table("orders")
            .where_id_in("customer_id", [SqlValue::Int(1), SqlValue::from(uuid)])
            .to_sql();
        assert_eq!(sql, "SELECT * FROM \"orders\" WHERE \"customer_id\"::text IN ($1, $2)");
        assert_eq!(bindings, vec![SqlValue::from("1"), SqlValue::from(uuid)]);
    }

    #[test]
    fn test_id_binding() {
        assert_eq!(SqlValue::from_id("42"), SqlValue::Int(42));
        assert_eq!(SqlValue::from_id("abc"), SqlValue::from("abc"));
    }
}
