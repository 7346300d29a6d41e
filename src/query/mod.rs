/// SQL side of the toolkit
///
/// A small chainable query builder, the per-request filter/option types,
/// the database handle and the adapter that executes record and collection
/// queries.

pub mod adapter;
pub mod builder;
pub mod database;
pub mod filters;

pub use adapter::{camelize_row, run_query, Collection, ResultEnvelope};
pub use builder::{insert_returning, quote_identifier, update_returning, Op, PgCast, QueryBuilder, SqlValue};
pub use database::{Database, PgDatabase};
pub use filters::{
    CountOptions, QueryFilters, QueryOptions, ResolvedQuery, Row, SortDirection, Transform,
    MAX_LIMIT,
};
