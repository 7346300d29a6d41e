pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use cache::Cache;
pub use config::{Config, DatabaseConfig, EntityConfig, ServerConfig};
pub use error::{DistraughtError, Result};
pub use query::{Database, PgDatabase, QueryBuilder, QueryFilters, ResolvedQuery, ResultEnvelope};
pub use schema::{AuthUser, ExecutionContext, ObjectSpec, SchemaBuilder, TypeRegistry};
