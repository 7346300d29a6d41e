use async_graphql::ErrorExtensions;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistraughtError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Schema generation error: {0}")]
    SchemaGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DistraughtError {
    /// Machine-readable code placed in the GraphQL error extensions.
    pub fn code(&self) -> &'static str {
        match self {
            DistraughtError::Config(_) => "CONFIGURATION_ERROR",
            DistraughtError::Unauthorized(_) => "UNAUTHORIZED",
            DistraughtError::NotImplemented(_) => "NOT_IMPLEMENTED",
            DistraughtError::InvalidArgument(_) => "BAD_USER_INPUT",
            DistraughtError::Database(_) => "DATABASE_ERROR",
            DistraughtError::Cache(_) => "CACHE_ERROR",
            DistraughtError::SchemaGeneration(_) => "SCHEMA_ERROR",
            DistraughtError::Io(_) => "IO_ERROR",
            DistraughtError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl ErrorExtensions for DistraughtError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

impl From<redis::RedisError> for DistraughtError {
    fn from(err: redis::RedisError) -> Self {
        DistraughtError::Cache(format!("Redis error: {}", err))
    }
}

impl From<deadpool_redis::PoolError> for DistraughtError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        DistraughtError::Cache(format!("Redis pool error: {}", err))
    }
}

impl From<serde_json::Error> for DistraughtError {
    fn from(err: serde_json::Error) -> Self {
        DistraughtError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for DistraughtError {
    fn from(err: config::ConfigError) -> Self {
        DistraughtError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for DistraughtError {
    fn from(err: toml::de::Error) -> Self {
        DistraughtError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for DistraughtError {
    fn from(err: toml::ser::Error) -> Self {
        DistraughtError::Serialization(format!("TOML serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DistraughtError>;
