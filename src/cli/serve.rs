use distraught::cache::Cache;
use distraught::config::Config;
use distraught::error::{DistraughtError, Result};
use distraught::query::PgDatabase;
use distraught::schema::{ExecutionContext, SchemaBuilder};

use axum::{routing::get, routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Run the serve command to start the GraphQL server
pub async fn run(config_path: String, port: u16) -> Result<()> {
    tracing::info!("📖 Loading configuration from {}", config_path);

    let config = distraught::config::load_config(&config_path)?;

    // Use provided port or default from config
    let server_port = if port != 4000 { port } else { config.server.port };

    let exec = execution_context(&config).await?;

    tracing::info!("🔧 Building GraphQL schema for {} entities...", config.entity.len());

    let mut builder = SchemaBuilder::new();
    let schema = builder.build_schema(config.entity, exec)?;

    tracing::info!("✅ Schema built successfully");
    tracing::info!("🚀 GraphQL server running on http://{}:{}", config.server.bind, server_port);
    tracing::info!("📊 Playground: http://localhost:{}/graphql", server_port);
    tracing::info!("💡 Press Ctrl+C to stop the server");

    start_http_server(schema, &config.server.bind, server_port).await
}

/// Connect the pool and the optional cache
async fn execution_context(config: &Config) -> Result<ExecutionContext> {
    let db = PgDatabase::connect(&config.database).await?;
    let mut exec = ExecutionContext::new(Arc::new(db)).with_environment(&config.environment);

    match &config.cache {
        Some(cache_config) => {
            exec = exec.with_cache(Cache::from_config(cache_config)?);
        }
        None => {
            if config.entity.iter().any(|e| e.cache_ttl_ms.is_some()) {
                tracing::warn!("Some entities set cache_ttl_ms but no [cache] is configured");
            }
        }
    }

    Ok(exec)
}

async fn start_http_server(
    schema: async_graphql::dynamic::Schema,
    bind: &str,
    port: u16,
) -> Result<()> {
    // Wrap schema in Arc for sharing across handlers
    let schema = Arc::new(schema);

    let app = Router::new()
        .route("/graphql", post(graphql_handler).get(graphql_playground))
        .route("/health", get(health_check))
        .with_state(schema)
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| DistraughtError::Config(format!("Invalid bind address '{}:{}': {}", bind, port, e)))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DistraughtError::Config(
            format!("Failed to bind to port {}: {}. Port may be in use.", port, e)
        ))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| DistraughtError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

async fn graphql_handler(
    axum::extract::State(schema): axum::extract::State<Arc<async_graphql::dynamic::Schema>>,
    axum::Json(request): axum::Json<async_graphql::Request>,
) -> axum::Json<async_graphql::Response> {
    axum::Json(schema.execute(request).await)
}

async fn graphql_playground() -> axum::response::Html<String> {
    axum::response::Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}

async fn health_check() -> &'static str {
    "OK"
}
