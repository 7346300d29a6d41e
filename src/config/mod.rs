mod types;

pub use types::{
    CacheConfig, ColumnConfig, ColumnKind, Config, DatabaseConfig, EntityConfig, RelationConfig,
    RelationKind, ServerConfig,
};

use crate::error::{DistraughtError, Result};
use std::fs;

/// Prefix of environment variables overriding file settings,
/// e.g. `DISTRAUGHT__DATABASE__URL`
pub const ENV_PREFIX: &str = "DISTRAUGHT";

/// Load configuration from a TOML file, overlaid by `DISTRAUGHT__*` variables
pub fn load_config(path: &str) -> Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Err(DistraughtError::Config(format!(
            "Failed to read config file '{}': file not found",
            path
        )));
    }

    let config: Config = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Toml))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    validate(&config)?;

    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &Config, path: &str) -> Result<()> {
    validate(config)?;

    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string)
        .map_err(|e| DistraughtError::Config(format!("Failed to write config file '{}': {}", path, e)))?;

    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    for entity in &config.entity {
        entity.validate().map_err(DistraughtError::Config)?;
    }

    for entity in &config.entity {
        for relation in &entity.relation {
            if !config.entity.iter().any(|e| e.graphql_name == relation.entity) {
                return Err(DistraughtError::Config(format!(
                    "Relation '{}' of '{}' points at unknown entity '{}'",
                    relation.field, entity.graphql_name, relation.entity
                )));
            }
        }
    }

    if !config.database.url.starts_with("postgres://") && !config.database.url.starts_with("postgresql://") {
        return Err(DistraughtError::Config(format!(
            "Database url '{}' must start with postgres:// or postgresql://",
            config.database.url
        )));
    }

    Ok(())
}
