/// Data shared by every resolver of a built schema

use crate::cache::Cache;
use crate::error::{DistraughtError, Result};
use crate::query::Database;
use crate::schema::object::ObjectType;

use indexmap::IndexMap;
use std::sync::Arc;

/// Runtime collaborators, attached to the schema as data
#[derive(Clone)]
pub struct ExecutionContext {
    pub db: Arc<dyn Database>,
    pub cache: Option<Cache>,
    /// Checked against `allowed_environments`
    pub environment: String,
}

impl ExecutionContext {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            cache: None,
            environment: "development".to_string(),
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}

/// Objects by type name. Collections and records refer to their object by
/// name and look it up here at execution time, so objects may reference
/// each other in any order.
#[derive(Clone, Default)]
pub struct ObjectDirectory(Arc<IndexMap<String, Arc<ObjectType>>>);

impl ObjectDirectory {
    pub fn new(objects: IndexMap<String, Arc<ObjectType>>) -> Self {
        Self(Arc::new(objects))
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ObjectType>> {
        self.0.get(name).ok_or_else(|| {
            DistraughtError::SchemaGeneration(format!("Object type '{}' is not registered", name))
        })
    }
}
