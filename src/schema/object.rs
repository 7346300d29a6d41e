/// Object builders
///
/// An `ObjectType` is a GraphQL object plus the resolution logic that
/// collections and records delegate to. Three flavours exist:
///
/// * `pg`: `resolve` returns a query, executed as-is.
/// * `pg_optimized`: as `pg`, but the SQL projection is narrowed to the
///   requested fields (relations contribute their parent fields, custom
///   columns run their own handler).
/// * `gql`: `resolve` returns a row directly, no SQL involved.
///
/// All three authorize before resolving and may cache their result.

use crate::error::{DistraughtError, Result};
use crate::query::{
    run_query, Collection, CountOptions, QueryBuilder, QueryFilters, QueryOptions, ResolvedQuery,
    ResultEnvelope, Row,
};
use crate::schema::context::ExecutionContext;
use crate::schema::fields::{collection_args, FieldDescriptor};
use crate::schema::helpers::{assert_access, AuthUser};
use crate::schema::selection::RequestedFields;

use async_graphql::dynamic::Object;
use heck::ToSnakeCase;
use indexmap::{IndexMap, IndexSet};
use md5::{Digest, Md5};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What a `resolve` callback gets besides the parent row and filters
pub struct ResolveContext<'a> {
    pub user: Option<&'a AuthUser>,
    pub fields: &'a RequestedFields,
}

pub type ResolveFn =
    Arc<dyn Fn(Option<&Row>, &QueryFilters, &ResolveContext<'_>) -> Result<ResolvedQuery> + Send + Sync>;

pub type GqlResolveFn =
    Arc<dyn Fn(Option<&Row>, &QueryFilters, &ResolveContext<'_>) -> Result<Row> + Send + Sync>;

/// Adds a computed column; may also extend the query (joins, subqueries)
pub type CustomColumnFn = Arc<dyn Fn(&mut Vec<String>, &mut QueryBuilder) + Send + Sync>;

/// Declarative description of an object, validated when built
#[derive(Clone, Default)]
pub struct ObjectSpec {
    name: String,
    description: Option<String>,
    columns: IndexMap<String, FieldDescriptor>,
    filters: IndexMap<String, FieldDescriptor>,
    allowed_roles: Option<Vec<String>>,
    allowed_environments: Option<Vec<String>>,
    cache_ttl: Option<Duration>,
    resolve: Option<ResolveFn>,
    resolve_value: Option<GqlResolveFn>,
    table_name: Option<String>,
    custom_columns: IndexMap<String, CustomColumnFn>,
}

impl ObjectSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn column(mut self, name: impl Into<String>, column: FieldDescriptor) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    pub fn columns(mut self, columns: IndexMap<String, FieldDescriptor>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Extra collection argument
    pub fn filter(mut self, name: impl Into<String>, filter: FieldDescriptor) -> Self {
        self.filters.insert(name.into(), filter);
        self
    }

    pub fn filters(mut self, filters: IndexMap<String, FieldDescriptor>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn allowed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn allowed_environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_environments = Some(environments.into_iter().map(Into::into).collect());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Query resolution for `pg` and `pg_optimized` objects
    pub fn resolve<F, R>(mut self, resolve: F) -> Self
    where
        F: Fn(Option<&Row>, &QueryFilters, &ResolveContext<'_>) -> Result<R> + Send + Sync + 'static,
        R: Into<ResolvedQuery>,
    {
        self.resolve = Some(Arc::new(
            move |parent: Option<&Row>,
                  filters: &QueryFilters,
                  ctx: &ResolveContext<'_>|
                  -> Result<ResolvedQuery> { resolve(parent, filters, ctx).map(Into::into) },
        ));
        self
    }

    /// Row resolution for `gql` objects
    pub fn resolve_value<F>(mut self, resolve: F) -> Self
    where
        F: Fn(Option<&Row>, &QueryFilters, &ResolveContext<'_>) -> Result<Row> + Send + Sync + 'static,
    {
        self.resolve_value = Some(Arc::new(resolve));
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn custom_column<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Vec<String>, &mut QueryBuilder) + Send + Sync + 'static,
    {
        self.custom_columns.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Per-field facts used by the projection, captured at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub is_relation: bool,
    pub parent_fields: Vec<String>,
}

/// Columns derived from the requested fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub columns: Vec<String>,
    /// Parent fields required by nested relations
    pub parent_columns: Vec<String>,
}

#[derive(Clone)]
enum ObjectKind {
    Pg {
        resolve: ResolveFn,
    },
    PgOptimized {
        resolve: ResolveFn,
        table_name: String,
        custom_columns: IndexMap<String, CustomColumnFn>,
    },
    Gql {
        resolve: GqlResolveFn,
    },
}

/// Inputs of one resolution
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub parent: Option<Row>,
    pub filters: QueryFilters,
    pub user: Option<AuthUser>,
    pub fields: RequestedFields,
}

#[derive(Serialize)]
struct CacheKeyPayload<'a> {
    filters: &'a QueryFilters,
    fields: &'a RequestedFields,
    columns: Option<&'a [String]>,
    #[serde(rename = "countOpts")]
    count_options: CountOptions,
}

pub struct ObjectType {
    name: String,
    description: String,
    columns: IndexMap<String, FieldDescriptor>,
    arguments: IndexMap<String, FieldDescriptor>,
    meta: IndexMap<String, FieldMeta>,
    allowed_roles: Option<Vec<String>>,
    allowed_environments: Option<Vec<String>>,
    cache_ttl: Option<Duration>,
    kind: ObjectKind,
}

impl ObjectType {
    pub fn pg(mut spec: ObjectSpec) -> Result<Self> {
        validate(&spec, "pg_object")?;
        let resolve = required_resolve(&mut spec, "pg_object")?;
        Ok(Self::from_spec(spec, ObjectKind::Pg { resolve }))
    }

    pub fn pg_optimized(mut spec: ObjectSpec) -> Result<Self> {
        validate(&spec, "pg_optimized_object")?;
        let resolve = required_resolve(&mut spec, "pg_optimized_object")?;
        let table_name = spec.table_name.take().filter(|t| !t.is_empty()).ok_or_else(|| {
            DistraughtError::Config(format!(
                "Invalid pg_optimized_object: table_name is required for {}",
                spec.name
            ))
        })?;
        let custom_columns = std::mem::take(&mut spec.custom_columns);
        Ok(Self::from_spec(
            spec,
            ObjectKind::PgOptimized {
                resolve,
                table_name,
                custom_columns,
            },
        ))
    }

    pub fn gql(mut spec: ObjectSpec) -> Result<Self> {
        validate(&spec, "gql_object")?;
        let resolve = spec.resolve_value.take().ok_or_else(|| {
            DistraughtError::Config(format!(
                "Invalid gql_object: Resolve is a required function for {}",
                spec.name
            ))
        })?;
        Ok(Self::from_spec(spec, ObjectKind::Gql { resolve }))
    }

    fn from_spec(spec: ObjectSpec, kind: ObjectKind) -> Self {
        let meta = spec
            .columns
            .iter()
            .map(|(name, column)| {
                (
                    name.clone(),
                    FieldMeta {
                        is_relation: column.is_relation(),
                        parent_fields: column.parent_field_dependencies().to_vec(),
                    },
                )
            })
            .collect();

        Self {
            description: spec
                .description
                .unwrap_or_else(|| format!("No description for {}", spec.name)),
            arguments: collection_args(&spec.filters),
            name: spec.name,
            columns: spec.columns,
            meta,
            allowed_roles: spec.allowed_roles,
            allowed_environments: spec.allowed_environments,
            cache_ttl: spec.cache_ttl,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn columns(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.columns
    }

    /// Collection arguments: the defaults plus this object's filters
    pub fn arguments(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.arguments
    }

    pub fn field_meta(&self, field: &str) -> Option<&FieldMeta> {
        self.meta.get(field)
    }

    pub fn graphql_object(&self) -> Object {
        self.columns
            .iter()
            .fold(
                Object::new(&self.name).description(&self.description),
                |object, (name, column)| object.field(column.to_field(name)),
            )
    }

    /// Narrowed projection for `field_set`; `None` unless optimized
    pub fn projection(&self, field_set: &RequestedFields) -> Option<Projection> {
        match &self.kind {
            ObjectKind::PgOptimized {
                table_name,
                custom_columns,
                ..
            } => Some(project_columns(table_name, &self.meta, custom_columns, field_set)),
            _ => None,
        }
    }

    /// Roles win over environments when both are set
    pub fn authorize(&self, user: Option<&AuthUser>, environment: &str) -> Result<()> {
        assert_access(
            user,
            environment,
            self.allowed_roles.as_deref(),
            self.allowed_environments.as_deref(),
        )
    }

    pub async fn resolve(
        &self,
        exec: &ExecutionContext,
        request: ResolveRequest,
    ) -> Result<ResultEnvelope> {
        self.authorize(request.user.as_ref(), &exec.environment)?;

        let ResolveRequest {
            parent,
            filters,
            user,
            fields,
        } = request;
        let ctx = ResolveContext {
            user: user.as_ref(),
            fields: &fields,
        };

        tracing::debug!(object = %self.name, collection = filters.is_collection, "resolving");

        match &self.kind {
            ObjectKind::Gql { resolve } => {
                self.resolve_gql(exec, parent.as_ref(), &filters, &ctx, resolve)
                    .await
            }
            ObjectKind::Pg { resolve } => {
                let options = resolve(parent.as_ref(), &filters, &ctx)?.into_options();
                self.execute(exec, &filters, options, &fields).await
            }
            ObjectKind::PgOptimized {
                resolve,
                table_name,
                custom_columns,
            } => {
                let mut options = resolve(parent.as_ref(), &filters, &ctx)?.into_options();

                let field_set = if filters.is_collection {
                    fields.get("records").cloned().unwrap_or_default()
                } else {
                    fields.clone()
                };
                let projection = project_columns(table_name, &self.meta, custom_columns, &field_set);

                // Columns from `resolve` replace the derived ones
                let mut columns = options.columns.take().unwrap_or(projection.columns);
                columns.extend(projection.parent_columns);
                for (name, handler) in custom_columns {
                    if field_set.contains(name) {
                        handler(&mut columns, &mut options.query);
                    }
                }
                options.columns = Some(columns.into_iter().collect::<IndexSet<_>>().into_iter().collect());

                self.execute(exec, &filters, options, &fields).await
            }
        }
    }

    async fn execute(
        &self,
        exec: &ExecutionContext,
        filters: &QueryFilters,
        options: QueryOptions,
        fields: &RequestedFields,
    ) -> Result<ResultEnvelope> {
        let count_options = CountOptions::from_fields(fields);

        let (ttl, cache) = match (self.cache_ttl, &exec.cache) {
            (Some(ttl), Some(cache)) => (ttl, cache),
            (Some(_), None) => {
                tracing::debug!(object = %self.name, "cache_ttl set but no cache configured");
                return execute_query(exec, filters, &options, count_options).await;
            }
            _ => return execute_query(exec, filters, &options, count_options).await,
        };

        let key = self.cache_key(filters, fields, options.columns.as_deref(), count_options)?;
        let value = cache
            .get_or_set(&key, Some(ttl), || async {
                let envelope = execute_query(exec, filters, &options, count_options).await?;
                Ok::<_, DistraughtError>(serde_json::to_value(envelope)?)
            })
            .await?;

        Ok(serde_json::from_value(value)?)
    }

    /// `<lowercased name>-<md5 of {filters, fields, columns, countOpts}>`
    pub fn cache_key(
        &self,
        filters: &QueryFilters,
        fields: &RequestedFields,
        columns: Option<&[String]>,
        count_options: CountOptions,
    ) -> Result<String> {
        let payload = serde_json::to_vec(&CacheKeyPayload {
            filters,
            fields,
            columns,
            count_options,
        })?;
        Ok(format!("{}-{:x}", self.name.to_lowercase(), Md5::digest(&payload)))
    }

    async fn resolve_gql(
        &self,
        exec: &ExecutionContext,
        parent: Option<&Row>,
        filters: &QueryFilters,
        ctx: &ResolveContext<'_>,
        resolve: &GqlResolveFn,
    ) -> Result<ResultEnvelope> {
        let produce = || -> Result<ResultEnvelope> {
            let row = resolve(parent, filters, ctx)?;
            Ok(if filters.is_collection {
                ResultEnvelope::Collection(Collection {
                    records: vec![row],
                    count: None,
                    count_estimate: None,
                })
            } else {
                ResultEnvelope::Record(Some(row))
            })
        };

        // Only cacheable when the parent says how
        let parent_key = parent
            .and_then(|row| row.get("cacheKey"))
            .and_then(|key| key.as_str());

        match (self.cache_ttl, &exec.cache, parent_key) {
            (Some(ttl), Some(cache), Some(parent_key)) => {
                let key = format!("{}-{}", self.name.to_lowercase(), parent_key);
                let value = cache
                    .get_or_set(&key, Some(ttl), || async {
                        Ok::<_, DistraughtError>(serde_json::to_value(produce()?)?)
                    })
                    .await?;
                Ok(serde_json::from_value(value)?)
            }
            _ => produce(),
        }
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("name", &self.name)
            .field("columns", &self.columns.keys().collect::<Vec<_>>())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

fn validate(spec: &ObjectSpec, kind: &str) -> Result<()> {
    if spec.name.is_empty() {
        return Err(DistraughtError::Config(format!("Invalid {}: Name is required", kind)));
    }
    if spec.columns.is_empty() {
        return Err(DistraughtError::Config(format!(
            "Invalid {}: Columns is required for {}",
            kind, spec.name
        )));
    }
    Ok(())
}

fn required_resolve(spec: &mut ObjectSpec, kind: &str) -> Result<ResolveFn> {
    spec.resolve.take().ok_or_else(|| {
        DistraughtError::Config(format!(
            "Invalid {}: Resolve is a required function for {}",
            kind, spec.name
        ))
    })
}

async fn execute_query(
    exec: &ExecutionContext,
    filters: &QueryFilters,
    options: &QueryOptions,
    count_options: CountOptions,
) -> Result<ResultEnvelope> {
    let envelope = run_query(
        exec.db.as_ref(),
        filters,
        &options.query,
        options.columns.as_deref(),
        count_options,
    )
    .await?;

    match &options.transform {
        Some(transform) => transform(envelope),
        None => Ok(envelope),
    }
}

/// Map requested fields to `table.snake_case` columns.
///
/// Relation fields are resolved by their own object and only contribute
/// their parent fields; custom columns are left to their handlers; fields
/// not declared on the object (`__typename`) are skipped.
pub fn project_columns(
    table_name: &str,
    meta: &IndexMap<String, FieldMeta>,
    custom_columns: &IndexMap<String, CustomColumnFn>,
    field_set: &RequestedFields,
) -> Projection {
    let qualify = |field: &str| format!("{}.{}", table_name, field.to_snake_case());
    let mut projection = Projection::default();

    for name in field_set.names() {
        if custom_columns.contains_key(name) {
            continue;
        }
        let Some(field) = meta.get(name) else {
            continue;
        };
        if field.is_relation {
            projection
                .parent_columns
                .extend(field.parent_fields.iter().map(|parent| qualify(parent)));
        } else {
            projection.columns.push(qualify(name));
        }
    }

    projection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields;

    fn users_spec() -> ObjectSpec {
        ObjectSpec::new("User")
            .column("id", fields::id())
            .column("firstName", fields::string("First name"))
            .column("createdAt", fields::created_at())
            .column(
                "posts",
                FieldDescriptor::new("UserPostCollection").parent_fields(["id", "teamId"]),
            )
            .resolve(|_, _, _| Ok(QueryBuilder::table("users")))
    }

    #[test]
    fn test_validation_order() {
        let err = ObjectType::pg(ObjectSpec::new("")).unwrap_err();
        assert!(err.to_string().contains("Name is required"));

        let err = ObjectType::pg(ObjectSpec::new("User")).unwrap_err();
        assert!(err.to_string().contains("Columns is required for User"));

        let err = ObjectType::pg(ObjectSpec::new("User").column("id", fields::id())).unwrap_err();
        assert!(err.to_string().contains("Resolve is a required function for User"));

        let err = ObjectType::pg_optimized(users_spec()).unwrap_err();
        assert!(err.to_string().contains("table_name is required for User"));
    }

    #[test]
    fn test_default_description_and_arguments() {
        let object = ObjectType::pg(users_spec().filter("teamId", fields::id())).unwrap();
        assert_eq!(object.description(), "No description for User");
        assert!(object.arguments().contains_key("sortDir"));
        assert!(object.arguments().contains_key("teamId"));
        assert!(object.field_meta("posts").unwrap().is_relation);
        assert!(!object.field_meta("firstName").unwrap().is_relation);
    }

    #[test]
    fn test_projection_skips_relations_and_adds_parent_fields() {
        let object = ObjectType::pg_optimized(users_spec().table_name("users")).unwrap();
        let fields = RequestedFields::from_paths(["firstName", "posts.records.title", "__typename"]);

        let projection = object.projection(&fields).unwrap();
        assert_eq!(projection.columns, vec!["users.first_name"]);
        assert_eq!(projection.parent_columns, vec!["users.id", "users.team_id"]);
    }

    #[test]
    fn test_projection_leaves_custom_columns_to_handlers() {
        let object = ObjectType::pg_optimized(
            users_spec()
                .column("postCount", fields::int("Posts written"))
                .table_name("users")
                .custom_column("postCount", |columns, _query| {
                    columns.push("(SELECT count(*) FROM posts) AS post_count".to_string())
                }),
        )
        .unwrap();

        let projection = object
            .projection(&RequestedFields::from_paths(["id", "postCount"]))
            .unwrap();
        assert_eq!(projection.columns, vec!["users.id"]);
    }

    #[test]
    fn test_plain_pg_object_has_no_projection() {
        let object = ObjectType::pg(users_spec()).unwrap();
        assert!(object.projection(&RequestedFields::from_paths(["id"])).is_none());
    }

    #[test]
    fn test_cache_key_depends_on_filters() {
        let object = ObjectType::pg(users_spec()).unwrap();
        let fields = RequestedFields::from_paths(["id"]);
        let count = CountOptions::default();

        let a = object
            .cache_key(&QueryFilters::collection(), &fields, None, count)
            .unwrap();
        let b = object
            .cache_key(
                &QueryFilters::collection().with_filter("teamId", serde_json::json!(1)),
                &fields,
                None,
                count,
            )
            .unwrap();

        assert!(a.starts_with("user-"));
        assert_eq!(a.len(), "user-".len() + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_roles_take_precedence_over_environments() {
        let object = ObjectType::pg(
            users_spec()
                .allowed_roles(["admin"])
                .allowed_environments(["development"]),
        )
        .unwrap();

        let err = object.authorize(None, "development").unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        let admin = AuthUser::with_roles(["admin"]);
        assert!(object.authorize(Some(&admin), "production").is_ok());

        let env_only = ObjectType::pg(users_spec().allowed_environments(["development"])).unwrap();
        assert_eq!(
            env_only.authorize(None, "production").unwrap_err().code(),
            "NOT_IMPLEMENTED"
        );
    }
}
