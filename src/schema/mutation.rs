/// Postgres-backed mutations
///
/// The `input` argument arrives camelCased; it is handed to `resolve` as a
/// snake_case row together with the database handle, and the returned row
/// is camelCased again before it reaches the output type.

use crate::error::{DistraughtError, Result};
use crate::query::{Database, Row};
use crate::schema::context::ExecutionContext;
use crate::schema::fields::FieldDescriptor;
use crate::schema::helpers::{assert_access, to_camel_case, to_snake_case, AuthUser};
use crate::schema::resolver::{
    decode_arguments, execution_context, field_resolver, graphql_error, request_user, FieldResolver,
};

use async_graphql::dynamic::{FieldFuture, FieldValue};
use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub struct MutationRequest {
    /// The `input` argument (or all arguments when there is none), snake_cased
    pub input: Row,
    pub user: Option<AuthUser>,
    pub db: Arc<dyn Database>,
}

pub type MutationResolveFn = Arc<dyn Fn(MutationRequest) -> BoxFuture<'static, Result<Row>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct MutationSpec {
    name: String,
    description: Option<String>,
    arguments: IndexMap<String, FieldDescriptor>,
    output: Option<FieldDescriptor>,
    allowed_roles: Option<Vec<String>>,
    allowed_environments: Option<Vec<String>>,
    resolve: Option<MutationResolveFn>,
}

impl MutationSpec {
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

    pub fn argument(mut self, name: impl Into<String>, argument: FieldDescriptor) -> Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    pub fn arguments(mut self, arguments: IndexMap<String, FieldDescriptor>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    /// Output type, typically the object the mutation writes
    pub fn output(mut self, output: FieldDescriptor) -> Self {
        self.output = Some(output);
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

    pub fn resolve<F, Fut>(mut self, resolve: F) -> Self
    where
        F: Fn(MutationRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Row>> + Send + 'static,
    {
        self.resolve = Some(Arc::new(move |request| resolve(request).boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct MutationType {
    name: String,
    description: String,
    arguments: IndexMap<String, FieldDescriptor>,
    output: FieldDescriptor,
    allowed_roles: Option<Vec<String>>,
    allowed_environments: Option<Vec<String>>,
    resolve: MutationResolveFn,
}

impl fmt::Debug for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationType")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("arguments", &self.arguments)
            .field("output", &self.output)
            .field("allowed_roles", &self.allowed_roles)
            .field("allowed_environments", &self.allowed_environments)
            .finish_non_exhaustive()
    }
}

impl MutationType {
    pub fn new(spec: MutationSpec) -> Result<Self> {
        if spec.name.is_empty() {
            return Err(DistraughtError::Config(
                "Invalid pg_mutation: Name is required".to_string(),
            ));
        }
        let description = spec.description.ok_or_else(|| {
            DistraughtError::Config(format!(
                "Invalid pg_mutation: Description is required for {}",
                spec.name
            ))
        })?;
        let output = spec.output.ok_or_else(|| {
            DistraughtError::Config(format!(
                "Invalid pg_mutation: Output type is required for {}",
                spec.name
            ))
        })?;
        let resolve = spec.resolve.ok_or_else(|| {
            DistraughtError::Config(format!(
                "Invalid pg_mutation: Resolve is a required function for {}",
                spec.name
            ))
        })?;

        Ok(Self {
            name: spec.name,
            description,
            arguments: spec.arguments,
            output,
            allowed_roles: spec.allowed_roles,
            allowed_environments: spec.allowed_environments,
            resolve,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authorize, run `resolve` with the snake_cased input and camelCase
    /// the returned row
    pub async fn execute(
        &self,
        exec: &ExecutionContext,
        arguments: Row,
        user: Option<AuthUser>,
    ) -> Result<Row> {
        assert_access(
            user.as_ref(),
            &exec.environment,
            self.allowed_roles.as_deref(),
            self.allowed_environments.as_deref(),
        )?;

        let input = match arguments.get("input") {
            Some(serde_json::Value::Object(input)) => input.clone(),
            _ => arguments,
        };

        tracing::debug!(mutation = %self.name, "executing mutation");

        let row = (self.resolve)(MutationRequest {
            input: to_snake_case(input),
            user,
            db: Arc::clone(&exec.db),
        })
        .await?;

        Ok(to_camel_case(row))
    }

    pub fn descriptor(self: &Arc<Self>) -> FieldDescriptor {
        FieldDescriptor::from_type_ref(self.output.type_ref().clone())
            .description(&self.description)
            .arguments(self.arguments.clone())
            .resolver(mutation_resolver(Arc::clone(self)))
    }
}

fn mutation_resolver(mutation: Arc<MutationType>) -> FieldResolver {
    field_resolver(move |ctx| {
        let mutation = Arc::clone(&mutation);
        FieldFuture::new(async move {
            let exec = execution_context(&ctx).map_err(graphql_error)?;
            let arguments = decode_arguments(&ctx).map_err(graphql_error)?;

            let row = mutation
                .execute(exec, arguments, request_user(&ctx))
                .await
                .map_err(graphql_error)?;

            Ok(Some(FieldValue::owned_any(row)))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlValue;
    use crate::schema::fields;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoDatabase;

    #[async_trait]
    impl Database for NoDatabase {
        async fn fetch_rows(&self, _sql: &str, _bindings: &[SqlValue]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn spec() -> MutationSpec {
        MutationSpec::new("createUser")
            .description("Create a user")
            .output(FieldDescriptor::new("User"))
            .resolve(|request: MutationRequest| async move {
                let mut row = request.input;
                row.insert("id".to_string(), json!(1));
                Ok::<_, DistraughtError>(row)
            })
    }

    #[test]
    fn test_validation() {
        let err = MutationType::new(MutationSpec::new("createUser")).unwrap_err();
        assert!(err.to_string().contains("Description is required for createUser"));

        let err = MutationType::new(MutationSpec::new("createUser").description("d")).unwrap_err();
        assert!(err.to_string().contains("Output type is required"));

        assert!(MutationType::new(spec()).is_ok());
    }

    #[tokio::test]
    async fn test_execute_converts_case_both_ways() {
        let mutation = MutationType::new(spec()).unwrap();
        let exec = ExecutionContext::new(Arc::new(NoDatabase));

        let arguments = json!({"input": {"firstName": "Ada"}}).as_object().cloned().unwrap();
        let row = mutation.execute(&exec, arguments, None).await.unwrap();

        assert_eq!(row.get("firstName"), Some(&json!("Ada")));
        assert_eq!(row.get("id"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_execute_checks_roles() {
        let mutation = MutationType::new(spec().allowed_roles(["admin"])).unwrap();
        let exec = ExecutionContext::new(Arc::new(NoDatabase));

        let err = mutation.execute(&exec, Row::new(), None).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_descriptor_uses_output_type() {
        let mutation = Arc::new(
            MutationType::new(spec().argument("input", fields::string("payload"))).unwrap(),
        );
        let descriptor = mutation.descriptor();
        assert_eq!(descriptor.type_name(), "User");
        assert!(descriptor.get_arguments().contains_key("input"));
    }
}
