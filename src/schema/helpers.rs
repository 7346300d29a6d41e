/// Authorization asserts, payload case conversion and input helpers

use crate::error::{DistraughtError, Result};
use crate::query::Row;
use crate::schema::fields::FieldDescriptor;
use crate::schema::registry::TypeRegistry;

use heck::{ToLowerCamelCase, ToSnakeCase};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
}

/// The requesting user, supplied per request as GraphQL request data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            roles: roles.into_iter().map(|name| Role { name: name.into() }).collect(),
        }
    }
}

/// The user must hold at least one of `allowed_roles`
pub fn assert_has_permission(user: Option<&AuthUser>, allowed_roles: &[String]) -> Result<()> {
    let permitted = user.is_some_and(|user| {
        user.roles
            .iter()
            .any(|role| allowed_roles.iter().any(|allowed| allowed == &role.name))
    });

    if permitted {
        Ok(())
    } else {
        Err(DistraughtError::Unauthorized(
            "You are not allowed to perform this action".to_string(),
        ))
    }
}

pub fn assert_environment(current: &str, allowed_environments: &[String]) -> Result<()> {
    if allowed_environments.iter().any(|env| env == current) {
        Ok(())
    } else {
        Err(DistraughtError::NotImplemented(
            "This feature is not implemented in the current environment.".to_string(),
        ))
    }
}

/// The gate applied by objects and mutations: roles when set, otherwise
/// environments when set
pub fn assert_access(
    user: Option<&AuthUser>,
    environment: &str,
    allowed_roles: Option<&[String]>,
    allowed_environments: Option<&[String]>,
) -> Result<()> {
    match (allowed_roles, allowed_environments) {
        (Some(roles), _) => assert_has_permission(user, roles),
        (None, Some(environments)) => assert_environment(environment, environments),
        (None, None) => Ok(()),
    }
}

pub fn has_role(user: &AuthUser, role: &str) -> bool {
    user.roles.iter().any(|r| r.name == role)
}

/// Convert a payload's keys from camelCase to snake_case
pub fn to_snake_case(payload: Row) -> Row {
    payload
        .into_iter()
        .map(|(key, value)| (key.to_snake_case(), value))
        .collect()
}

/// Convert a payload's keys from snake_case to camelCase
pub fn to_camel_case(payload: Row) -> Row {
    payload
        .into_iter()
        .map(|(key, value)| (key.to_lower_camel_case(), value))
        .collect()
}

/// `Create<Name>Input`, returned as an `input` argument map
pub fn create_input(
    registry: &mut TypeRegistry,
    object_name: &str,
    fields: IndexMap<String, FieldDescriptor>,
) -> Result<IndexMap<String, FieldDescriptor>> {
    build_input(registry, "Create", object_name, fields)
}

/// `Update<Name>Input`, returned as an `input` argument map
pub fn update_input(
    registry: &mut TypeRegistry,
    object_name: &str,
    fields: IndexMap<String, FieldDescriptor>,
) -> Result<IndexMap<String, FieldDescriptor>> {
    build_input(registry, "Update", object_name, fields)
}

/// `Delete<Name>Input`, returned as an `input` argument map
pub fn delete_input(
    registry: &mut TypeRegistry,
    object_name: &str,
    fields: IndexMap<String, FieldDescriptor>,
) -> Result<IndexMap<String, FieldDescriptor>> {
    build_input(registry, "Delete", object_name, fields)
}

fn build_input(
    registry: &mut TypeRegistry,
    prefix: &str,
    object_name: &str,
    fields: IndexMap<String, FieldDescriptor>,
) -> Result<IndexMap<String, FieldDescriptor>> {
    let name = format!("{}{}Input", prefix, object_name);
    let description = format!("Payload for creating a new {} record", object_name);

    let input = registry
        .input_object(&name, &description, fields)?
        .description(description);

    let mut args = IndexMap::new();
    args.insert("input".to_string(), input);
    Ok(args)
}
