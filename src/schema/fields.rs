/// Field descriptors and the common fields shared by every object
///
/// A `FieldDescriptor` is an immutable description of one GraphQL field or
/// argument. `required()` and `list()` return a new descriptor wrapping the
/// type; nothing is mutated in place.

use crate::schema::resolver::{column_resolver, FieldResolver};

use async_graphql::dynamic::{Field, InputValue, TypeRef};
use indexmap::IndexMap;
use std::fmt;

/// Name of the built-in sort direction enum
pub const SORT_DIRECTION: &str = "SortDirection";

/// Name of the ISO 8601 date scalar
pub const DATE: &str = "Date";

/// Name of the ISO 8601 datetime scalar
pub const DATE_TIME: &str = "DateTime";

#[derive(Clone)]
pub struct FieldDescriptor {
    type_ref: TypeRef,
    description: Option<String>,
    arguments: IndexMap<String, FieldDescriptor>,
    resolver: Option<FieldResolver>,
    /// `Some` for fields resolved by another object; holds the parent
    /// columns that resolver depends on
    parent_fields: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// Nullable field of the named type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self::from_type_ref(TypeRef::named(type_name.into()))
    }

    pub fn from_type_ref(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            description: None,
            arguments: IndexMap::new(),
            resolver: None,
            parent_fields: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Wrap the type as non-null
    pub fn required(mut self) -> Self {
        if !matches!(self.type_ref, TypeRef::NonNull(_)) {
            self.type_ref = TypeRef::NonNull(Box::new(self.type_ref));
        }
        self
    }

    /// Wrap the type as a list
    pub fn list(mut self) -> Self {
        self.type_ref = TypeRef::List(Box::new(self.type_ref));
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

    pub fn resolver(mut self, resolver: FieldResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Mark as resolved by another object (a nested collection or record)
    pub fn relation(mut self) -> Self {
        if self.parent_fields.is_none() {
            self.parent_fields = Some(Vec::new());
        }
        self
    }

    /// Parent columns a nested resolver needs; implies [`FieldDescriptor::relation`]
    pub fn parent_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_fields
            .get_or_insert_with(Vec::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Innermost named type
    pub fn type_name(&self) -> &str {
        fn base(type_ref: &TypeRef) -> &str {
            match type_ref {
                TypeRef::Named(name) => name.as_ref(),
                TypeRef::NonNull(inner) | TypeRef::List(inner) => base(inner),
            }
        }
        base(&self.type_ref)
    }

    pub fn is_relation(&self) -> bool {
        self.parent_fields.is_some()
    }

    pub fn parent_field_dependencies(&self) -> &[String] {
        self.parent_fields.as_deref().unwrap_or(&[])
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_arguments(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.arguments
    }

    pub fn to_input_value(&self, name: &str) -> InputValue {
        let mut input = InputValue::new(name, self.type_ref.clone());
        if let Some(description) = &self.description {
            input = input.description(description);
        }
        input
    }

    /// Output field; without an explicit resolver the value is read from the
    /// parent row under `name`
    pub fn to_field(&self, name: &str) -> Field {
        let resolver = self
            .resolver
            .clone()
            .unwrap_or_else(|| column_resolver(name, self.type_name() == TypeRef::ID));

        let mut field = Field::new(name, self.type_ref.clone(), move |ctx| resolver(ctx));
        if let Some(description) = &self.description {
            field = field.description(description);
        }
        for (arg_name, argument) in &self.arguments {
            field = field.argument(argument.to_input_value(arg_name));
        }
        field
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("type", &self.type_ref.to_string())
            .field("description", &self.description)
            .field("arguments", &self.arguments.keys().collect::<Vec<_>>())
            .field("parent_fields", &self.parent_fields)
            .finish()
    }
}

pub fn id() -> FieldDescriptor {
    FieldDescriptor::new(TypeRef::ID).description("Unique ID of the record")
}

pub fn string(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(TypeRef::STRING).description(description)
}

pub fn int(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(TypeRef::INT).description(description)
}

pub fn float(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(TypeRef::FLOAT).description(description)
}

pub fn bool(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(TypeRef::BOOLEAN).description(description)
}

pub fn date(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(DATE).description(description)
}

pub fn datetime(description: impl Into<String>) -> FieldDescriptor {
    FieldDescriptor::new(DATE_TIME).description(description)
}

pub fn created_at() -> FieldDescriptor {
    datetime("The ISO 8601 date format of the time that this resource was created.")
}

pub fn updated_at() -> FieldDescriptor {
    datetime("The ISO 8601 date format of the time that this resource was edited.")
}

pub fn deleted_at() -> FieldDescriptor {
    datetime("The ISO 8601 date format of the time that this resource was deleted.")
}

pub fn limit() -> FieldDescriptor {
    int("Limit the resultset of a collection query")
}

pub fn offset() -> FieldDescriptor {
    int("Offset the resultset of a collection query")
}

pub fn sort_name() -> FieldDescriptor {
    string("The name of the sort")
}

pub fn sort_dir() -> FieldDescriptor {
    FieldDescriptor::new(SORT_DIRECTION).description("The direction of the sort")
}

/// Default allowed args when searching for a collection of records, followed
/// by the object's own filters
pub fn collection_args(filters: &IndexMap<String, FieldDescriptor>) -> IndexMap<String, FieldDescriptor> {
    let mut args = IndexMap::new();
    args.insert("id".to_string(), id());
    args.insert("offset".to_string(), offset());
    args.insert("limit".to_string(), limit());
    args.insert("sortName".to_string(), sort_name());
    args.insert("sortDir".to_string(), sort_dir());
    for (name, filter) in filters {
        args.insert(name.clone(), filter.clone());
    }
    args
}

/// Default allowed args when fetching a single record
pub fn record_args() -> IndexMap<String, FieldDescriptor> {
    let mut args = IndexMap::new();
    args.insert("id".to_string(), FieldDescriptor::new(TypeRef::ID));
    args
}
