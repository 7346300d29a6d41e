/// Requested field tree
///
/// The fields a caller actually selected, nested by sub-selection. Drives
/// count options, column projection and cache keys.

use async_graphql::SelectionField;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestedFields(IndexMap<String, RequestedFields>);

impl RequestedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the selection set below `field`. Fragments are flattened
    /// and aliases are ignored; introspection fields are skipped.
    pub fn from_selection(field: SelectionField<'_>) -> Self {
        let mut fields = RequestedFields::new();
        for child in field.selection_set() {
            let name = child.name();
            if name.starts_with("__") {
                continue;
            }
            let nested = RequestedFields::from_selection(child);
            fields.merge(name, nested);
        }
        fields
    }

    /// Build from dotted paths, e.g. `["records.id", "count"]`
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = RequestedFields::new();
        for path in paths {
            let mut node = &mut fields;
            for segment in path.as_ref().split('.') {
                node = node.0.entry(segment.to_string()).or_default();
            }
        }
        fields
    }

    pub fn insert(&mut self, name: impl Into<String>, nested: RequestedFields) {
        self.merge(name.into().as_str(), nested);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RequestedFields> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // The same field may be selected twice (aliases, fragments)
    fn merge(&mut self, name: &str, nested: RequestedFields) {
        let slot = self.0.entry(name.to_string()).or_default();
        for (child, grandchildren) in nested.0 {
            slot.merge(&child, grandchildren);
        }
    }
}
