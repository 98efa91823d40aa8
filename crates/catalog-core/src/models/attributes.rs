use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use super::upload::UploadedFile;

/// A single value in a write request.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Ids(Vec<Uuid>),
    File(UploadedFile),
}

impl AttributeValue {
    /// Short type name used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Bool(_) => "boolean",
            AttributeValue::Int(_) => "integer",
            AttributeValue::Text(_) => "string",
            AttributeValue::Ids(_) => "array",
            AttributeValue::File(_) => "file",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<Vec<Uuid>> for AttributeValue {
    fn from(value: Vec<Uuid>) -> Self {
        AttributeValue::Ids(value)
    }
}

impl From<UploadedFile> for AttributeValue {
    fn from(value: UploadedFile) -> Self {
        AttributeValue::File(value)
    }
}

/// Attribute map of a create/update request.
///
/// A missing relation key (`categories_id`, `genders_id`) leaves the relation
/// untouched, while an empty id list clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttributeValue> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    /// Deduplicated id set under `key`, or `None` when the key is absent or
    /// does not hold an id list.
    pub fn id_set(&self, key: &str) -> Option<HashSet<Uuid>> {
        match self.0.get(key) {
            Some(AttributeValue::Ids(ids)) => Some(ids.iter().copied().collect()),
            _ => None,
        }
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Attributes(iter.into_iter().collect())
    }
}
