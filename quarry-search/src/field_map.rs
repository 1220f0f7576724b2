//! Ordered document field data.

use crate::error::{DalError, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Insertion-ordered mapping of field names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    fields: Map<String, Value>,
}

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build from any value that serializes to a JSON object.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DalError::InvalidArgument(format!(
                "document data must serialize to an object, got {}",
                other
            ))),
        }
    }

    /// Field value, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether the field is present.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Insert or replace a field in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Builder-style [`FieldMap::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Copy of this map with `old` renamed to `new`, keeping its position.
    ///
    /// Fails with [`DalError::InvalidArgument`] when `old` is absent. An
    /// existing `new` field is replaced.
    pub fn rename(&self, old: &str, new: &str) -> Result<Self> {
        if !self.has(old) {
            return Err(DalError::InvalidArgument(format!(
                "cannot rename missing field '{}'",
                old
            )));
        }
        if old == new {
            return Ok(self.clone());
        }

        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| key.as_str() != new)
            .map(|(key, value)| {
                let key = if key == old { new.to_string() } else { key.clone() };
                (key, value.clone())
            })
            .collect();

        Ok(Self { fields })
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Borrow the underlying JSON object.
    pub fn to_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Deserialize the fields into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

impl From<Map<String, Value>> for FieldMap {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FieldMap {
        FieldMap::new()
            .with("source", "ctx._source.n++")
            .with("lang", "painless")
            .with("params", json!({ "n": 1 }))
    }

    #[test]
    fn test_keeps_insertion_order() {
        let map = FieldMap::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_rename_keeps_position() {
        let renamed = sample().rename("source", "inline").unwrap();
        let keys: Vec<&String> = renamed.keys().collect();
        assert_eq!(keys, ["inline", "lang", "params"]);
        assert_eq!(renamed.get("inline"), Some(&json!("ctx._source.n++")));
        assert!(!renamed.has("source"));
    }

    #[test]
    fn test_rename_does_not_touch_original() {
        let original = sample();
        let _ = original.rename("source", "inline").unwrap();
        assert!(original.has("source"));
    }

    #[test]
    fn test_rename_missing_key_fails() {
        let err = sample().rename("nope", "other").unwrap_err();
        assert!(matches!(err, DalError::InvalidArgument(_)));
    }

    #[test]
    fn test_rename_replaces_existing_target() {
        let renamed = sample().rename("source", "lang").unwrap();
        assert_eq!(renamed.len(), 2);
        assert_eq!(renamed.get("lang"), Some(&json!("ctx._source.n++")));
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct User {
            name: String,
            age: u32,
        }

        let user = User {
            name: "John".to_string(),
            age: 42,
        };
        let map = FieldMap::from_serializable(&user).unwrap();
        assert_eq!(map.get("name"), Some(&json!("John")));
        assert_eq!(map.deserialize::<User>().unwrap(), user);
    }

    #[test]
    fn test_from_serializable_rejects_scalars() {
        assert!(FieldMap::from_serializable(&42).is_err());
    }
}
