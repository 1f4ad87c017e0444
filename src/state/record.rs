use crate::error::{json_kind, Result, StoreError};
use crate::slice::Identical;
use crate::state::Merge;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A single shared field value inside a [`Record`].
///
/// Cloning a `Field` shares the underlying allocation. Under
/// [`Identical`], scalars (null, booleans, numbers, strings) compare by
/// value while arrays and objects compare by allocation, so replacing a
/// nested object with an equal-looking copy still counts as a change.
#[derive(Clone)]
pub struct Field(Arc<Value>);

impl Field {
    /// Wrap a JSON value in a fresh allocation.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Arc::new(value.into()))
    }

    /// Borrow the JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Whether both fields point at the same allocation.
    pub fn ptr_eq(&self, other: &Field) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn is_scalar(&self) -> bool {
        !matches!(*self.0, Value::Array(_) | Value::Object(_))
    }
}

impl Deref for Field {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Identical for Field {
    fn identical(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.is_scalar() && other.is_scalar() && self.0 == other.0
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Self(Arc::new(value))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Field::from)
    }
}

/// A dynamic state shape: a mapping from field name to [`Field`].
///
/// `Record` is its own partial. Merging copies the field table and
/// overwrites only the keys present in the patch; every other field keeps
/// its allocation.
///
/// # Examples
///
/// ```
/// use slice_store::{Merge, Record};
///
/// let state = Record::new().with("counter", 0).with("theme", "light");
/// let next = state.merge(Record::new().with("counter", 1));
///
/// assert_eq!(next.value("counter"), Some(&1.into()));
/// assert!(next.get("theme").unwrap().ptr_eq(&state.get("theme").unwrap()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field with a fresh allocation.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), Field::new(value));
    }

    /// Shared handle to a field. Cheap: clones an `Arc`.
    pub fn get(&self, key: &str) -> Option<Field> {
        self.fields.get(key).cloned()
    }

    /// Borrow a field's JSON value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).map(Field::value)
    }

    /// Whether the record has a field named `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a record from a JSON object.
    ///
    /// Fails with [`StoreError::InvalidState`] for any other JSON kind.
    pub fn from_json(value: Value) -> Result<Self> {
        object_fields(value)
            .map(|fields| Self { fields })
            .map_err(|found| StoreError::InvalidState { found })
    }

    /// Build a patch record from a JSON object.
    ///
    /// Fails with [`StoreError::InvalidPatch`] for any other JSON kind.
    pub fn patch_from_json(value: Value) -> Result<Self> {
        object_fields(value)
            .map(|fields| Self { fields })
            .map_err(|found| StoreError::InvalidPatch { found })
    }

    /// Render the record as a JSON object.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.value().clone()))
            .collect();
        Value::Object(map)
    }
}

fn object_fields(value: Value) -> std::result::Result<BTreeMap<String, Field>, &'static str> {
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, Field::from(v))).collect()),
        other => Err(json_kind(&other)),
    }
}

impl Merge for Record {
    type Partial = Record;

    fn merge(&self, partial: Record) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(partial.fields);
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_only_patched_keys() {
        let state = Record::new()
            .with("counter", 0)
            .with("theme", "light")
            .with("user", json!({ "name": "Alice" }));

        let next = state.merge(Record::new().with("counter", 1));

        assert_eq!(next.value("counter"), Some(&json!(1)));
        assert_eq!(next.value("theme"), Some(&json!("light")));
        assert!(next.get("user").unwrap().ptr_eq(&state.get("user").unwrap()));
        assert_eq!(state.value("counter"), Some(&json!(0)));
    }

    #[test]
    fn iter_visits_fields_in_key_order() {
        let record = Record::new().with("theme", "light").with("counter", 0);
        let keys: Vec<&str> = record.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["counter", "theme"]);
        assert_eq!(record.iter().nth(1).map(|(_, v)| v.value()), Some(&json!("light")));
    }

    #[test]
    fn merge_adds_new_keys() {
        let state = Record::new().with("a", 1);
        let next = state.merge(Record::new().with("b", 2));
        assert_eq!(next.len(), 2);
        assert!(next.contains_key("a"));
        assert!(next.contains_key("b"));
    }

    #[test]
    fn scalar_fields_are_identical_by_value() {
        assert!(Field::new("dark").identical(&Field::new("dark")));
        assert!(Field::new(3).identical(&Field::new(3)));
        assert!(!Field::new(3).identical(&Field::new(4)));
    }

    #[test]
    fn compound_fields_are_identical_by_allocation() {
        let a = Field::new(json!({ "name": "Diana" }));
        let b = Field::new(json!({ "name": "Diana" }));
        assert!(!a.identical(&b));
        assert!(a.identical(&a.clone()));
        assert_eq!(a, b);
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert_eq!(
            Record::from_json(json!(42)),
            Err(StoreError::InvalidState { found: "number" })
        );
        assert_eq!(
            Record::patch_from_json(json!("counter")),
            Err(StoreError::InvalidPatch { found: "string" })
        );
    }

    #[test]
    fn json_round_trip_through_serde() {
        let value = json!({ "counter": 2, "notifications": [] });
        let record: Record = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.to_json(), value);
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }
}
