//! Records: attribute maps stored per resource kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single stored entity.
///
/// Records are plain values: the store hands out clones, so mutating a
/// returned record never touches engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// The record id, if it has been assigned.
    pub fn id(&self) -> Option<u64> {
        self.get_u64("id")
    }

    /// Raw field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field as a string slice, if it is a JSON string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Field as an unsigned integer. Numeric strings are accepted.
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.0.get(field).and_then(value_as_u64)
    }

    /// Field as a boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    /// Returns true if the field is absent or null.
    pub fn is_blank(&self, field: &str) -> bool {
        match self.0.get(field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }

    /// String coercion used by filters: absent and null become `""`.
    pub fn field_string(&self, field: &str) -> String {
        self.0.get(field).map(value_to_string).unwrap_or_default()
    }

    /// Integer ids held in a list field (e.g. `collaborator_ids`).
    pub fn id_list(&self, field: &str) -> Vec<u64> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(value_as_u64).collect())
            .unwrap_or_default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Set a field only if it is absent or null.
    pub fn insert_default(&mut self, field: &str, value: impl Into<Value>) {
        if matches!(self.0.get(field), None | Some(Value::Null)) {
            self.0.insert(field.to_string(), value.into());
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Overlay `changes` on top of this record.
    pub fn merge(&mut self, changes: &Map<String, Value>) {
        for (field, value) in changes {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Iterate over `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

/// Coerce a JSON value to the string form used in comparisons.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Interpret a JSON value as an id.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
