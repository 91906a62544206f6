//! Key/value attribute maps carried by log events
//!
//! Values are `serde_json::Value`, so nested maps and sequences are
//! representable and redaction can walk them. Keys are unique; a later
//! insert for an existing key replaces the earlier value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    fields: Map<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Add a field (builder form)
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field (mutable form)
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields.insert(key.into(), value.into());
    }

    /// Add any serializable value, falling back to its `Debug` text when it
    /// cannot be represented as JSON (e.g. maps with non-string keys).
    pub fn insert_serialized<K, T>(&mut self, key: K, value: &T)
    where
        K: Into<String>,
        T: Serialize + fmt::Debug + ?Sized,
    {
        let value = serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{:?}", value)));
        self.fields.insert(key.into(), value);
    }

    /// Add a value through its `Display` rendering
    pub fn insert_display<K, T>(&mut self, key: K, value: &T)
    where
        K: Into<String>,
        T: fmt::Display + ?Sized,
    {
        self.fields.insert(key.into(), Value::String(value.to_string()));
    }

    /// Overlay `other` on top of `self`; keys in `other` win
    pub fn extend_from(&mut self, other: &Attributes) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// New map with `other` overlaid on a copy of `self`
    pub fn overlaid(&self, other: &Attributes) -> Attributes {
        let mut merged = self.clone();
        merged.extend_from(other);
        merged
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}={}", k, s),
                other => format!("{}={}", k, other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}
