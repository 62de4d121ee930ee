//! Case-insensitive view over a raw JSON object.
//!
//! Consul accepts service definitions with any key casing (`"Name"`, `"name"`,
//! `"NAME"` are equivalent), and the announcer must pass unknown fields through to
//! the agent untouched. `CiMap` keeps the original keys and insertion order for
//! serialization and only normalizes casing on lookup.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CiMap {
    entries: IndexMap<String, Value>,
}

impl CiMap {
    /// Wrap a JSON value, returning `None` when it is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            entries: object
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
    }

    /// Case-insensitive lookup. The config objects the announcer inspects hold a
    /// handful of keys, so a linear scan is fine.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Serializes with the original key casing and order, so the body sent to the
/// agent is the one the operator wrote.
impl Serialize for CiMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
