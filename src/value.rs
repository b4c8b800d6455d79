use indexmap::IndexMap;
use thiserror::Error;

use crate::{Number, Value, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("no entry for key {0:?}")]
    MissingKey(String),
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// A Rust type that one [`Value`] tag can be viewed as.
///
/// Typed getters go through this trait, so asking for the wrong type is an
/// [`AccessError::TypeMismatch`] rather than a conversion.
pub trait JsonType {
    const KIND: ValueKind;

    fn from_value(value: &Value) -> Option<&Self>;

    fn from_value_mut(value: &mut Value) -> Option<&mut Self>;
}

macro_rules! json_type {
    ($ty:ty, $kind:ident, $pattern:pat => $binding:ident) => {
        impl JsonType for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    $pattern => Some($binding),
                    _ => None,
                }
            }

            fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
                match value {
                    $pattern => Some($binding),
                    _ => None,
                }
            }
        }
    };
}

json_type!(bool, Boolean, Value::Boolean(b) => b);
json_type!(i64, Integer, Value::Number(Number::Integer(n)) => n);
json_type!(f64, Float, Value::Number(Number::Float(n)) => n);
json_type!(String, String, Value::String(s) => s);
json_type!(JsonObject, Object, Value::Object(o) => o);
json_type!(JsonArray, Array, Value::Array(a) => a);

impl JsonType for str {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Option<&Self> {
        match value {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn from_value_mut(value: &mut Value) -> Option<&mut Self> {
        match value {
            Value::String(s) => Some(s.as_mut_str()),
            _ => None,
        }
    }
}

/// String-keyed map of values that remembers insertion order.
#[derive(Debug, Clone, Default)]
pub struct JsonObject {
    entries: IndexMap<String, Value>,
}

impl JsonObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Untyped lookup.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Fetches `key` and checks that the stored value is a `T`.
    pub fn get<T: JsonType + ?Sized>(&self, key: &str) -> Result<&T, AccessError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| AccessError::MissingKey(key.to_string()))?;
        value.try_as()
    }

    pub fn get_mut<T: JsonType + ?Sized>(&mut self, key: &str) -> Result<&mut T, AccessError> {
        let value = self
            .entries
            .get_mut(key)
            .ok_or_else(|| AccessError::MissingKey(key.to_string()))?;
        value.try_as_mut()
    }

    /// Replacing an existing key keeps its position; new keys go last.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key` and closes the gap, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// IndexMap equality ignores order; documents compare in order.
impl PartialEq for JsonObject {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for JsonObject {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = JsonObject::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl IntoIterator for JsonObject {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Ordered sequence of values; mixed types are fine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonArray {
    elements: Vec<Value>,
}

impl JsonArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.elements.push(value.into());
    }

    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// Fetches the element at `index` and checks that it is a `T`.
    pub fn get<T: JsonType + ?Sized>(&self, index: usize) -> Result<&T, AccessError> {
        let len = self.elements.len();
        let value = self
            .elements
            .get(index)
            .ok_or(AccessError::IndexOutOfBounds { index, len })?;
        value.try_as()
    }

    pub fn get_mut<T: JsonType + ?Sized>(&mut self, index: usize) -> Result<&mut T, AccessError> {
        let len = self.elements.len();
        let value = self
            .elements
            .get_mut(index)
            .ok_or(AccessError::IndexOutOfBounds { index, len })?;
        value.try_as_mut()
    }

    pub fn remove(&mut self, index: usize) -> Result<Value, AccessError> {
        if index >= self.elements.len() {
            return Err(AccessError::IndexOutOfBounds {
                index,
                len: self.elements.len(),
            });
        }
        Ok(self.elements.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.elements.iter()
    }
}

impl<V: Into<Value>> FromIterator<V> for JsonArray {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IntoIterator for JsonArray {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a JsonArray {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
