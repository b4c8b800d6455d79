//! Order-preserving JSON documents for package manifests.
//!
//! Text goes through [`parse`] into a [`Value`] tree, the caller edits it
//! through the typed accessors on [`JsonObject`] and [`JsonArray`], and
//! [`serialize`] turns it back into indented text with the original key order.
//!
//! ```
//! use manifest_json::{parse, serialize, JsonObject};
//!
//! let mut doc = parse(r#"{"dependencies":{"pkg.a":"1.0.0"}}"#).unwrap();
//! let root = doc.as_object_mut().unwrap();
//! root.get_mut::<JsonObject>("dependencies")
//!     .unwrap()
//!     .insert("pkg.a", "1.1.0");
//!
//! assert!(serialize(&doc).contains(r#""pkg.a": "1.1.0""#));
//! ```

use std::fmt;

mod manifest;
mod parse;
mod serialize;
mod tokenize;
mod value;

pub use manifest::{
    select_updates, update_summary, Manifest, ManifestError, PackageInfo, PackageSource,
    PackageUpdate, UpdateCandidate, DEPENDENCIES_KEY,
};
pub use parse::{parse, parse_tokens, parse_with_options, ParseError, ParseOptions};
pub use serialize::{serialize, serialize_with, Formatting};
pub use tokenize::{Token, TokenKind, TokenizeError, TokenizeErrorKind, Tokenizer};
pub use value::{AccessError, JsonArray, JsonObject, JsonType};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// literal characters `null`
    Null,

    /// literal characters `true` or `false`
    Boolean(bool),

    /// a number, either integer or floating point
    Number(Number),

    /// a string of characters wrapped in double quotes
    String(String),

    /// an array of values
    Array(JsonArray),

    /// an object with key-value pairs, in document order
    Object(JsonObject),
}

/// Numbers keep the integer/float distinction the input text had.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
    /// An integer outside the `i64` range, kept as its literal digits
    BigInteger(String),
}

/// The tag of a [`Value`], used in type-mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    BigInteger,
    Float,
    String,
    Array,
    Object,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(Number::Integer(_)) => ValueKind::Integer,
            Value::Number(Number::BigInteger(_)) => ValueKind::BigInteger,
            Value::Number(Number::Float(_)) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut JsonObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&JsonArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Checked view of this value as `T`.
    pub fn try_as<T: JsonType + ?Sized>(&self) -> Result<&T, AccessError> {
        T::from_value(self).ok_or(AccessError::TypeMismatch {
            expected: T::KIND,
            found: self.kind(),
        })
    }

    pub fn try_as_mut<T: JsonType + ?Sized>(&mut self) -> Result<&mut T, AccessError> {
        let found = self.kind();
        T::from_value_mut(self).ok_or(AccessError::TypeMismatch {
            expected: T::KIND,
            found,
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::BigInteger => "big integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Integer(value))
    }
}

macro_rules! from_small_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(Number::Integer(i64::from(value)))
                }
            }
        )*
    };
}

from_small_integer!(i8, i16, i32, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(Number::Float(f64::from(value)))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::Float(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<JsonObject> for Value {
    fn from(value: JsonObject) -> Self {
        Value::Object(value)
    }
}

impl From<JsonArray> for Value {
    fn from(value: JsonArray) -> Self {
        Value::Array(value)
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}
