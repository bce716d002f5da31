//! Dynamic value model for configuration documents.
//!
//! A [`ConfigDocument`] owns a parsed JSON tree. Every [`ConfigValue`] handed
//! out by it is a borrowed view into that tree: object and array values never
//! own storage, so they cannot outlive (or double-free) the document.

mod error;

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

pub use error::ValueError;

/// The closed set of kinds a [`ConfigValue`] can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Array,
    None,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::Boolean => "boolean",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::None => "none",
        };
        f.write_str(name)
    }
}

/// A parsed configuration document.
///
/// Created once per fetched store entry. The only way to change its contents
/// is through the crate's explicit mutation APIs (see
/// [`Context::set_topics`](crate::Context::set_topics)).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    root: Value,
}

impl ConfigDocument {
    /// Parses a JSON document.
    pub fn parse(text: &str) -> Result<Self, ValueError> {
        Ok(Self {
            root: serde_json::from_str(text)?,
        })
    }

    /// Wraps an already parsed JSON tree.
    pub fn from_json(root: Value) -> Self {
        Self { root }
    }

    /// Returns a view of the whole document.
    pub fn root(&self) -> ConfigValue<'_> {
        ConfigValue::from_json(&self.root)
    }

    /// Looks up a top-level key.
    pub fn get(&self, key: &str) -> Result<ConfigValue<'_>, ValueError> {
        self.root().as_object_for("<root>")?.get(key)
    }

    pub fn as_json(&self) -> &Value {
        &self.root
    }

    pub fn into_json(self) -> Value {
        self.root
    }

    pub(crate) fn json_mut(&mut self) -> &mut Value {
        &mut self.root
    }
}

impl FromStr for ConfigDocument {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

/// A borrowed, tagged view of one node of a [`ConfigDocument`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue<'a> {
    String(&'a str),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Object(ObjectView<'a>),
    Array(ArrayView<'a>),
    None,
}

impl<'a> ConfigValue<'a> {
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::String(s) => ConfigValue::String(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::Bool(b) => ConfigValue::Boolean(*b),
            Value::Object(map) => ConfigValue::Object(ObjectView(map)),
            Value::Array(items) => ConfigValue::Array(ArrayView(items)),
            Value::Null => ConfigValue::None,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            ConfigValue::String(_) => Kind::String,
            ConfigValue::Integer(_) => Kind::Integer,
            ConfigValue::Float(_) => Kind::Float,
            ConfigValue::Boolean(_) => Kind::Boolean,
            ConfigValue::Object(_) => Kind::Object,
            ConfigValue::Array(_) => Kind::Array,
            ConfigValue::None => Kind::None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            ConfigValue::String(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectView<'a>> {
        match self {
            ConfigValue::Object(view) => Some(*view),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<ArrayView<'a>> {
        match self {
            ConfigValue::Array(view) => Some(*view),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ConfigValue::None)
    }

    /// Like [`as_str`](Self::as_str), reporting a `TypeMismatch` against `key`.
    pub fn as_str_for(&self, key: &str) -> Result<&'a str, ValueError> {
        self.as_str().ok_or_else(|| self.mismatch(key, Kind::String))
    }

    pub fn as_i64_for(&self, key: &str) -> Result<i64, ValueError> {
        self.as_i64().ok_or_else(|| self.mismatch(key, Kind::Integer))
    }

    pub fn as_object_for(&self, key: &str) -> Result<ObjectView<'a>, ValueError> {
        self.as_object().ok_or_else(|| self.mismatch(key, Kind::Object))
    }

    pub fn as_array_for(&self, key: &str) -> Result<ArrayView<'a>, ValueError> {
        self.as_array().ok_or_else(|| self.mismatch(key, Kind::Array))
    }

    /// Copies the viewed subtree out of the document.
    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::String(s) => Value::String((*s).to_string()),
            ConfigValue::Integer(i) => Value::from(*i),
            ConfigValue::Float(f) => Value::from(*f),
            ConfigValue::Boolean(b) => Value::Bool(*b),
            ConfigValue::Object(view) => Value::Object(view.0.clone()),
            ConfigValue::Array(view) => Value::Array(view.0.to_vec()),
            ConfigValue::None => Value::Null,
        }
    }

    fn mismatch(&self, key: &str, expected: Kind) -> ValueError {
        ValueError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: self.kind(),
        }
    }
}

impl fmt::Display for ConfigValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Borrowed view of a JSON object inside a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectView<'a>(&'a Map<String, Value>);

impl<'a> ObjectView<'a> {
    pub fn get(&self, key: &str) -> Result<ConfigValue<'a>, ValueError> {
        self.get_opt(key)
            .ok_or_else(|| ValueError::NotFound(key.to_string()))
    }

    /// Returns `None` when the key is absent. An explicit JSON `null` is
    /// returned as [`ConfigValue::None`].
    pub fn get_opt(&self, key: &str) -> Option<ConfigValue<'a>> {
        self.0.get(key).map(ConfigValue::from_json)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&'a str, ValueError> {
        self.get(key)?.as_str_for(key)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ValueError> {
        self.get(key)?.as_i64_for(key)
    }

    pub fn get_object(&self, key: &str) -> Result<ObjectView<'a>, ValueError> {
        self.get(key)?.as_object_for(key)
    }

    pub fn get_array(&self, key: &str) -> Result<ArrayView<'a>, ValueError> {
        self.get(key)?.as_array_for(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        let map = self.0;
        map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, ConfigValue<'a>)> + 'a {
        let map = self.0;
        map.iter()
            .map(|(k, v)| (k.as_str(), ConfigValue::from_json(v)))
    }
}

/// Borrowed view of a JSON array inside a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayView<'a>(&'a [Value]);

impl<'a> ArrayView<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<ConfigValue<'a>, ValueError> {
        self.0
            .get(index)
            .map(ConfigValue::from_json)
            .ok_or(ValueError::OutOfRange {
                index,
                len: self.0.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = ConfigValue<'a>> + 'a {
        let items = self.0;
        items.iter().map(ConfigValue::from_json)
    }

    /// Collects the elements as strings, failing on the first non-string.
    ///
    /// `key` names the array in the error message.
    pub fn strings(&self, key: &str) -> Result<Vec<&'a str>, ValueError> {
        self.iter().map(|v| v.as_str_for(key)).collect()
    }
}
