use std::{borrow::Cow, fmt::Debug};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{MaybeSync, Shared, number::Number};

pub type Map = FxHashMap<SmolStr, Value>;

/// A model object supplied by the host, looked up field by field.
pub trait HostObject: Debug + MaybeSync {
    fn field(&self, key: &str) -> Option<Value>;

    /// Text emitted when the object itself is referenced; `None` makes it unrenderable.
    fn text(&self) -> Option<String> {
        None
    }
}

/// A parameter value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    String(String),
    Number(Number),
    Bool(bool),
    Map(Shared<Map>),
    Object(Shared<dyn HostObject>),
    #[default]
    None,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Shared::ptr_eq(a, b),
            (Value::None, Value::None) => true,
            _ => false,
        }
    }
}

impl Value {
    pub fn empty_map() -> Self {
        Value::Map(Shared::new(Map::default()))
    }

    pub fn object(object: impl HostObject + 'static) -> Self {
        Value::Object(Shared::new(object))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::None => "none",
        }
    }

    /// The text emitted for this value, or `None` if it has no text form.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(true) => Some(Cow::Borrowed("true")),
            Value::Bool(false) => Some(Cow::Borrowed("false")),
            Value::None => Some(Cow::Borrowed("")),
            Value::Object(object) => object.text().map(Cow::Owned),
            Value::Map(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(Shared::new(map))
    }
}

/// A sequence becomes a map keyed by index, so `@items.0` resolves.
impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (SmolStr::new(i.to_string()), value))
            .collect()
    }
}

impl<K: Into<SmolStr>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(Shared::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN).into()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::from)
                .collect::<Vec<_>>()
                .into(),
            serde_json::Value::Object(map) => map.into_iter().collect(),
        }
    }
}
