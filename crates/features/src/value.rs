//! Loosely typed configuration values
//!
//! Environment configuration arrives as arbitrary nested maps and sequences
//! of scalars. [`Value`] is the tagged union every evaluator in this crate
//! walks, so dot-path lookups and default resolution never need runtime type
//! inspection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A string-keyed mapping of values
pub type Mapping = BTreeMap<String, Value>;

/// A configuration value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Floating point scalar
    Float(f64),
    /// String scalar
    String(String),
    /// Ordered sequence
    Sequence(Vec<Value>),
    /// String-keyed mapping
    Mapping(Mapping),
}

impl Value {
    /// Create an empty mapping value
    pub fn mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Short name of the value's kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a direct child key of a mapping
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Resolve a dot-separated path (e.g. `observability.enabled`)
    ///
    /// Returns `None` as soon as a segment is missing or an intermediate
    /// value is not a mapping.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |current, segment| current.get(segment))
    }

    /// Deep-merge `overlay` into `self`
    ///
    /// Mappings merge key by key; any other overlay value replaces the
    /// existing one.
    pub fn merge(&mut self, overlay: Value) {
        match (self, overlay) {
            (Value::Mapping(base), Value::Mapping(over)) => {
                for (key, value) in over {
                    match base.get_mut(&key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
            }
            (slot, value) => *slot = value,
        }
    }

    /// `%v`-style string form; nil renders as the empty string
    pub fn to_plain_string(&self) -> String {
        self.to_string()
    }

    /// Truthiness used by logical operators: nil is false, booleans are themselves
    pub(crate) fn truthy(&self) -> Option<bool> {
        match self {
            Self::Null => Some(false),
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Typed equality; integers and floats compare numerically
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Mapping(map) => {
                f.write_str("map[")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Self::Mapping(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_deserialize_yaml_tree() {
        let v = yaml("a: 1\nb: [x, 2.5, true, ~]\nc: {d: hello}");
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(
            v.get("b"),
            Some(&Value::Sequence(vec![
                "x".into(),
                Value::Float(2.5),
                Value::Bool(true),
                Value::Null
            ]))
        );
        assert_eq!(v.get_path("c.d"), Some(&Value::from("hello")));
    }

    #[test]
    fn test_get_path_stops_at_scalar() {
        let v = yaml("a: {b: scalar}");
        assert!(v.get_path("a.b.c").is_none());
        assert!(v.get_path("missing.b").is_none());
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_ne!(Value::Int(3), Value::from("3"));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(yaml("[a, 1]").to_string(), "[a 1]");
        assert_eq!(yaml("{b: 2, a: 1}").to_string(), "map[a:1 b:2]");
    }

    #[test]
    fn test_merge_overlay_wins_and_deep_merges() {
        let mut base = yaml("a: {x: 1, y: 2}\nb: keep");
        base.merge(yaml("a: {y: 3, z: 4}\nc: new"));
        assert_eq!(base, yaml("a: {x: 1, y: 3, z: 4}\nb: keep\nc: new"));
    }

    #[test]
    fn test_serialize_roundtrip_json() {
        let v = yaml("name: demo\nreplicas: 3\nratio: 0.5\nenabled: false\nnone: ~");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(
            json,
            r#"{"enabled":false,"name":"demo","none":null,"ratio":0.5,"replicas":3}"#
        );
    }
}
