//! Structural encoder honoring defined field paths
//!
//! Types describe themselves as a [`Node`] tree through [`Encode`]. The
//! [`Encoder`] turns that tree into a document, looking up each struct
//! field in the [`TypeDescriptor`] registered for its type to decide the
//! output key and whether the field is written at all. Fields without a
//! descriptor entry keep their own name. Struct fields are written in
//! declaration order.

use crate::error::{Error, Result};
use features::Value;
use serde_yaml::{Mapping, Number, Value as Yaml};
use std::collections::{BTreeMap, HashMap};

/// An encodable value tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// `None` is a nil sequence; encodes as `[]`
    Seq(Option<Vec<Node>>),
    /// `None` is a nil map; encodes as `{}`
    Map(Option<BTreeMap<String, Node>>),
    /// `None` is a nil pointer; encodes as `null`
    Ptr(Option<Box<Node>>),
    /// `None` is a nil interface; encodes as `null`
    Interface(Option<Box<Node>>),
    Struct(Record),
    /// A value kind with no document form (channel, function, ...)
    Unsupported(String),
}

impl Node {
    /// Shorthand for a present pointer
    pub fn ptr(node: Node) -> Self {
        Self::Ptr(Some(Box::new(node)))
    }

    pub fn seq(items: Vec<Node>) -> Self {
        Self::Seq(Some(items))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Self {
        Self::Map(Some(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Ptr(None) | Self::Interface(None)
        )
    }
}

/// A struct value: its type name and fields in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Private fields are never encoded
    pub exported: bool,
    pub value: Node,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append an exported field
    pub fn field(mut self, name: impl Into<String>, value: impl Encode) -> Self {
        self.fields.push(Field {
            name: name.into(),
            exported: true,
            value: value.to_node(),
        });
        self
    }

    /// Append a private field
    pub fn private(mut self, name: impl Into<String>, value: impl Encode) -> Self {
        self.fields.push(Field {
            name: name.into(),
            exported: false,
            value: value.to_node(),
        });
        self
    }
}

impl From<Record> for Node {
    fn from(record: Record) -> Self {
        Self::Struct(record)
    }
}

/// Conversion into an encodable tree
pub trait Encode {
    fn to_node(&self) -> Node;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn to_node(&self) -> Node {
        (**self).to_node()
    }
}

impl Encode for Node {
    fn to_node(&self) -> Node {
        self.clone()
    }
}

impl Encode for Record {
    fn to_node(&self) -> Node {
        Node::Struct(self.clone())
    }
}

impl Encode for bool {
    fn to_node(&self) -> Node {
        Node::Bool(*self)
    }
}

impl Encode for i64 {
    fn to_node(&self) -> Node {
        Node::Int(*self)
    }
}

impl Encode for i32 {
    fn to_node(&self) -> Node {
        Node::Int(i64::from(*self))
    }
}

impl Encode for u32 {
    fn to_node(&self) -> Node {
        Node::Int(i64::from(*self))
    }
}

impl Encode for f64 {
    fn to_node(&self) -> Node {
        Node::Float(*self)
    }
}

impl Encode for str {
    fn to_node(&self) -> Node {
        Node::String(self.to_string())
    }
}

impl Encode for String {
    fn to_node(&self) -> Node {
        Node::String(self.clone())
    }
}

/// Options encode like pointers: `None` is nil
impl<T: Encode> Encode for Option<T> {
    fn to_node(&self) -> Node {
        Node::Ptr(self.as_ref().map(|v| Box::new(v.to_node())))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn to_node(&self) -> Node {
        Node::Seq(Some(self.iter().map(Encode::to_node).collect()))
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn to_node(&self) -> Node {
        Node::Map(Some(
            self.iter().map(|(k, v)| (k.clone(), v.to_node())).collect(),
        ))
    }
}

/// Loosely typed values sit behind an interface
impl Encode for Value {
    fn to_node(&self) -> Node {
        let inner = match self {
            Value::Null => return Node::Interface(None),
            Value::Bool(b) => Node::Bool(*b),
            Value::Int(i) => Node::Int(*i),
            Value::Float(f) => Node::Float(*f),
            Value::String(s) => Node::String(s.clone()),
            Value::Sequence(items) => Node::seq(items.iter().map(Encode::to_node).collect()),
            Value::Mapping(map) => map.to_node(),
        };
        Node::Interface(Some(Box::new(inner)))
    }
}

/// How one field is written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    /// Output key; `None` keeps the field name
    pub key: Option<String>,
    /// Never written, even when exported
    pub excluded: bool,
    /// Skipped when the encoded value is empty (null, `[]`, `{}`, `""`, `false`, `0`)
    pub omit_empty: bool,
}

/// Field paths declared for one type
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptor {
    fields: HashMap<String, FieldPath>,
}

impl TypeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `field` under `key`
    pub fn rename(mut self, field: &str, key: impl Into<String>) -> Self {
        self.fields.entry(field.to_string()).or_default().key = Some(key.into());
        self
    }

    pub fn exclude(mut self, field: &str) -> Self {
        self.fields.entry(field.to_string()).or_default().excluded = true;
        self
    }

    pub fn omit_empty(mut self, field: &str) -> Self {
        self.fields.entry(field.to_string()).or_default().omit_empty = true;
        self
    }

    /// Set the full path for `field`
    pub fn with_path(mut self, field: &str, path: FieldPath) -> Self {
        self.fields.insert(field.to_string(), path);
        self
    }

    pub fn path(&self, field: &str) -> Option<&FieldPath> {
        self.fields.get(field)
    }
}

/// Encoder configured with per-type field descriptors
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    descriptors: HashMap<String, TypeDescriptor>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the descriptor for `type_name`, replacing any previous one
    pub fn register(mut self, type_name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        self.descriptors.insert(type_name.into(), descriptor);
        self
    }

    /// Serialize `node` to YAML using the registered field paths.
    ///
    /// A missing or nil top-level value is rejected.
    pub fn encode_with_defined_paths(&self, node: Option<&Node>) -> Result<Vec<u8>> {
        let node = node.ok_or_else(|| Error::InvalidInput("nothing to encode".to_string()))?;
        let value = self.encode_value(node)?;
        let text = serde_yaml::to_string(&value)?;
        Ok(text.into_bytes())
    }

    /// Shorthand for any [`Encode`] type
    pub fn encode<T: Encode + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        self.encode_with_defined_paths(Some(&value.to_node()))
    }

    /// Convert `node` into a YAML document value
    pub fn encode_value(&self, node: &Node) -> Result<Yaml> {
        if node.is_nil() {
            return Err(Error::InvalidInput("top-level value is nil".to_string()));
        }
        self.encode_node(node)
    }

    fn encode_node(&self, node: &Node) -> Result<Yaml> {
        match node {
            Node::Null | Node::Ptr(None) | Node::Interface(None) => Ok(Yaml::Null),
            Node::Bool(b) => Ok(Yaml::Bool(*b)),
            Node::Int(i) => Ok(Yaml::Number(Number::from(*i))),
            Node::Float(f) => Ok(Yaml::Number(Number::from(*f))),
            Node::String(s) => Ok(Yaml::String(s.clone())),
            Node::Ptr(Some(inner)) | Node::Interface(Some(inner)) => self.encode_node(inner),
            Node::Seq(None) => Ok(Yaml::Sequence(Vec::new())),
            Node::Seq(Some(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.encode_node(item)
                        .map_err(|e| e.within(format!("[{i}]")))
                })
                .collect::<Result<Vec<_>>>()
                .map(Yaml::Sequence),
            Node::Map(None) => Ok(Yaml::Mapping(Mapping::new())),
            Node::Map(Some(entries)) => entries
                .iter()
                .map(|(key, value)| {
                    let encoded = self
                        .encode_node(value)
                        .map_err(|e| e.within(key.clone()))?;
                    Ok((Yaml::String(key.clone()), encoded))
                })
                .collect::<Result<Mapping>>()
                .map(Yaml::Mapping),
            Node::Struct(record) => self.encode_record(record),
            Node::Unsupported(kind) => Err(Error::UnsupportedType { kind: kind.clone() }),
        }
    }

    fn encode_record(&self, record: &Record) -> Result<Yaml> {
        let descriptor = self.descriptors.get(&record.type_name);
        let mut out = Mapping::new();

        for field in &record.fields {
            if !field.exported {
                continue;
            }
            let path = descriptor.and_then(|d| d.path(&field.name));
            if path.is_some_and(|p| p.excluded) {
                continue;
            }

            let value = self
                .encode_node(&field.value)
                .map_err(|e| e.within(field.name.clone()))?;
            if path.is_some_and(|p| p.omit_empty) && is_empty(&value) {
                continue;
            }

            let key = path
                .and_then(|p| p.key.clone())
                .unwrap_or_else(|| field.name.clone());
            out.insert(Yaml::String(key), value);
        }

        Ok(Yaml::Mapping(out))
    }
}

fn is_empty(value: &Yaml) -> bool {
    match value {
        Yaml::Null => true,
        Yaml::Bool(b) => !b,
        Yaml::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Yaml::String(s) => s.is_empty(),
        Yaml::Sequence(items) => items.is_empty(),
        Yaml::Mapping(map) => map.is_empty(),
        Yaml::Tagged(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(node: &Node, encoder: &Encoder) -> String {
        String::from_utf8(encoder.encode_with_defined_paths(Some(node)).unwrap()).unwrap()
    }

    fn parse(text: &str) -> Yaml {
        serde_yaml::from_str(text).unwrap()
    }

    fn keys(value: &Yaml) -> Vec<&str> {
        value
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Yaml::as_str)
            .collect()
    }

    #[test]
    fn test_nil_top_level_is_invalid() {
        let encoder = Encoder::new();
        assert!(matches!(
            encoder.encode_with_defined_paths(None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            encoder.encode_value(&Node::Ptr(None)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_nil_members_keep_their_shape() {
        let record = Record::new("Holder")
            .field("items", Node::Seq(None))
            .field("labels", Node::Map(None))
            .field("owner", Node::Ptr(None))
            .field("extra", Node::Interface(None));
        let value = Encoder::new().encode_value(&record.into()).unwrap();
        assert_eq!(
            value,
            parse("{items: [], labels: {}, owner: null, extra: null}")
        );
    }

    #[test]
    fn test_field_paths_rename_and_exclude() {
        let encoder = Encoder::new().register(
            "Unit",
            TypeDescriptor::new()
                .rename("depends_on", "dependsOn")
                .exclude("secret"),
        );
        let record = Record::new("Unit")
            .field("name", "ingress")
            .field("depends_on", vec!["policy".to_string()])
            .field("secret", "hunter2")
            .private("cache", 42i64);

        let out = yaml(&record.into(), &encoder);
        assert_eq!(parse(&out), parse("{name: ingress, dependsOn: [policy]}"));
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let encoder = Encoder::new().register(
            "Resource",
            TypeDescriptor::new().rename("api_version", "apiVersion"),
        );
        let record = Record::new("Resource")
            .field("api_version", "v1")
            .field("kind", "ConfigMap")
            .field("metadata", Node::map([("name", Node::String("cfg".into()))]))
            .field("data", Node::Map(None));

        let value = encoder.encode_value(&record.clone().into()).unwrap();
        assert_eq!(keys(&value), ["apiVersion", "kind", "metadata", "data"]);

        let out = yaml(&record.into(), &encoder);
        let lines: Vec<&str> = out.lines().filter(|l| !l.starts_with(' ')).collect();
        assert_eq!(lines, ["apiVersion: v1", "kind: ConfigMap", "metadata:", "data: {}"]);
    }

    #[test]
    fn test_descriptor_applies_per_type() {
        let encoder =
            Encoder::new().register("Outer", TypeDescriptor::new().rename("inner", "child"));
        let inner = Record::new("Inner").field("inner", 1i64);
        let outer = Record::new("Outer").field("inner", inner);
        let value = encoder.encode_value(&outer.into()).unwrap();
        assert_eq!(value, parse("{child: {inner: 1}}"));
    }

    #[test]
    fn test_omit_empty() {
        let encoder = Encoder::new().register(
            "Spec",
            TypeDescriptor::new().omit_empty("prune").omit_empty("patches"),
        );
        let record = Record::new("Spec")
            .field("prune", false)
            .field("patches", Vec::<String>::new())
            .field("path", "");
        let value = encoder.encode_value(&record.into()).unwrap();
        assert_eq!(value, parse("{path: ''}"));
    }

    #[test]
    fn test_unsupported_type_reports_context() {
        let bad = Record::new("Item").field("handler", Node::Unsupported("function".into()));
        let holder = Record::new("Holder").field(
            "items",
            Node::seq(vec![Record::new("Item").field("handler", "ok").into(), bad.into()]),
        );

        let err = Encoder::new().encode_value(&holder.into()).unwrap_err();
        assert_eq!(err.context_path(), "items[1].handler");
        assert!(matches!(
            err.root_cause(),
            Error::UnsupportedType { kind } if kind == "function"
        ));
    }

    #[test]
    fn test_unsupported_inside_map() {
        let node = Node::map([("events", Node::Unsupported("channel".into()))]);
        let err = Encoder::new().encode_value(&node).unwrap_err();
        assert_eq!(err.context_path(), "events");
    }

    #[test]
    fn test_loose_values_encode() {
        let text = "{a: [1, two, {b: null}], c: 1.5}";
        let value: Value = serde_yaml::from_str(text).unwrap();
        let encoded = Encoder::new().encode_value(&value.to_node()).unwrap();
        assert_eq!(encoded, parse(text));
    }
}
