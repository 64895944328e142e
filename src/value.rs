//! Untyped document values
//!
//! `Node` is the in-memory form of a decoded log file before validation. It
//! differs from `serde_json::Value` in two ways that matter here: floats may
//! hold NaN (upstream producers emit it), and mappings keep their input order.

use indexmap::IndexMap;
use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{self, SerializeMap, SerializeSeq};
use serde::{forward_to_deserialize_any, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A decoded, not yet validated, document value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Object(IndexMap<String, Node>),
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Integer(v)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::Array(v)
    }
}

impl From<IndexMap<String, Node>> for Node {
    fn from(v: IndexMap<String, Node>) -> Self {
        Node::Object(v)
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Integer(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Node::String(s),
            serde_json::Value::Array(items) => {
                Node::Array(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(map) => {
                Node::Object(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl Node {
    /// Short name of the value's shape, used in type mismatch reports
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Integer(_) => "integer",
            Node::Float(f) if f.is_nan() => "NaN",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Array(_) => "sequence",
            Node::Object(_) => "mapping",
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a field on a mapping node
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|map| map.get(key))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Integer(i) => serializer.serialize_i64(*i),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => Node::Integer(i),
            Err(_) => Node::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Node>()? {
            map.insert(key, value);
        }
        Ok(Node::Object(map))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

// A validated `Node` is turned into typed entities by deserializing from it
// directly, so floats (including infinities) never pass through
// `serde_json::Value`.
impl<'de> Deserializer<'de> for Node {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Node::Null => visitor.visit_unit(),
            Node::Bool(b) => visitor.visit_bool(b),
            Node::Integer(i) => visitor.visit_i64(i),
            Node::Float(f) => visitor.visit_f64(f),
            Node::String(s) => visitor.visit_string(s),
            Node::Array(items) => {
                let mut seq = SeqDeserializer::new(items.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Node::Object(map) => {
                let mut access = MapDeserializer::new(map.into_iter());
                let value = visitor.visit_map(&mut access)?;
                access.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Node::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct enum
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, de::value::Error> for Node {
    type Deserializer = Node;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

// ============================================================================
// Serializing into a Node
// ============================================================================

/// Lower any serializable value to a `Node`.
///
/// Unlike `serde_json::to_value`, non-finite floats survive as `Node::Float`.
pub fn to_node<T: Serialize + ?Sized>(value: &T) -> Result<Node, de::value::Error> {
    value.serialize(NodeSerializer)
}

struct NodeSerializer;

impl Serializer for NodeSerializer {
    type Ok = Node;
    type Error = de::value::Error;

    type SerializeSeq = NodeSeq;
    type SerializeTuple = NodeSeq;
    type SerializeTupleStruct = NodeSeq;
    type SerializeTupleVariant = NodeTupleVariant;
    type SerializeMap = NodeMap;
    type SerializeStruct = NodeMap;
    type SerializeStructVariant = NodeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Node, Self::Error> {
        Ok(Node::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<Node, Self::Error> {
        Ok(Node::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<Node, Self::Error> {
        Ok(Node::Integer(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<Node, Self::Error> {
        Ok(match i64::try_from(v) {
            Ok(i) => Node::Integer(i),
            Err(_) => Node::Float(v as f64),
        })
    }

    fn serialize_f32(self, v: f32) -> Result<Node, Self::Error> {
        Ok(Node::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Node, Self::Error> {
        Ok(Node::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Node, Self::Error> {
        Ok(Node::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Node, Self::Error> {
        Ok(Node::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Node, Self::Error> {
        Ok(Node::Array(
            v.iter().map(|b| Node::Integer(i64::from(*b))).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Node, Self::Error> {
        Ok(Node::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Node, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Node, Self::Error> {
        Ok(Node::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Node, Self::Error> {
        Ok(Node::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Node, Self::Error> {
        Ok(Node::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Node, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node, Self::Error> {
        let mut map = IndexMap::with_capacity(1);
        map.insert(variant.to_string(), to_node(value)?);
        Ok(Node::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<NodeSeq, Self::Error> {
        Ok(NodeSeq {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<NodeSeq, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<NodeSeq, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<NodeTupleVariant, Self::Error> {
        Ok(NodeTupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<NodeMap, Self::Error> {
        Ok(NodeMap {
            map: IndexMap::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<NodeMap, Self::Error> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<NodeStructVariant, Self::Error> {
        Ok(NodeStructVariant {
            variant,
            map: IndexMap::with_capacity(len),
        })
    }
}

struct NodeSeq {
    items: Vec<Node>,
}

impl ser::SerializeSeq for NodeSeq {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.items.push(to_node(value)?);
        Ok(())
    }

    fn end(self) -> Result<Node, Self::Error> {
        Ok(Node::Array(self.items))
    }
}

impl ser::SerializeTuple for NodeSeq {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for NodeSeq {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

struct NodeTupleVariant {
    variant: &'static str,
    items: Vec<Node>,
}

impl ser::SerializeTupleVariant for NodeTupleVariant {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        self.items.push(to_node(value)?);
        Ok(())
    }

    fn end(self) -> Result<Node, Self::Error> {
        let mut map = IndexMap::with_capacity(1);
        map.insert(self.variant.to_string(), Node::Array(self.items));
        Ok(Node::Object(map))
    }
}

struct NodeMap {
    map: IndexMap<String, Node>,
    next_key: Option<String>,
}

impl ser::SerializeMap for NodeMap {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        // Same key policy as serde_json: strings as-is, integers as text
        let key = match to_node(key)? {
            Node::String(s) => s,
            Node::Integer(i) => i.to_string(),
            other => {
                return Err(<de::value::Error as ser::Error>::custom(format!(
                    "mapping key must be a string, found {}",
                    other.kind()
                )))
            }
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| <de::value::Error as ser::Error>::custom("value without a key"))?;
        self.map.insert(key, to_node(value)?);
        Ok(())
    }

    fn end(self) -> Result<Node, Self::Error> {
        Ok(Node::Object(self.map))
    }
}

impl ser::SerializeStruct for NodeMap {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.map.insert(key.to_string(), to_node(value)?);
        Ok(())
    }

    fn end(self) -> Result<Node, Self::Error> {
        Ok(Node::Object(self.map))
    }
}

struct NodeStructVariant {
    variant: &'static str,
    map: IndexMap<String, Node>,
}

impl ser::SerializeStructVariant for NodeStructVariant {
    type Ok = Node;
    type Error = de::value::Error;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.map.insert(key.to_string(), to_node(value)?);
        Ok(())
    }

    fn end(self) -> Result<Node, Self::Error> {
        let mut outer = IndexMap::with_capacity(1);
        outer.insert(self.variant.to_string(), Node::Object(self.map));
        Ok(Node::Object(outer))
    }
}
