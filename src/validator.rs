//! Schema validation and coercion
//!
//! A single depth-first pass over the input, guided by the descriptor tree.
//! Fields are checked in declaration order and the first failure aborts the
//! whole parse. On success the pass yields a normalized `Node` that holds
//! exactly the declared fields, already coerced to their declared types, from
//! which the typed entities are deserialized.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::{session_log_schema, EntitySchema, FieldType};
use crate::types::RawLogFile;
use crate::value::Node;

/// Location of a value inside a document, rendered as `$.Data.ObjectEvents.cam1[2].X`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        FieldPath("$".to_string())
    }

    /// Path of a declared entity field
    pub fn field(&self, name: &str) -> Self {
        FieldPath(format!("{}.{}", self.0, name))
    }

    /// Path of a sequence element
    pub fn index(&self, index: usize) -> Self {
        FieldPath(format!("{}[{}]", self.0, index))
    }

    /// Path of a value under an arbitrary mapping key
    pub fn key(&self, key: &str) -> Self {
        let plain = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if plain {
            self.field(key)
        } else {
            let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key));
            FieldPath(format!("{}[{}]", self.0, quoted))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What went wrong at a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind")]
pub enum ValidationErrorKind {
    #[error("expected a mapping, found {actual}")]
    NotAMapping { actual: String },

    #[error("missing required field")]
    MissingField,

    #[error("expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
}

/// First structural or type mismatch found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct ValidationError {
    pub path: String,
    #[serde(flatten)]
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    fn at(path: &FieldPath, kind: ValidationErrorKind) -> Self {
        ValidationError {
            path: path.to_string(),
            kind,
        }
    }

    fn not_a_mapping(path: &FieldPath, actual: &Node) -> Self {
        Self::at(
            path,
            ValidationErrorKind::NotAMapping {
                actual: actual.kind().to_string(),
            },
        )
    }

    fn missing(path: &FieldPath) -> Self {
        Self::at(path, ValidationErrorKind::MissingField)
    }

    fn mismatch(path: &FieldPath, expected: &FieldType, actual: &Node) -> Self {
        Self::at(
            path,
            ValidationErrorKind::TypeMismatch {
                expected: expected.describe(),
                actual: actual.kind().to_string(),
            },
        )
    }
}

/// Validate and coerce an untyped document into a `RawLogFile`.
///
/// Pure and all-or-nothing: either every declared field is present and
/// convertible, or the first offending path is reported.
pub fn parse(document: &Node) -> Result<RawLogFile, ValidationError> {
    let normalized = validate(session_log_schema(), document)?;
    RawLogFile::deserialize(normalized).map_err(|e| {
        // Only reachable if the descriptor tree and the typed entities disagree
        ValidationError::at(
            &FieldPath::root(),
            ValidationErrorKind::TypeMismatch {
                expected: "RawLogFile".to_string(),
                actual: e.to_string(),
            },
        )
    })
}

/// Validate a document against any entity schema, returning the normalized form
pub fn validate(schema: &EntitySchema, document: &Node) -> Result<Node, ValidationError> {
    validate_entity(schema, document, &FieldPath::root())
}

fn validate_entity(
    schema: &EntitySchema,
    node: &Node,
    path: &FieldPath,
) -> Result<Node, ValidationError> {
    let object = node
        .as_object()
        .ok_or_else(|| ValidationError::not_a_mapping(path, node))?;

    let mut out = IndexMap::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let field_path = path.field(field.name);
        let value = match object.get(field.name) {
            Some(Node::Null) if !field.required => Node::Null,
            Some(value) => validate_value(&field.ty, value, &field_path)?,
            None if field.required => return Err(ValidationError::missing(&field_path)),
            None => Node::Null,
        };
        out.insert(field.name.to_string(), value);
    }
    Ok(Node::Object(out))
}

fn validate_value(ty: &FieldType, node: &Node, path: &FieldPath) -> Result<Node, ValidationError> {
    match ty {
        FieldType::String => {
            coerce_string(node).ok_or_else(|| ValidationError::mismatch(path, ty, node))
        }
        FieldType::Integer => {
            coerce_integer(node).ok_or_else(|| ValidationError::mismatch(path, ty, node))
        }
        FieldType::Float => coerce_float(node)
            .map(normalize_float)
            .ok_or_else(|| ValidationError::mismatch(path, ty, node)),
        FieldType::StringOrBool => match node {
            Node::String(_) | Node::Bool(_) => Ok(node.clone()),
            _ => Err(ValidationError::mismatch(path, ty, node)),
        },
        FieldType::Entity(schema) => validate_entity(schema, node, path),
        FieldType::Sequence(inner) => {
            let items = node
                .as_array()
                .ok_or_else(|| ValidationError::mismatch(path, ty, node))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| validate_value(inner, item, &path.index(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Array)
        }
        FieldType::Mapping(inner) => {
            let map = node
                .as_object()
                .ok_or_else(|| ValidationError::not_a_mapping(path, node))?;
            map.iter()
                .map(|(key, value)| {
                    validate_value(inner, value, &path.key(key)).map(|v| (key.clone(), v))
                })
                .collect::<Result<IndexMap<_, _>, _>>()
                .map(Node::Object)
        }
        FieldType::AnySequence => match node {
            Node::Array(_) => Ok(node.clone()),
            _ => Err(ValidationError::mismatch(path, ty, node)),
        },
        FieldType::AnyMapping => match node {
            Node::Object(_) => Ok(node.clone()),
            _ => Err(ValidationError::not_a_mapping(path, node)),
        },
    }
}

/// The absent-marker hook applied to every float-typed value after coercion
fn normalize_float(value: Option<f64>) -> Node {
    match value {
        Some(f) if !f.is_nan() => Node::Float(f),
        _ => Node::Null,
    }
}

fn coerce_string(node: &Node) -> Option<Node> {
    match node {
        Node::String(_) => Some(node.clone()),
        Node::Bool(b) => Some(Node::from(if *b { "True" } else { "False" })),
        Node::Integer(i) => Some(Node::String(i.to_string())),
        Node::Float(f) => Some(Node::String(float_text(*f))),
        _ => None,
    }
}

/// Decimal text of a float with shortest round-trip digits, `.0` on integral
/// values and a signed exponent of at least two digits (`1e+20`, `1.5e-07`)
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let text = format!("{:?}", f);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

fn coerce_integer(node: &Node) -> Option<Node> {
    match node {
        Node::Integer(_) => Some(node.clone()),
        Node::Bool(b) => Some(Node::Integer(i64::from(*b))),
        // Truncate toward zero; the range check keeps the cast exact
        Node::Float(f) if f.is_finite() && f.abs() < 9.2e18 => {
            Some(Node::Integer(f.trunc() as i64))
        }
        Node::String(s) => s.trim().parse::<i64>().ok().map(Node::Integer),
        _ => None,
    }
}

/// `Some(None)` is an explicit null; the outer `None` means "not a float"
fn coerce_float(node: &Node) -> Option<Option<f64>> {
    match node {
        Node::Null => Some(None),
        Node::Float(f) => Some(Some(*f)),
        Node::Integer(i) => Some(Some(*i as f64)),
        Node::Bool(b) => Some(Some(f64::from(u8::from(*b)))),
        Node::String(s) => s.trim().parse::<f64>().ok().map(Some),
        _ => None,
    }
}
