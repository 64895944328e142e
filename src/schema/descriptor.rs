//! Field descriptors
//!
//! A schema is a tree of entities, each listing its fields in the order they
//! are checked. Entities are shared through `Arc` so one declaration (for
//! example `Score`) can appear under several parents.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Expected type of a field or container element
#[derive(Debug, Clone)]
pub enum FieldType {
    /// Text; numbers are accepted and rendered as text
    String,
    /// Whole number; integral text and floats are accepted
    Integer,
    /// Nullable float; NaN is normalized to the absent marker
    Float,
    /// Either a string or a boolean, kept verbatim
    StringOrBool,
    /// Nested entity
    Entity(Arc<EntitySchema>),
    /// Ordered sequence of the inner type
    Sequence(Box<FieldType>),
    /// Mapping from arbitrary string keys to the inner type
    Mapping(Box<FieldType>),
    /// Sequence whose elements are kept as they are
    AnySequence,
    /// Mapping whose values are kept as they are
    AnyMapping,
}

impl FieldType {
    pub fn entity(schema: &Arc<EntitySchema>) -> Self {
        FieldType::Entity(Arc::clone(schema))
    }

    pub fn sequence_of(inner: FieldType) -> Self {
        FieldType::Sequence(Box::new(inner))
    }

    pub fn mapping_of(inner: FieldType) -> Self {
        FieldType::Mapping(Box::new(inner))
    }

    /// Human-readable name used in type mismatch reports
    pub fn describe(&self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::StringOrBool => "string or boolean".to_string(),
            FieldType::Entity(schema) => format!("mapping ({})", schema.name),
            FieldType::Sequence(inner) => format!("sequence of {}", inner.describe()),
            FieldType::Mapping(inner) => format!("mapping of {}", inner.describe()),
            FieldType::AnySequence => "sequence".to_string(),
            FieldType::AnyMapping => "mapping".to_string(),
        }
    }

    fn json_schema(&self, defs: &mut BTreeMap<&'static str, Value>) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Float => json!({ "type": ["number", "null"] }),
            FieldType::StringOrBool => json!({ "type": ["string", "boolean"] }),
            FieldType::Entity(schema) => {
                schema.collect_defs(defs);
                json!({ "$ref": format!("#/$defs/{}", schema.name) })
            }
            FieldType::Sequence(inner) => {
                json!({ "type": "array", "items": inner.json_schema(defs) })
            }
            FieldType::Mapping(inner) => {
                json!({ "type": "object", "additionalProperties": inner.json_schema(defs) })
            }
            FieldType::AnySequence => json!({ "type": "array" }),
            FieldType::AnyMapping => json!({ "type": "object" }),
        }
    }
}

/// One declared field of an entity
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Exact, case-sensitive key in the input document
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        FieldSpec {
            name,
            ty,
            required: true,
        }
    }

    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        FieldSpec {
            name,
            ty,
            required: false,
        }
    }
}

/// A named entity and its ordered fields
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl EntitySchema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Arc<Self> {
        Arc::new(EntitySchema { name, fields })
    }

    /// Names of every entity reachable from this one, in first-visit order
    pub fn entity_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.name];
        self.walk_entities(&mut |schema| {
            if !names.contains(&schema.name) {
                names.push(schema.name);
            }
        });
        names
    }

    fn walk_entities(&self, visit: &mut dyn FnMut(&EntitySchema)) {
        fn walk_type(ty: &FieldType, visit: &mut dyn FnMut(&EntitySchema)) {
            match ty {
                FieldType::Entity(schema) => {
                    visit(schema);
                    schema.walk_entities(visit);
                }
                FieldType::Sequence(inner) | FieldType::Mapping(inner) => walk_type(inner, visit),
                _ => {}
            }
        }

        for field in &self.fields {
            walk_type(&field.ty, visit);
        }
    }

    fn collect_defs(&self, defs: &mut BTreeMap<&'static str, Value>) {
        if defs.contains_key(self.name) {
            return;
        }
        // Reserve the slot first so shared entities are rendered once
        defs.insert(self.name, Value::Null);
        let body = self.object_schema(defs);
        defs.insert(self.name, body);
    }

    fn object_schema(&self, defs: &mut BTreeMap<&'static str, Value>) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut property = field.ty.json_schema(defs);
            if !field.required {
                property = json!({ "anyOf": [property, { "type": "null" }] });
            } else {
                required.push(Value::String(field.name.to_string()));
            }
            properties.insert(field.name.to_string(), property);
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Render this entity as a JSON Schema (draft 2020-12) document
    pub fn to_json_schema(&self, id: &str) -> Value {
        let mut defs = BTreeMap::new();
        let root = self.object_schema(&mut defs);

        let mut document = Map::new();
        document.insert(
            "$schema".to_string(),
            json!("https://json-schema.org/draft/2020-12/schema"),
        );
        document.insert("$id".to_string(), json!(id));
        document.insert("title".to_string(), json!(self.name));
        if let Value::Object(root) = root {
            document.extend(root);
        }
        document.insert(
            "$defs".to_string(),
            Value::Object(
                defs.into_iter()
                    .map(|(name, body)| (name.to_string(), body))
                    .collect(),
            ),
        );
        Value::Object(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_schema() -> Arc<EntitySchema> {
        let timestamp = EntitySchema::new(
            "Timestamp",
            vec![FieldSpec::required("t", FieldType::Integer)],
        );
        EntitySchema::new(
            "Track",
            vec![
                FieldSpec::required("Start", FieldType::entity(&timestamp)),
                FieldSpec::required(
                    "Marks",
                    FieldType::sequence_of(FieldType::entity(&timestamp)),
                ),
                FieldSpec::optional("Note", FieldType::String),
            ],
        )
    }

    #[test]
    fn test_describe_nested_types() {
        let ty = FieldType::mapping_of(FieldType::sequence_of(FieldType::Float));
        assert_eq!(ty.describe(), "mapping of sequence of float");
    }

    #[test]
    fn test_entity_names_deduplicated() {
        let schema = point_schema();
        assert_eq!(schema.entity_names(), vec!["Track", "Timestamp"]);
    }

    #[test]
    fn test_json_schema_shared_definition() {
        let schema = point_schema();
        let doc = schema.to_json_schema("urn:test");

        assert_eq!(doc["title"], "Track");
        assert_eq!(doc["required"], json!(["Start", "Marks"]));
        assert_eq!(doc["properties"]["Start"]["$ref"], "#/$defs/Timestamp");
        assert_eq!(
            doc["properties"]["Marks"]["items"]["$ref"],
            "#/$defs/Timestamp"
        );
        assert_eq!(doc["$defs"]["Timestamp"]["required"], json!(["t"]));
        assert!(doc["properties"]["Note"]["anyOf"].is_array());
    }
}
