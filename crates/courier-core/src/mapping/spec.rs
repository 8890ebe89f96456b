//! Mapping specification types
//!
//! A mapping spec is an ordered map from destination key to mapping node.
//! Nodes form a closed set: a bare JSON literal, a typed field reference,
//! an array node with a nested element mapping, or an object node with a
//! nested mapping. Specs are data, deserialized straight from provider
//! configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::MappingError;

/// Ordered destination-key to node map
pub type MappingSpec = BTreeMap<String, MappingNode>;

/// Scalar coercion target for field references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
        }
    }
}

/// A typed reference to a dotted source path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Dotted path into the source object, e.g. "result.dateToSend"
    pub field: String,

    /// Declared scalar type; the looked-up value is coerced to it
    #[serde(rename = "type")]
    pub value_type: ScalarType,

    /// Value used when the source path is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Array node: each element of the referenced array is mapped with the
/// nested mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayMapping {
    #[serde(rename = "type")]
    tag: ArrayTag,

    /// Path to the source array; the source root is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Element mapping
    pub mapping: MappingSpec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ArrayTag {
    #[serde(rename = "array")]
    Array,
}

/// Object node: the referenced sub-object is mapped with the nested mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMapping {
    #[serde(rename = "type")]
    tag: ObjectTag,

    /// Path to the source sub-object
    pub field: String,

    /// Nested mapping
    pub mapping: MappingSpec,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ObjectTag {
    #[serde(rename = "object")]
    Object,
}

/// One node of a mapping spec.
///
/// Untagged: variants are discriminated by their `type` value, with any
/// remaining JSON treated as a literal to copy verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingNode {
    Array(ArrayMapping),
    Object(ObjectMapping),
    Field(FieldMapping),
    Literal(Value),
}

impl ArrayMapping {
    /// Build an array node
    pub fn new(field: Option<String>, mapping: MappingSpec) -> Self {
        Self {
            tag: ArrayTag::Array,
            field,
            mapping,
        }
    }
}

impl ObjectMapping {
    /// Build an object node
    pub fn new(field: impl Into<String>, mapping: MappingSpec) -> Self {
        Self {
            tag: ObjectTag::Object,
            field: field.into(),
            mapping,
        }
    }
}

/// Validate a spec: array/object-shaped nodes that slipped through as
/// literals are missing their required nested mapping.
pub fn validate_spec(spec: &MappingSpec) -> Result<(), MappingError> {
    for (key, node) in spec {
        match node {
            MappingNode::Array(a) => validate_spec(&a.mapping)?,
            MappingNode::Object(o) => validate_spec(&o.mapping)?,
            MappingNode::Field(_) => {}
            MappingNode::Literal(Value::Object(obj)) => {
                if matches!(obj.get("type").and_then(Value::as_str), Some("array" | "object")) {
                    return Err(MappingError::MissingNestedMapping { key: key.clone() });
                }
            }
            MappingNode::Literal(_) => {}
        }
    }
    Ok(())
}

/// How provider response messages are located and shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Single message shape at the response root
    Object,
    /// Messages collected from `paths`, zipped positionally against inputs
    Array,
}

/// Message extraction section of a response mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageExtraction {
    #[serde(rename = "type")]
    pub mode: ExtractionMode,

    /// JSON paths whose array values are concatenated (array mode)
    #[serde(default)]
    pub paths: Vec<String>,

    /// Outcome key to source field reference
    pub mapping: BTreeMap<String, FieldMapping>,
}

/// Response mapping: message extraction plus the status remap table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMapping {
    pub messages: MessageExtraction,

    /// Raw provider status code/string to canonical status. Unmapped raw
    /// statuses resolve to "unknown", never to an error.
    #[serde(default)]
    pub status_map: BTreeMap<String, String>,
}
