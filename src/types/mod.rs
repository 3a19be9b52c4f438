//! Type Nodes
//!
//! The canonical representation of a declared data type. Source documents use
//! an abbreviated grammar (see [`normalize`]); everything downstream of the
//! assembler only ever sees [`TypeNode`].
//!
//! Two renderings exist:
//! - [`TypeNode::to_value`]: the canonical tree stored in the interface
//!   description. Normalizing it again yields the same node.
//! - [`TypeNode::to_json_schema`]: the JSON-Schema shape handed to schema
//!   generators and templates (dictionaries become `additionalProperties`).

pub mod keywords;
mod normalize;

pub use normalize::{normalize, NormalizationError};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Type Node
// =============================================================================

/// A normalized type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct TypeNode {
    /// Which variant this node is
    pub kind: TypeKind,

    /// `default` value, copied verbatim from the source
    pub default: Option<Value>,

    /// Passthrough JSON-Schema keywords (title, enum, pattern, ...)
    pub keywords: Map<String, Value>,
}

/// The tagged variant of a [`TypeNode`]
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// A primitive (`string`, `number`, ...); no name when only keywords were given
    Scalar(Option<String>),

    /// Sequence of `items`
    Array(Option<Box<TypeNode>>),

    /// String-keyed map of `items`
    Dictionary(Option<Box<TypeNode>>),

    /// Named fields
    Object(IndexMap<String, TypeNode>),
}

impl TypeNode {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            default: None,
            keywords: Map::new(),
        }
    }

    /// A named scalar (`string`, `integer`, ...)
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Scalar(Some(name.into())))
    }

    /// Look up an object field
    pub fn property(&self, name: &str) -> Option<&TypeNode> {
        match &self.kind {
            TypeKind::Object(properties) => properties.get(name),
            _ => None,
        }
    }

    /// The `enum` keyword, if it holds a list
    pub fn enum_values(&self) -> Option<&Vec<Value>> {
        self.keywords.get("enum").and_then(Value::as_array)
    }

    /// The type name written into `type`, if any
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Scalar(name) => name.as_deref(),
            TypeKind::Array(_) => Some("array"),
            TypeKind::Dictionary(_) => Some("dictionary"),
            TypeKind::Object(_) => Some("object"),
        }
    }

    /// Canonical tree form
    pub fn to_value(&self) -> Value {
        self.render(Dialect::Canonical)
    }

    /// JSON-Schema form
    pub fn to_json_schema(&self) -> Value {
        self.render(Dialect::JsonSchema)
    }

    fn render(&self, dialect: Dialect) -> Value {
        let mut out = Map::new();
        match &self.kind {
            TypeKind::Scalar(name) => {
                if let Some(name) = name {
                    out.insert("type".into(), Value::String(name.clone()));
                }
            }
            TypeKind::Array(items) => {
                out.insert("type".into(), "array".into());
                if let Some(items) = items {
                    out.insert("items".into(), items.render(dialect));
                }
            }
            TypeKind::Dictionary(items) => match dialect {
                Dialect::Canonical => {
                    out.insert("type".into(), "dictionary".into());
                    out.insert("keys".into(), "string".into());
                    if let Some(items) = items {
                        out.insert("items".into(), items.render(dialect));
                    }
                }
                Dialect::JsonSchema => {
                    out.insert("type".into(), "object".into());
                    if let Some(items) = items {
                        out.insert("additionalProperties".into(), items.render(dialect));
                    }
                }
            },
            TypeKind::Object(properties) => {
                out.insert("type".into(), "object".into());
                let rendered: Map<String, Value> = properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.render(dialect)))
                    .collect();
                out.insert("properties".into(), Value::Object(rendered));
            }
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        for (key, value) in &self.keywords {
            // the dictionary's own additionalProperties wins over a passthrough one
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

#[derive(Debug, Clone, Copy)]
enum Dialect {
    Canonical,
    JsonSchema,
}

impl TryFrom<Value> for TypeNode {
    type Error = NormalizationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        normalize("", &value)
    }
}

impl From<TypeNode> for Value {
    fn from(node: TypeNode) -> Self {
        node.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dictionary_json_schema_form() {
        let node = normalize("T", &json!({"dictionary-shorthand": "integer"})).unwrap();
        assert_eq!(
            node.to_json_schema(),
            json!({"type": "object", "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_nested_json_schema_form() {
        let node = normalize(
            "Order",
            &json!({
                "lines": {"array-shorthand": {"sku": "string", "qty": "integer"}},
                "attributes": {"dictionary-shorthand": {"array-shorthand": "string"}}
            }),
        )
        .unwrap();
        assert_eq!(
            node.to_json_schema(),
            json!({
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "sku": {"type": "string"},
                                "qty": {"type": "integer"}
                            }
                        }
                    },
                    "attributes": {
                        "type": "object",
                        "additionalProperties": {"type": "array", "items": {"type": "string"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_serde_round_trip_through_value() {
        let node = normalize("T", &json!({"name": "string", "tags": {"array-shorthand": "string"}})).unwrap();
        let value = serde_json::to_value(&node).unwrap();
        let back: TypeNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_null_deserializes_to_none() {
        let defs: IndexMap<String, Option<TypeNode>> =
            serde_json::from_value(json!({"Dropped": null, "Kept": {"type": "string"}})).unwrap();
        assert!(defs["Dropped"].is_none());
        assert_eq!(defs["Kept"], Some(TypeNode::scalar("string")));
    }

    #[test]
    fn test_enum_values_and_property_lookup() {
        let node = normalize(
            "entityType",
            &json!({"entityType": {"type": "string", "enum": ["Payment", "Order"]}}),
        )
        .unwrap();
        let field = node.property("entityType").unwrap();
        assert_eq!(field.enum_values().unwrap(), &vec![json!("Payment"), json!("Order")]);
        assert_eq!(field.type_name(), Some("string"));
    }
}
