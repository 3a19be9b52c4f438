//! Root-type JSON Schemas

use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

use super::GenerationError;
use crate::description::InterfaceDescription;

/// Turns a root-type schema into the content of an artifact
pub trait SchemaGenerator {
    fn generate(&self, type_name: &str, schema: &Value) -> Result<String, GenerationError>;
}

/// Writes the schema itself as pretty JSON, after checking that it compiles
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaWriter;

impl SchemaGenerator for JsonSchemaWriter {
    fn generate(&self, type_name: &str, schema: &Value) -> Result<String, GenerationError> {
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| GenerationError::Schema {
                type_name: type_name.to_string(),
                message: format!("{} at '{}'", e, e.instance_path),
            })?;
        let mut content = serde_json::to_string_pretty(schema)?;
        content.push('\n');
        Ok(content)
    }
}

/// The standalone schema of a root type.
///
/// Starts from the preamble, defaults `title` to the type name, adds the
/// definition and carries every surviving definition under `$defs` so local
/// references resolve.
pub fn root_type_schema(description: &InterfaceDescription, type_name: &str) -> Option<Value> {
    let definition = description.type_def(type_name)?;

    let mut schema = description.type_preambles.get(type_name).cloned().unwrap_or_default();
    schema
        .entry("title")
        .or_insert_with(|| Value::String(type_name.to_string()));
    if let Value::Object(body) = definition.to_json_schema() {
        schema.extend(body);
    }

    let defs: Map<String, Value> = description
        .type_defs
        .iter()
        .filter_map(|(name, node)| node.as_ref().map(|node| (name.clone(), node.to_json_schema())))
        .collect();
    schema.insert("$defs".to_string(), Value::Object(defs));

    Some(Value::Object(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description() -> InterfaceDescription {
        InterfaceDescription::from_value(json!({
            "name": "api",
            "typePreambles": {
                "PaymentRequest": {"$schema": "http://json-schema.org/draft-07/schema#", "description": "A payment"}
            },
            "typeDefs": {
                "PaymentRequest": {
                    "type": "object",
                    "properties": {
                        "amount": {"type": "number"},
                        "currency": {"$ref": "#/$defs/Currency"}
                    }
                },
                "Currency": {"type": "string", "enum": ["EUR", "USD"]},
                "Dropped": null
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_root_type_schema() {
        let schema = root_type_schema(&description(), "PaymentRequest").unwrap();
        assert_eq!(schema["title"], json!("PaymentRequest"));
        assert_eq!(schema["description"], json!("A payment"));
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["$defs"]["Currency"]["enum"], json!(["EUR", "USD"]));
        assert!(schema["$defs"].get("Dropped").is_none());
        assert!(root_type_schema(&description(), "Dropped").is_none());
    }

    #[test]
    fn test_writer_validates_and_pretty_prints() {
        let schema = root_type_schema(&description(), "PaymentRequest").unwrap();
        let content = JsonSchemaWriter.generate("PaymentRequest", &schema).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, schema);
        assert!(content.contains("\n  \"title\""));
    }

    #[test]
    fn test_writer_rejects_invalid_schema() {
        let err = JsonSchemaWriter
            .generate("Broken", &json!({"type": "object", "properties": {"a": {"type": 12}}}))
            .unwrap_err();
        assert!(err.to_string().contains("Broken"));
        assert!(err.to_string().contains("reference to another type"));
    }
}
