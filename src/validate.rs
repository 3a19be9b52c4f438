//! Fragment Validation
//!
//! Every fragment kind except `typeDefs` is checked against a JSON Schema
//! embedded from `meta/` and compiled once per compilation. Type definitions
//! are already draft-level schema fragments, so they are checked structurally
//! instead: each passthrough keyword must carry a value of the right shape.
//!
//! Any failure is fatal. Artifacts are generated from these fragments, so a
//! malformed one invalidates the whole compilation unit.

use include_dir::{include_dir, Dir};
use indexmap::IndexMap;
use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde_json::Value;

use crate::error::{CompileError, Result};
use crate::merge::join_path;
use crate::types::{TypeKind, TypeNode};

static META_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/meta");

// =============================================================================
// Meta-Schema Kinds
// =============================================================================

/// Fragments that have a meta-schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaSchemaKind {
    TypePreambles,
    HttpRoutes,
    Subjects,
    ExampleHeader,
}

impl MetaSchemaKind {
    pub const ALL: [MetaSchemaKind; 4] = [
        MetaSchemaKind::TypePreambles,
        MetaSchemaKind::HttpRoutes,
        MetaSchemaKind::Subjects,
        MetaSchemaKind::ExampleHeader,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetaSchemaKind::TypePreambles => "typePreambles",
            MetaSchemaKind::HttpRoutes => "httpRoutes",
            MetaSchemaKind::Subjects => "subjects",
            MetaSchemaKind::ExampleHeader => "exampleHeader",
        }
    }

    fn file_name(&self) -> String {
        format!("{}.schema.json", self.name())
    }
}

// =============================================================================
// Meta-Schemas
// =============================================================================

/// The compiled meta-schema set for one compilation
pub struct MetaSchemas {
    compiled: IndexMap<MetaSchemaKind, JSONSchema>,
}

impl MetaSchemas {
    /// Compile every embedded meta-schema
    pub fn compile() -> Result<Self> {
        let mut compiled = IndexMap::new();
        for kind in MetaSchemaKind::ALL {
            let file_name = kind.file_name();
            let source = META_DIR
                .get_file(&file_name)
                .and_then(|file| file.contents_utf8())
                .ok_or_else(|| CompileError::Config(format!("missing embedded meta-schema {}", file_name)))?;
            let schema: Value = serde_json::from_str(source)?;
            let validator = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&schema)
                .map_err(|e| CompileError::Config(format!("meta-schema {} does not compile: {}", file_name, e)))?;
            compiled.insert(kind, validator);
        }
        Ok(Self { compiled })
    }

    /// Validate a whole fragment document (including its top-level key)
    pub fn validate(&self, kind: MetaSchemaKind, fragment: &Value) -> Result<()> {
        let validator = self
            .compiled
            .get(&kind)
            .ok_or_else(|| CompileError::Config(format!("meta-schema {} not compiled", kind.name())))?;

        if let Err(errors) = validator.validate(fragment) {
            let messages: Vec<String> = errors
                .map(|error| format!("{} (at '{}')", error, error.instance_path))
                .collect();
            return Err(CompileError::Validation {
                kind: kind.name(),
                messages,
                excerpt: yaml_excerpt(fragment),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Type Definition Checks
// =============================================================================

const STRING_KEYWORDS: &[&str] = &[
    "$id",
    "$schema",
    "$ref",
    "$anchor",
    "$comment",
    "title",
    "description",
    "format",
    "pattern",
    "contentEncoding",
    "contentMediaType",
];

const ARRAY_KEYWORDS: &[&str] = &["enum", "examples", "required"];

const BOOLEAN_KEYWORDS: &[&str] = &["deprecated", "readOnly", "writeOnly", "uniqueItems"];

const NUMBER_KEYWORDS: &[&str] = &["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf"];

const COUNT_KEYWORDS: &[&str] = &[
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
];

/// Check that every normalized definition is schema-shaped.
///
/// Dropped definitions (`None`) are accepted; they were already reported by
/// the normalizer.
pub fn validate_type_defs(defs: &IndexMap<String, Option<TypeNode>>, fragment: &Value) -> Result<()> {
    let mut messages = Vec::new();
    for (name, node) in defs {
        if let Some(node) = node {
            check_node(name, node, &mut messages);
        }
    }
    if messages.is_empty() {
        Ok(())
    } else {
        Err(CompileError::Validation {
            kind: "typeDefs",
            messages,
            excerpt: yaml_excerpt(fragment),
        })
    }
}

fn check_node(path: &str, node: &TypeNode, messages: &mut Vec<String>) {
    for (keyword, value) in &node.keywords {
        if let Some(problem) = keyword_problem(keyword, value) {
            messages.push(format!("'{}' at '{}' {}", keyword, path, problem));
        }
    }
    match &node.kind {
        TypeKind::Scalar(_) => {}
        TypeKind::Array(items) | TypeKind::Dictionary(items) => {
            if let Some(items) = items {
                check_node(&join_path(path, "items"), items, messages);
            }
        }
        TypeKind::Object(properties) => {
            for (field, child) in properties {
                check_node(&join_path(path, field), child, messages);
            }
        }
    }
}

fn keyword_problem(keyword: &str, value: &Value) -> Option<String> {
    if STRING_KEYWORDS.contains(&keyword) {
        let text = match value.as_str() {
            Some(text) => text,
            None => return Some("must be a string".into()),
        };
        if keyword == "pattern" {
            if let Err(e) = Regex::new(text) {
                return Some(format!("is not a valid regular expression: {}", e));
            }
        }
        return None;
    }
    if ARRAY_KEYWORDS.contains(&keyword) {
        let items = match value.as_array() {
            Some(items) => items,
            None => return Some("must be a list".into()),
        };
        if keyword == "required" && !items.iter().all(Value::is_string) {
            return Some("must list field names".into());
        }
        if keyword == "enum" && items.is_empty() {
            return Some("must not be empty".into());
        }
        return None;
    }
    if BOOLEAN_KEYWORDS.contains(&keyword) && !value.is_boolean() {
        return Some("must be true or false".into());
    }
    if NUMBER_KEYWORDS.contains(&keyword) {
        match value.as_f64() {
            None => return Some("must be a number".into()),
            Some(n) if keyword == "multipleOf" && n <= 0.0 => return Some("must be greater than zero".into()),
            Some(_) => {}
        }
    }
    if COUNT_KEYWORDS.contains(&keyword) && value.as_u64().is_none() {
        return Some("must be a non-negative integer".into());
    }
    if keyword == "additionalProperties" && !(value.is_boolean() || value.is_object()) {
        return Some("must be true, false or a schema".into());
    }
    None
}

/// YAML rendering of a fragment for diagnostics
pub fn yaml_excerpt(value: &Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string())
}
