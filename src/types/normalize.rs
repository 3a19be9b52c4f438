//! Type Normalization
//!
//! Rewrites the abbreviated type grammar into [`TypeNode`]s.
//!
//! A node is one of three mutually exclusive forms, judged after the
//! passthrough keywords have been set aside:
//! - shorthand: exactly one of `dictionary-shorthand` / `array-shorthand`
//! - real type: any of `type`, `items`, `default`, `keys`, or `properties`
//!   next to `type`
//! - implicit object: every remaining key is a field name
//!
//! A bare string is a scalar type name.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use super::keywords::{is_canonical, is_passthrough, is_shorthand, DICTIONARY_SHORTHAND};
use super::{TypeKind, TypeNode};
use crate::merge::{join_path, kind_name};

/// Why a type definition could not be normalized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("Type definitions must be a mapping or a string; found a {found} at '{path}'")]
    InvalidTypeDefinition { path: String, found: &'static str },

    #[error("'{shorthand}' at '{path}' must be the only key but is combined with: {}", .others.join(", "))]
    MixedShorthand {
        path: String,
        shorthand: String,
        others: Vec<String>,
    },

    #[error("'{path}' mixes real type keys ({}) with abbreviated field names ({})", .canonical.join(", "), .fields.join(", "))]
    MixedRealAndAbbreviated {
        path: String,
        canonical: Vec<String>,
        fields: Vec<String>,
    },
}

/// Normalize one type definition.
///
/// `path` is the dotted field path used in error messages, usually the type
/// name itself.
pub fn normalize(path: &str, node: &Value) -> Result<TypeNode, NormalizationError> {
    match node {
        Value::String(name) => Ok(TypeNode::scalar(name.clone())),
        Value::Object(map) => normalize_mapping(path, map),
        other => Err(NormalizationError::InvalidTypeDefinition {
            path: path.to_string(),
            found: kind_name(other),
        }),
    }
}

fn normalize_mapping(path: &str, map: &Map<String, Value>) -> Result<TypeNode, NormalizationError> {
    let mut keywords = Map::new();
    let mut rest: Vec<(&String, &Value)> = Vec::new();
    for (key, value) in map {
        if is_passthrough(key) {
            keywords.insert(key.clone(), value.clone());
        } else {
            rest.push((key, value));
        }
    }

    if let Some((shorthand, value)) = rest.iter().find(|(key, _)| is_shorthand(key)).copied() {
        if rest.len() > 1 {
            return Err(NormalizationError::MixedShorthand {
                path: path.to_string(),
                shorthand: shorthand.clone(),
                others: rest
                    .iter()
                    .filter(|(key, _)| *key != shorthand)
                    .map(|(key, _)| key.to_string())
                    .collect(),
            });
        }
        let items = Box::new(normalize(&join_path(path, shorthand), value)?);
        let kind = if shorthand == DICTIONARY_SHORTHAND {
            TypeKind::Dictionary(Some(items))
        } else {
            TypeKind::Array(Some(items))
        };
        return Ok(TypeNode {
            kind,
            default: None,
            keywords,
        });
    }

    let has_type = rest.iter().any(|(key, _)| key.as_str() == "type");
    if rest.iter().any(|(key, _)| is_canonical(key, has_type)) {
        let fields: Vec<String> = rest
            .iter()
            .filter(|(key, _)| !is_canonical(key, has_type))
            .map(|(key, _)| key.to_string())
            .collect();
        if !fields.is_empty() {
            return Err(NormalizationError::MixedRealAndAbbreviated {
                path: path.to_string(),
                canonical: rest
                    .iter()
                    .filter(|(key, _)| is_canonical(key, has_type))
                    .map(|(key, _)| key.to_string())
                    .collect(),
                fields,
            });
        }
        return normalize_real(path, &rest, keywords);
    }

    if rest.is_empty() {
        return Ok(TypeNode {
            kind: TypeKind::Scalar(None),
            default: None,
            keywords,
        });
    }

    let properties = normalize_fields(path, rest.into_iter())?;
    Ok(TypeNode {
        kind: TypeKind::Object(properties),
        default: None,
        keywords,
    })
}

fn normalize_fields<'a>(
    path: &str,
    fields: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Result<IndexMap<String, TypeNode>, NormalizationError> {
    fields
        .map(|(name, value)| Ok((name.clone(), normalize(&join_path(path, name), value)?)))
        .collect()
}

fn normalize_real(
    path: &str,
    entries: &[(&String, &Value)],
    keywords: Map<String, Value>,
) -> Result<TypeNode, NormalizationError> {
    let lookup = |name: &str| entries.iter().find(|(key, _)| *key == name).map(|(_, value)| *value);

    let mut node = match lookup("type") {
        Some(declared) => {
            let base = normalize(&join_path(path, "type"), declared)?;
            promote(base)
        }
        None => {
            let kind = if lookup("items").is_some() {
                TypeKind::Array(None)
            } else if lookup("keys").is_some() {
                TypeKind::Dictionary(None)
            } else if lookup("properties").is_some() {
                TypeKind::Object(IndexMap::new())
            } else {
                TypeKind::Scalar(None)
            };
            TypeNode::new(kind)
        }
    };
    node.keywords.extend(keywords);

    if let Some(items) = lookup("items") {
        let items = normalize(&join_path(path, "items"), items)?;
        match &mut node.kind {
            TypeKind::Array(slot) | TypeKind::Dictionary(slot) => *slot = Some(Box::new(items)),
            _ => {
                node.keywords.insert("items".into(), items.to_value());
            }
        }
    }

    if let Some(properties) = lookup("properties") {
        let props_path = join_path(path, "properties");
        let map = properties
            .as_object()
            .ok_or_else(|| NormalizationError::InvalidTypeDefinition {
                path: props_path.clone(),
                found: kind_name(properties),
            })?;
        let normalized = normalize_fields(path, map.iter())?;
        match &mut node.kind {
            TypeKind::Object(slot) => slot.extend(normalized),
            _ => {
                let rendered = normalized
                    .into_iter()
                    .map(|(name, field)| (name, field.to_value()))
                    .collect();
                node.keywords.insert("properties".into(), Value::Object(rendered));
            }
        }
    }

    // `keys` carries no information: dictionary keys are always strings

    if let Some(default) = lookup("default") {
        node.default = Some(default.clone());
    }

    Ok(node)
}

/// Turn the container type names into their variants
fn promote(node: TypeNode) -> TypeNode {
    let kind = match node.kind {
        TypeKind::Scalar(Some(name)) => match name.as_str() {
            "array" => TypeKind::Array(None),
            "dictionary" => TypeKind::Dictionary(None),
            "object" => TypeKind::Object(IndexMap::new()),
            _ => TypeKind::Scalar(Some(name)),
        },
        other => other,
    };
    TypeNode { kind, ..node }
}
