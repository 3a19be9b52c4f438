//! Deep Merge
//!
//! Structural merge of document trees. Every fragment of an interface
//! description is folded into the unified description through [`merge`].
//!
//! Rules at each level:
//! - mapping into mapping: absent keys are inserted, mapping values recurse,
//!   sequence values are concatenated, scalars are overwritten
//! - sequence into sequence: the addition is appended
//! - anything else is a type conflict
//!
//! A conflict below the root is logged and only that subtree is skipped. A
//! conflict at the root is returned to the caller.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{CompileError, Result};

/// Merge `addition` into `target` in place.
///
/// `path` is the dotted location of `target` inside the whole tree and is only
/// used for diagnostics (pass `""` for the root).
pub fn merge(target: &mut Value, addition: Value, path: &str) -> Result<()> {
    match (target, addition) {
        (Value::Object(existing), Value::Object(new)) => {
            merge_mappings(existing, new, path);
            Ok(())
        }
        (Value::Array(existing), Value::Array(new)) => {
            existing.extend(new);
            Ok(())
        }
        (existing, new) => Err(CompileError::MergeConflict {
            path: display_path(path),
            existing: kind_name(existing),
            addition: kind_name(&new),
        }),
    }
}

fn merge_mappings(existing: &mut Map<String, Value>, new: Map<String, Value>, path: &str) {
    for (key, value) in new {
        let child_path = join_path(path, &key);
        match existing.get_mut(&key) {
            // a null slot is a dropped definition; treat it as absent
            Some(slot) if !slot.is_null() => {
                if is_container(slot) || is_container(&value) {
                    if let Err(err) = merge(slot, value, &child_path) {
                        warn!("{}", err);
                        warn!("Stopping merge at {}", display_path(&child_path));
                    }
                } else {
                    if *slot != value {
                        debug!(path = %child_path, old = %slot, new = %value, "overwriting scalar value");
                    }
                    *slot = value;
                }
            }
            _ => {
                existing.insert(key, value);
            }
        }
    }
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

/// Append a key to a dotted path
pub fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

/// Human readable name of a value's kind
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
