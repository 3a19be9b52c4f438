//! Cross-Reference Checks
//!
//! Runs once on the frozen description of the top-level document. Every
//! check collects all of its violations before failing so one run reports
//! everything that is wrong with a given relationship.

use serde_json::Value;
use tracing::warn;

use crate::description::{ExampleContext, InterfaceDescription};
use crate::error::{CompileError, Result};

/// Example group mapping entity types to mount points
pub const ENTITY_INTERFACE_MAPPING: &str = "entityInterfaceMapping";

/// Type definition (and its field) enumerating the entity types
pub const ENTITY_TYPE: &str = "entityType";

/// Run every cross-reference check
pub fn check(description: &InterfaceDescription) -> Result<()> {
    check_entity_mapping(description)?;
    check_type_references(description)?;
    check_example_references(description)?;
    Ok(())
}

/// The entity-interface mapping must pair known entity types with declared
/// mount points
pub fn check_entity_mapping(description: &InterfaceDescription) -> Result<()> {
    let group = description
        .examples
        .get(ENTITY_INTERFACE_MAPPING)
        .ok_or_else(|| missing(format!("no '{}' example group", ENTITY_INTERFACE_MAPPING)))?;
    if group.len() > 1 {
        warn!(
            "'{}' has {} examples; only the first is checked",
            ENTITY_INTERFACE_MAPPING,
            group.len()
        );
    }
    let mapping = match group.first().map(|example| &example.example) {
        None | Some(Value::Null) => {
            return Err(missing(format!("'{}' has no example body", ENTITY_INTERFACE_MAPPING)))
        }
        Some(Value::Object(mapping)) => mapping,
        Some(_) => {
            return Err(missing(format!(
                "the '{}' example must map entity types to mount points",
                ENTITY_INTERFACE_MAPPING
            )))
        }
    };

    if description.http_routes.is_empty() {
        return Err(missing("no httpRoutes are declared".to_string()));
    }
    if description.type_defs.is_empty() {
        return Err(missing("no typeDefs are declared".to_string()));
    }
    let entity_types: Vec<&str> = description
        .type_def(ENTITY_TYPE)
        .ok_or_else(|| missing(format!("typeDefs has no '{}' definition", ENTITY_TYPE)))?
        .property(ENTITY_TYPE)
        .and_then(|field| field.enum_values())
        .ok_or_else(|| {
            missing(format!(
                "'{}' must have an '{}' field with an enum of entity types",
                ENTITY_TYPE, ENTITY_TYPE
            ))
        })?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    let mount_points: Vec<&str> = description.http_routes.keys().map(String::as_str).collect();

    let mut violations = Vec::new();
    for (entity, target) in mapping {
        let targets: Vec<&str> = match target {
            Value::String(mount_point) => vec![mount_point.as_str()],
            Value::Array(items) if items.iter().all(Value::is_string) => {
                items.iter().filter_map(Value::as_str).collect()
            }
            other => {
                violations.push(format!(
                    "entity type '{}' maps to {} instead of a mount point name",
                    entity, other
                ));
                continue;
            }
        };
        if !entity_types.contains(&entity.as_str()) {
            violations.push(format!(
                "entity type '{}' (mapped to {}) is not one of the declared entity types [{}]",
                entity,
                targets.join(", "),
                entity_types.join(", ")
            ));
        }
        for mount_point in targets {
            if !mount_points.contains(&mount_point) {
                violations.push(format!(
                    "mount point '{}' (for entity type '{}') is not one of the declared httpRoutes [{}]",
                    mount_point,
                    entity,
                    mount_points.join(", ")
                ));
            }
        }
    }
    fail_on(violations)
}

/// Routes and subjects may only name declared types
pub fn check_type_references(description: &InterfaceDescription) -> Result<()> {
    let mut violations = Vec::new();
    for (mount_point, route) in &description.http_routes {
        for (field, type_name) in route.referenced_types() {
            if !description.type_defs.contains_key(type_name) {
                violations.push(format!(
                    "route '{}' {} '{}' is not a declared type",
                    mount_point, field, type_name
                ));
            }
        }
    }
    for (name, subject) in &description.subjects {
        if let Some(type_name) = subject.message_type.as_deref() {
            if !description.type_defs.contains_key(type_name) {
                violations.push(format!(
                    "subject '{}' messageType '{}' is not a declared type",
                    name, type_name
                ));
            }
        }
    }
    fail_on(violations)
}

/// Examples may only reference declared mount points and subjects
pub fn check_example_references(description: &InterfaceDescription) -> Result<()> {
    let mut violations = Vec::new();
    for example in description.examples.values().flatten() {
        match example.context() {
            Some(ExampleContext::HttpRoute(mount_point)) if !description.http_routes.contains_key(mount_point) => {
                violations.push(format!(
                    "example '{}' in '{}' references unknown mount point '{}'",
                    example.id, example.group, mount_point
                ));
            }
            Some(ExampleContext::Subject(subject)) if !description.subjects.contains_key(subject) => {
                violations.push(format!(
                    "example '{}' in '{}' references unknown subject '{}'",
                    example.id, example.group, subject
                ));
            }
            _ => {}
        }
    }
    fail_on(violations)
}

fn missing(message: String) -> CompileError {
    CompileError::CrossReference(message)
}

fn fail_on(violations: Vec<String>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CompileError::CrossReference(violations.join("\n")))
    }
}
