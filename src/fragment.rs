//! Fragments
//!
//! A fragment is one YAML document from a data block, keyed by exactly one
//! top-level key that names its kind. Each kind is normalized, decomposed and
//! validated here before the assembler merges it into the description.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::description::{Example, Route, Subject};
use crate::error::{CompileError, Result};
use crate::merge::kind_name;
use crate::paths::{decompose_route, decompose_subject};
use crate::types::{normalize, TypeNode};
use crate::validate::{validate_type_defs, yaml_excerpt, MetaSchemaKind, MetaSchemas};

// =============================================================================
// Fragment Kinds
// =============================================================================

/// The top-level keys a fragment document may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    TypePreambles,
    TypeDefs,
    HttpRoutes,
    Subjects,
    Examples,
}

impl FragmentKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "typePreambles" => Some(FragmentKind::TypePreambles),
            "typeDefs" => Some(FragmentKind::TypeDefs),
            "httpRoutes" => Some(FragmentKind::HttpRoutes),
            "subjects" => Some(FragmentKind::Subjects),
            "examples" => Some(FragmentKind::Examples),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            FragmentKind::TypePreambles => "typePreambles",
            FragmentKind::TypeDefs => "typeDefs",
            FragmentKind::HttpRoutes => "httpRoutes",
            FragmentKind::Subjects => "subjects",
            FragmentKind::Examples => "examples",
        }
    }
}

// =============================================================================
// Fragment
// =============================================================================

/// A validated fragment, ready to merge
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    TypePreambles(Map<String, Value>),
    TypeDefs(IndexMap<String, Option<TypeNode>>),
    HttpRoutes(IndexMap<String, Route>),
    Subjects(IndexMap<String, Subject>),
    Example { group: String, example: Example },
}

impl Fragment {
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::TypePreambles(_) => FragmentKind::TypePreambles,
            Fragment::TypeDefs(_) => FragmentKind::TypeDefs,
            Fragment::HttpRoutes(_) => FragmentKind::HttpRoutes,
            Fragment::Subjects(_) => FragmentKind::Subjects,
            Fragment::Example { .. } => FragmentKind::Examples,
        }
    }

    /// The tree merged into the description
    pub fn into_value(self) -> Result<Value> {
        let key = self.kind().key();
        let body = match self {
            Fragment::TypePreambles(preambles) => Value::Object(preambles),
            Fragment::TypeDefs(defs) => Value::Object(
                defs.into_iter()
                    .map(|(name, node)| (name, node.map(Value::from).unwrap_or(Value::Null)))
                    .collect(),
            ),
            Fragment::HttpRoutes(routes) => serde_json::to_value(routes)?,
            Fragment::Subjects(subjects) => serde_json::to_value(subjects)?,
            Fragment::Example { group, example } => single_entry(group, json!([serde_json::to_value(example)?])),
        };
        Ok(single_entry(key.to_string(), body))
    }
}

fn single_entry(key: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key, value);
    Value::Object(map)
}

// =============================================================================
// Parsing and Dispatch
// =============================================================================

/// Parse a block as a YAML document stream
pub fn parse_documents(text: &str) -> std::result::Result<Vec<Value>, serde_yaml::Error> {
    serde_yaml::Deserializer::from_str(text)
        .map(Value::deserialize)
        .collect()
}

/// Turn the documents of one block into fragments.
///
/// Empty documents are ignored and unknown kinds are skipped with a warning.
/// An `examples` header takes the following document as its body, even an
/// empty one. Shape and validation failures are fatal.
pub fn dispatch(documents: Vec<Value>, metas: &MetaSchemas, origin: &str) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();
    let mut documents = documents.into_iter();

    while let Some(document) = documents.next() {
        if document.is_null() {
            continue;
        }
        let key = single_key(&document, origin)?;
        let kind = match FragmentKind::from_key(&key) {
            Some(kind) => kind,
            None => {
                warn!("Skipping fragment with unknown key '{}' in {}", key, origin);
                continue;
            }
        };
        debug!(kind = kind.key(), origin, "dispatching fragment");

        let fragment = match kind {
            FragmentKind::TypePreambles => type_preambles(document, metas, origin)?,
            FragmentKind::TypeDefs => type_defs(document, origin)?,
            FragmentKind::HttpRoutes => http_routes(document, metas, origin)?,
            FragmentKind::Subjects => subjects(document, metas, origin)?,
            FragmentKind::Examples => match documents.next() {
                Some(body) => example(document, body, metas)?,
                None => {
                    warn!(
                        "Skipping example without a body document in {}:\n{}",
                        origin,
                        yaml_excerpt(&document)
                    );
                    continue;
                }
            },
        };
        fragments.push(fragment);
    }

    Ok(fragments)
}

fn single_key(document: &Value, origin: &str) -> Result<String> {
    let map = document.as_object().ok_or_else(|| shape_error(
        origin,
        format!("top level must be a mapping, found a {}", kind_name(document)),
        document,
    ))?;
    match map.keys().next() {
        Some(key) if map.len() == 1 => Ok(key.clone()),
        _ => Err(shape_error(
            origin,
            format!("expected exactly one top-level key, found {}", map.len()),
            document,
        )),
    }
}

fn shape_error(origin: &str, reason: String, document: &Value) -> CompileError {
    CompileError::FragmentShape {
        document: origin.to_string(),
        reason,
        excerpt: yaml_excerpt(document),
    }
}

fn body_mapping(document: &Value, kind: FragmentKind, origin: &str) -> Result<Map<String, Value>> {
    match &document[kind.key()] {
        Value::Object(map) => Ok(map.clone()),
        other => Err(shape_error(
            origin,
            format!("'{}' must hold a mapping, found a {}", kind.key(), kind_name(other)),
            document,
        )),
    }
}

fn type_preambles(document: Value, metas: &MetaSchemas, origin: &str) -> Result<Fragment> {
    metas.validate(MetaSchemaKind::TypePreambles, &document)?;
    Ok(Fragment::TypePreambles(body_mapping(&document, FragmentKind::TypePreambles, origin)?))
}

fn type_defs(document: Value, origin: &str) -> Result<Fragment> {
    let body = body_mapping(&document, FragmentKind::TypeDefs, origin)?;
    let mut defs = IndexMap::new();
    for (name, def) in &body {
        let node = match normalize(name, def) {
            Ok(node) => Some(node),
            Err(err) => {
                error!("Dropping type definition '{}' from {}: {}\n{}", name, origin, err, yaml_excerpt(def));
                None
            }
        };
        defs.insert(name.clone(), node);
    }
    validate_type_defs(&defs, &document)?;
    Ok(Fragment::TypeDefs(defs))
}

fn http_routes(document: Value, metas: &MetaSchemas, origin: &str) -> Result<Fragment> {
    metas.validate(MetaSchemaKind::HttpRoutes, &document)?;
    let mut routes = IndexMap::new();
    for (mount_point, raw) in body_mapping(&document, FragmentKind::HttpRoutes, origin)? {
        let mut route: Route = serde_json::from_value(raw)?;
        let template = decompose_route(&route.route);
        route.prefix = template.prefix;
        route.params = template.params;
        routes.insert(mount_point, route);
    }
    Ok(Fragment::HttpRoutes(routes))
}

fn subjects(mut document: Value, metas: &MetaSchemas, origin: &str) -> Result<Fragment> {
    let mut body = body_mapping(&document, FragmentKind::Subjects, origin)?;
    for raw in body.values_mut() {
        let template = match raw.get("subject").and_then(Value::as_str) {
            Some(subject) => decompose_subject(subject),
            // left for the meta-schema to report
            None => continue,
        };
        if let Some(entry) = raw.as_object_mut() {
            entry.insert("baseSubject".into(), Value::String(template.base));
            entry.insert("parts".into(), json!(template.parts));
            entry.insert("wildcards".into(), serde_json::to_value(&template.wildcards)?);
        }
    }
    document[FragmentKind::Subjects.key()] = Value::Object(body.clone());
    metas.validate(MetaSchemaKind::Subjects, &document)?;

    let mut subjects = IndexMap::new();
    for (name, raw) in body {
        subjects.insert(name, serde_json::from_value::<Subject>(raw)?);
    }
    Ok(Fragment::Subjects(subjects))
}

fn example(header: Value, body: Value, metas: &MetaSchemas) -> Result<Fragment> {
    metas.validate(MetaSchemaKind::ExampleHeader, &header)?;
    let (group, entry) = header[FragmentKind::Examples.key()]
        .as_object()
        .and_then(|groups| groups.iter().next())
        .map(|(group, entry)| (group.clone(), entry.clone()))
        .unwrap_or_default();

    let mut example: Example = serde_json::from_value(entry)?;
    example.example = body;
    Ok(Fragment::Example { group, example })
}
