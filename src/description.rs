//! Interface Description
//!
//! The typed, frozen form of a compiled interface. During assembly the
//! description is an untyped tree that fragments are merged into; once every
//! document has been read it is deserialized into [`InterfaceDescription`]
//! and never mutated again.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CompileError, Result};
use crate::paths::WildcardKind;
use crate::types::TypeNode;

// =============================================================================
// Interface Description
// =============================================================================

/// The unified description for one compilation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescription {
    /// Derived from the top-level document path
    pub name: String,

    /// Per-type schema preamble (`$schema`, `$id`, `title`, ...)
    #[serde(default)]
    pub type_preambles: IndexMap<String, Map<String, Value>>,

    /// Normalized definitions; `None` marks a definition dropped during normalization
    #[serde(default)]
    pub type_defs: IndexMap<String, Option<TypeNode>>,

    /// Mount point name -> route
    #[serde(default)]
    pub http_routes: IndexMap<String, Route>,

    /// Subject name -> subject
    #[serde(default)]
    pub subjects: IndexMap<String, Subject>,

    /// Example group -> examples in document order
    #[serde(default)]
    pub examples: IndexMap<String, Vec<Example>>,
}

impl InterfaceDescription {
    /// Freeze an assembled description tree.
    ///
    /// Fills in the names each entry is keyed by and derives example ids.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut description: Self = serde_path_to_error::deserialize(value).map_err(|err| CompileError::Description {
            path: err.path().to_string(),
            message: err.inner().to_string(),
        })?;

        for (mount_point, route) in description.http_routes.iter_mut() {
            route.mount_point = mount_point.clone();
        }
        for (name, subject) in description.subjects.iter_mut() {
            subject.name = name.clone();
        }
        for (group, examples) in description.examples.iter_mut() {
            for (index, example) in examples.iter_mut().enumerate() {
                example.group = group.clone();
                example.id = example_id(group, example.title.as_deref(), index + 1);
            }
        }

        Ok(description)
    }

    /// Types that have both a preamble and a surviving definition
    pub fn root_types(&self) -> Vec<&str> {
        self.type_preambles
            .keys()
            .filter(|name| matches!(self.type_defs.get(name.as_str()), Some(Some(_))))
            .map(String::as_str)
            .collect()
    }

    /// Look up a surviving type definition
    pub fn type_def(&self, name: &str) -> Option<&TypeNode> {
        self.type_defs.get(name).and_then(Option::as_ref)
    }
}

/// Identifier for an example: its title with whitespace runs collapsed to
/// `_`, or `<group>_<ordinal>` when untitled
pub fn example_id(group: &str, title: Option<&str>, ordinal: usize) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.split_whitespace().collect::<Vec<_>>().join("_"),
        None => format!("{}_{}", group, ordinal),
    }
}

// =============================================================================
// Routes
// =============================================================================

/// HTTP verbs a route may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// A declared HTTP route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mount_point: String,

    /// Route template, e.g. `/api/payments/<id>`
    pub route: String,

    /// Static part of the template
    #[serde(default)]
    pub prefix: String,

    /// Path parameter names in order
    #[serde(default)]
    pub params: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    /// Declared verbs; empty means `GET`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<HttpMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Route {
    /// Accepted verbs, defaulting to `GET`
    pub fn methods(&self) -> Vec<HttpMethod> {
        if self.methods.is_empty() {
            vec![HttpMethod::Get]
        } else {
            self.methods.clone()
        }
    }

    /// Type names this route refers to
    pub fn referenced_types(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.body_type
            .as_deref()
            .map(|t| ("bodyType", t))
            .into_iter()
            .chain(self.response_type.as_deref().map(|t| ("responseType", t)))
    }
}

// =============================================================================
// Subjects
// =============================================================================

/// A declared pub/sub subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Subject template, e.g. `orders.<region>.[rest]`
    pub subject: String,

    pub base_subject: String,

    #[serde(default)]
    pub parts: Vec<String>,

    #[serde(default)]
    pub wildcards: IndexMap<String, WildcardKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Subject {
    /// The subscription form of the subject (`orders.*.>`)
    pub fn wildcard_subject(&self) -> String {
        let mut tokens = Vec::new();
        if !self.base_subject.is_empty() {
            tokens.push(self.base_subject.clone());
        }
        for part in &self.parts {
            let kind = self.wildcards.get(part).copied().unwrap_or(WildcardKind::SingleToken);
            tokens.push(kind.token().to_string());
        }
        tokens.join(".")
    }
}

// =============================================================================
// Examples
// =============================================================================

/// One illustrative example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Mount point this example belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_routes: Option<String>,

    /// Subject this example belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<String>,

    /// The example body document
    #[serde(default)]
    pub example: Value,
}

/// What an example is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleContext<'a> {
    HttpRoute(&'a str),
    Subject(&'a str),
}

impl Example {
    pub fn context(&self) -> Option<ExampleContext<'_>> {
        match (&self.http_routes, &self.subjects) {
            (Some(mount_point), _) => Some(ExampleContext::HttpRoute(mount_point)),
            (None, Some(subject)) => Some(ExampleContext::Subject(subject)),
            (None, None) => None,
        }
    }
}
