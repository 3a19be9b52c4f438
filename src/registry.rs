//! Output Registry
//!
//! Resolves where every artifact will be written before any generator runs.
//! Entries are keyed `<identifier>-<artifactClass>`, so a template rendering
//! one artifact can name the file of another without re-deriving it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::config::{ArtifactConfig, CompilerConfig};
use crate::description::InterfaceDescription;
use crate::error::{CompileError, Result};

/// Placeholder substituted with the artifact identifier
pub const PLACEHOLDER: &str = "{}";

/// Default path segments per artifact class
pub const BUILTIN_ARTIFACTS: &[(&str, &[&str])] = &[
    ("rootType-json", &["json", "{}.schema.json"]),
    ("rootType-py", &["python", "{}.py"]),
    ("httpRoutes-py", &["python", "{}_routes.py"]),
    ("subjects-py", &["python", "{}_subjects.py"]),
    ("examples-json", &["examples", "{}_examples.json"]),
];

// =============================================================================
// Artifact Scopes
// =============================================================================

/// What an artifact class is generated for, taken from the class prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactScope {
    /// One artifact per root type
    RootType,
    /// One artifact per interface, describing its routes
    HttpRoutes,
    /// One artifact per interface, describing its subjects
    Subjects,
    /// One artifact per interface, holding its examples
    Examples,
}

impl ArtifactScope {
    /// Scope of an artifact class such as `rootType-py`
    pub fn from_class(class: &str) -> Option<Self> {
        let (prefix, _) = class.split_once('-')?;
        match prefix.to_ascii_lowercase().as_str() {
            "roottype" => Some(ArtifactScope::RootType),
            "httproutes" => Some(ArtifactScope::HttpRoutes),
            "subjects" => Some(ArtifactScope::Subjects),
            "examples" => Some(ArtifactScope::Examples),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactScope::RootType => "rootType",
            ArtifactScope::HttpRoutes => "httpRoutes",
            ArtifactScope::Subjects => "subjects",
            ArtifactScope::Examples => "examples",
        }
    }
}

/// Restore the canonical spelling of a class's scope prefix
pub fn canonical_class(class: &str) -> String {
    match (ArtifactScope::from_class(class), class.split_once('-')) {
        (Some(scope), Some((_, rest))) => format!("{}-{}", scope.prefix(), rest),
        _ => class.to_string(),
    }
}

/// Registry key for one artifact
pub fn registry_key(identifier: &str, class: &str) -> String {
    format!("{}-{}", identifier, class)
}

// =============================================================================
// Path Resolution
// =============================================================================

/// Where artifacts of one class go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Directory under the distribution root
    pub directory: PathBuf,
    /// File name pattern with one placeholder
    pub template: String,
}

impl ResolvedPath {
    pub fn file_name(&self, identifier: &str) -> String {
        self.template.replacen(PLACEHOLDER, identifier, 1)
    }

    pub fn path(&self, identifier: &str) -> PathBuf {
        self.directory.join(self.file_name(identifier))
    }
}

/// Resolve the directory and file name pattern of an artifact class.
///
/// Uses the configured path, else the built-in default for the class, else
/// `<ext>/{}.<ext>` where `<ext>` is the part of the class after the scope.
pub fn resolve(dist_root: &Path, class: &str, config: &ArtifactConfig) -> Result<ResolvedPath> {
    let segments: Vec<String> = match &config.path {
        Some(segments) => segments.clone(),
        None => default_segments(class),
    };

    let (file_template, directories) = segments
        .split_last()
        .ok_or_else(|| CompileError::Config(format!("artifact '{}' has an empty path", class)))?;

    if file_template.matches(PLACEHOLDER).count() != 1 {
        return Err(CompileError::Config(format!(
            "artifact '{}' file name '{}' must contain exactly one '{}'",
            class, file_template, PLACEHOLDER
        )));
    }
    if let Some(segment) = directories.iter().find(|s| s.contains(PLACEHOLDER)) {
        return Err(CompileError::Config(format!(
            "artifact '{}' directory segment '{}' must not contain '{}'",
            class, segment, PLACEHOLDER
        )));
    }

    let mut directory = dist_root.to_path_buf();
    directory.extend(directories);
    Ok(ResolvedPath {
        directory,
        template: file_template.clone(),
    })
}

fn default_segments(class: &str) -> Vec<String> {
    if let Some((_, segments)) = BUILTIN_ARTIFACTS.iter().find(|(name, _)| *name == class) {
        return segments.iter().map(|s| s.to_string()).collect();
    }
    let extension = class.split_once('-').map(|(_, ext)| ext).unwrap_or(class);
    vec![extension.to_string(), format!("{{}}.{}", extension)]
}

// =============================================================================
// Registry
// =============================================================================

/// One resolved artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub key: String,
    pub identifier: String,
    pub class: String,
    pub scope: ArtifactScope,
    pub directory: PathBuf,
    pub file_name: String,
    pub path: PathBuf,
}

/// Every artifact of a run, resolved up front
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl OutputRegistry {
    /// Resolve every enabled artifact class for every identifier it applies to
    pub fn build(description: &InterfaceDescription, config: &CompilerConfig) -> Result<Self> {
        let mut registry = Self::default();
        let mut claimed: HashMap<PathBuf, String> = HashMap::new();

        for (class, artifact) in config.enabled_artifacts() {
            let scope = ArtifactScope::from_class(class).ok_or_else(|| {
                CompileError::Config(format!(
                    "artifact class '{}' must start with rootType-, httpRoutes-, subjects- or examples-",
                    class
                ))
            })?;
            let resolved = resolve(&config.output.dist_root, class, artifact)?;

            let identifiers: Vec<&str> = match scope {
                ArtifactScope::RootType => description.root_types(),
                _ => vec![description.name.as_str()],
            };

            for identifier in identifiers {
                let key = registry_key(identifier, class);
                let path = resolved.path(identifier);
                if let Some(other) = claimed.insert(path.clone(), key.clone()) {
                    return Err(CompileError::Config(format!(
                        "artifacts '{}' and '{}' both resolve to {}",
                        other,
                        key,
                        path.display()
                    )));
                }
                debug!(key = %key, path = %path.display(), "registered artifact");
                registry.entries.insert(
                    key.clone(),
                    RegistryEntry {
                        key,
                        identifier: identifier.to_string(),
                        class: class.to_string(),
                        scope,
                        directory: resolved.directory.clone(),
                        file_name: resolved.file_name(identifier),
                        path,
                    },
                );
            }
        }

        Ok(registry)
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// Entry for an identifier and artifact class
    pub fn lookup(&self, identifier: &str, class: &str) -> Option<&RegistryEntry> {
        self.get(&registry_key(identifier, class))
    }

    /// Key -> file name, for template contexts
    pub fn files(&self) -> IndexMap<&str, &str> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.file_name.as_str()))
            .collect()
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description() -> InterfaceDescription {
        InterfaceDescription::from_value(json!({
            "name": "docs_payments",
            "typePreambles": {"PaymentRequest": {}, "Refund": {}, "Ghost": {}},
            "typeDefs": {
                "PaymentRequest": {"type": "object", "properties": {"amount": {"type": "number"}}},
                "Refund": "string",
                "Ghost": null
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_scope_from_class() {
        assert_eq!(ArtifactScope::from_class("rootType-py"), Some(ArtifactScope::RootType));
        assert_eq!(ArtifactScope::from_class("roottype-py"), Some(ArtifactScope::RootType));
        assert_eq!(ArtifactScope::from_class("examples-json"), Some(ArtifactScope::Examples));
        assert_eq!(ArtifactScope::from_class("models-py"), None);
        assert_eq!(ArtifactScope::from_class("rootType"), None);
        assert_eq!(canonical_class("httproutes-ts"), "httpRoutes-ts");
    }

    #[test]
    fn test_resolve_builtin_default() {
        let resolved = resolve(Path::new("dist"), "rootType-json", &ArtifactConfig::default()).unwrap();
        assert_eq!(resolved.directory, PathBuf::from("dist/json"));
        assert_eq!(resolved.path("PaymentRequest"), PathBuf::from("dist/json/PaymentRequest.schema.json"));
    }

    #[test]
    fn test_resolve_explicit_and_generic() {
        let config = ArtifactConfig {
            path: Some(vec!["py".into(), "models".into(), "{}_model.py".into()]),
            ..ArtifactConfig::default()
        };
        let resolved = resolve(Path::new("out"), "rootType-py", &config).unwrap();
        assert_eq!(resolved.path("Refund"), PathBuf::from("out/py/models/Refund_model.py"));

        let generic = resolve(Path::new("out"), "httpRoutes-ts", &ArtifactConfig::default()).unwrap();
        assert_eq!(generic.path("api"), PathBuf::from("out/ts/api.ts"));
    }

    #[test]
    fn test_resolve_rejects_bad_templates() {
        let missing = ArtifactConfig {
            path: Some(vec!["py".into(), "model.py".into()]),
            ..ArtifactConfig::default()
        };
        assert!(resolve(Path::new("dist"), "rootType-py", &missing).is_err());

        let twice = ArtifactConfig {
            path: Some(vec!["{}_{}.py".into()]),
            ..ArtifactConfig::default()
        };
        assert!(resolve(Path::new("dist"), "rootType-py", &twice).is_err());

        let in_directory = ArtifactConfig {
            path: Some(vec!["{}".into(), "{}.py".into()]),
            ..ArtifactConfig::default()
        };
        assert!(resolve(Path::new("dist"), "rootType-py", &in_directory).is_err());
    }

    #[test]
    fn test_registry_keys_per_root_type_and_class() {
        let registry = OutputRegistry::build(&description(), &CompilerConfig::default()).unwrap();

        let py = registry.lookup("PaymentRequest", "rootType-py").unwrap();
        assert_eq!(py.key, "PaymentRequest-rootType-py");
        assert_eq!(py.file_name, "PaymentRequest.py");
        assert_eq!(
            registry.get("PaymentRequest-rootType-json").unwrap().file_name,
            "PaymentRequest.schema.json"
        );
        assert!(registry.lookup("Ghost", "rootType-py").is_none());
        assert_eq!(
            registry.lookup("docs_payments", "httpRoutes-py").unwrap().file_name,
            "docs_payments_routes.py"
        );
        // 2 root types x 2 classes + 3 interface-level classes
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_registry_is_deterministic() {
        let first = OutputRegistry::build(&description(), &CompilerConfig::default()).unwrap();
        let second = OutputRegistry::build(&description(), &CompilerConfig::default()).unwrap();
        let first: Vec<_> = first.entries().cloned().collect();
        let second: Vec<_> = second.entries().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_colliding_paths_are_rejected() {
        let mut config = CompilerConfig::default();
        config.artifacts.insert(
            "rootType-schema".to_string(),
            ArtifactConfig {
                path: Some(vec!["json".into(), "{}.schema.json".into()]),
                ..ArtifactConfig::default()
            },
        );
        let err = OutputRegistry::build(&description(), &config).unwrap_err();
        assert!(err.to_string().contains("both resolve to"));
    }

    #[test]
    fn test_files_map() {
        let registry = OutputRegistry::build(&description(), &CompilerConfig::default()).unwrap();
        let files = registry.files();
        assert_eq!(files["Refund-rootType-py"], "Refund.py");
        assert_eq!(files["docs_payments-examples-json"], "docs_payments_examples.json");
    }
}
