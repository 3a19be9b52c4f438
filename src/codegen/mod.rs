//! Artifact Generation
//!
//! Renders every entry of the [`OutputRegistry`] into a file.
//!
//! Architecture:
//! - GenerationContext: the frozen description and registry plus the
//!   renderer and schema generator, shared by every generator
//! - ArtifactGenerator: one per artifact scope, produces the content of one
//!   registry entry
//! - generate(): writes the content, checksums it and records the manifest
//!
//! A single artifact failing is logged and skipped; it never stops the run.

pub mod names;
pub mod render;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use include_dir::{include_dir, Dir};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

pub use render::{MiniJinjaRenderer, TemplateRenderer};
pub use schema::{root_type_schema, JsonSchemaWriter, SchemaGenerator};

use crate::checksum::{ArtifactManifest, Checksum, ManifestEntry};
use crate::config::{ArtifactConfig, CompilerConfig};
use crate::description::{InterfaceDescription, Route, Subject};
use crate::registry::{ArtifactScope, OutputRegistry, RegistryEntry};

static TEMPLATES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

// =============================================================================
// Errors
// =============================================================================

/// Why one artifact could not be generated
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Template '{template}' failed to render: {message}")]
    Render { template: String, message: String },

    #[error("Schema for '{type_name}' is invalid: {message} (the problem may have been inside a reference to another type)")]
    Schema { type_name: String, message: String },

    #[error("Could not read template {}: {source}", .path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No definition for root type '{0}'")]
    MissingType(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Generation Context
// =============================================================================

/// Everything generators read; immutable for the whole generation phase
pub struct GenerationContext<'a> {
    pub description: &'a InterfaceDescription,
    pub registry: &'a OutputRegistry,
    pub renderer: &'a dyn TemplateRenderer,
    pub schema_generator: &'a dyn SchemaGenerator,
    /// RFC 3339 timestamp shared by every artifact of the run
    pub generated_at: String,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        description: &'a InterfaceDescription,
        registry: &'a OutputRegistry,
        renderer: &'a dyn TemplateRenderer,
        schema_generator: &'a dyn SchemaGenerator,
    ) -> Self {
        Self {
            description,
            registry,
            renderer,
            schema_generator,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Template variables every artifact gets
    fn base_context(&self, artifact: &ArtifactConfig) -> Result<Map<String, Value>, GenerationError> {
        let description = self.description;
        let mut context = Map::new();
        context.insert("options".into(), serde_json::to_value(&artifact.options)?);
        context.insert("interface".into(), json!(description.name));
        context.insert(
            "routes".into(),
            Value::Array(description.http_routes.values().map(route_context).collect::<Result<_, _>>()?),
        );
        context.insert(
            "subjects".into(),
            Value::Array(description.subjects.values().map(subject_context).collect::<Result<_, _>>()?),
        );
        context.insert("examples".into(), serde_json::to_value(&description.examples)?);
        context.insert("files".into(), serde_json::to_value(self.registry.files())?);
        context.insert("generatedAt".into(), json!(self.generated_at));
        Ok(context)
    }
}

fn route_context(route: &Route) -> Result<Value, GenerationError> {
    let mut value = serde_json::to_value(route)?;
    value["methods"] = serde_json::to_value(route.methods())?;
    Ok(value)
}

fn subject_context(subject: &Subject) -> Result<Value, GenerationError> {
    let mut value = serde_json::to_value(subject)?;
    value["wildcardSubject"] = json!(subject.wildcard_subject());
    Ok(value)
}

/// Template source for an artifact class: the configured file, else the
/// built-in `templates/<class>.j2`
fn load_template(class: &str, artifact: &ArtifactConfig) -> Result<Option<String>, GenerationError> {
    if let Some(path) = &artifact.template {
        if path.exists() {
            return fs::read_to_string(path)
                .map(Some)
                .map_err(|source| GenerationError::Template { path: path.clone(), source });
        }
        warn!("Template {} for {} not found, using the built-in one", path.display(), class);
    }
    Ok(TEMPLATES_DIR
        .get_file(format!("{}.j2", class))
        .and_then(|file| file.contents_utf8())
        .map(str::to_string))
}

// =============================================================================
// Artifact Generators
// =============================================================================

/// Result of generating one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Content(String),
    Skipped(String),
}

/// Produces the content of one registry entry
pub trait ArtifactGenerator {
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        entry: &RegistryEntry,
        artifact: &ArtifactConfig,
    ) -> Result<Generated, GenerationError>;
}

fn render_template(
    ctx: &GenerationContext<'_>,
    entry: &RegistryEntry,
    artifact: &ArtifactConfig,
    extra: Map<String, Value>,
) -> Result<Generated, GenerationError> {
    let source = match load_template(&entry.class, artifact)? {
        Some(source) => source,
        None => return Ok(Generated::Skipped(format!("no template for {}", entry.class))),
    };
    let mut context = ctx.base_context(artifact)?;
    context.extend(extra);
    let content = ctx.renderer.render(&entry.class, &source, &Value::Object(context))?;
    Ok(Generated::Content(content))
}

/// One artifact per root type: a template, or the schema itself for `-json`
pub struct RootTypeGenerator;

impl ArtifactGenerator for RootTypeGenerator {
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        entry: &RegistryEntry,
        artifact: &ArtifactConfig,
    ) -> Result<Generated, GenerationError> {
        let type_name = entry.identifier.as_str();
        let schema = root_type_schema(ctx.description, type_name)
            .ok_or_else(|| GenerationError::MissingType(type_name.to_string()))?;

        let has_template = artifact.template.is_some() || TEMPLATES_DIR.get_file(format!("{}.j2", entry.class)).is_some();
        if !has_template && entry.class.ends_with("-json") {
            return Ok(Generated::Content(ctx.schema_generator.generate(type_name, &schema)?));
        }

        let mut extra = Map::new();
        extra.insert("typeName".into(), json!(type_name));
        extra.insert("schemaStr".into(), json!(serde_json::to_string_pretty(&schema)?));
        extra.insert("schema".into(), schema);
        render_template(ctx, entry, artifact, extra)
    }
}

/// One artifact per interface describing its routes
pub struct HttpRoutesGenerator;

impl ArtifactGenerator for HttpRoutesGenerator {
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        entry: &RegistryEntry,
        artifact: &ArtifactConfig,
    ) -> Result<Generated, GenerationError> {
        if ctx.description.http_routes.is_empty() {
            return Ok(Generated::Skipped("no httpRoutes declared".into()));
        }
        render_template(ctx, entry, artifact, Map::new())
    }
}

/// One artifact per interface describing its subjects
pub struct SubjectsGenerator;

impl ArtifactGenerator for SubjectsGenerator {
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        entry: &RegistryEntry,
        artifact: &ArtifactConfig,
    ) -> Result<Generated, GenerationError> {
        if ctx.description.subjects.is_empty() {
            return Ok(Generated::Skipped("no subjects declared".into()));
        }
        render_template(ctx, entry, artifact, Map::new())
    }
}

/// One artifact per interface holding its examples
pub struct ExamplesGenerator;

impl ArtifactGenerator for ExamplesGenerator {
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        entry: &RegistryEntry,
        artifact: &ArtifactConfig,
    ) -> Result<Generated, GenerationError> {
        if ctx.description.examples.is_empty() {
            return Ok(Generated::Skipped("no examples declared".into()));
        }
        render_template(ctx, entry, artifact, Map::new())
    }
}

/// The generator for an artifact scope
pub fn generator_for(scope: ArtifactScope) -> &'static dyn ArtifactGenerator {
    match scope {
        ArtifactScope::RootType => &RootTypeGenerator,
        ArtifactScope::HttpRoutes => &HttpRoutesGenerator,
        ArtifactScope::Subjects => &SubjectsGenerator,
        ArtifactScope::Examples => &ExamplesGenerator,
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Outcome of a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Written artifacts, paths relative to the distribution root
    pub written: Vec<ManifestEntry>,
    /// Registry key and reason
    pub skipped: Vec<(String, String)>,
    /// Registry key and error message
    pub failures: Vec<(String, String)>,
    pub manifest: Option<PathBuf>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Generate every registered artifact and write the manifest
pub fn generate(
    ctx: &GenerationContext<'_>,
    config: &CompilerConfig,
) -> crate::error::Result<GenerationReport> {
    let mut report = GenerationReport::default();
    let dist_root = config.output.dist_root.as_path();
    let no_settings = ArtifactConfig::default();

    for entry in ctx.registry.entries() {
        let artifact = config.artifacts.get(&entry.class).unwrap_or(&no_settings);

        let content = match generator_for(entry.scope).generate(ctx, entry, artifact) {
            Ok(Generated::Content(content)) => content,
            Ok(Generated::Skipped(reason)) => {
                info!("Skipping {}: {}", entry.key, reason);
                report.skipped.push((entry.key.clone(), reason));
                continue;
            }
            Err(err) => {
                error!("Failed to generate {}: {}", entry.key, err);
                report.failures.push((entry.key.clone(), err.to_string()));
                continue;
            }
        };

        if let Err(err) = write_artifact(&entry.path, &content) {
            error!("Failed to write {}: {}", entry.path.display(), err);
            report.failures.push((entry.key.clone(), err.to_string()));
            continue;
        }
        info!("Wrote {}", entry.path.display());
        report.written.push(ManifestEntry {
            key: entry.key.clone(),
            path: relative_to(&entry.path, dist_root),
            checksum: Checksum::of_str(&content),
        });
    }

    if config.output.manifest && !report.written.is_empty() {
        let manifest = ArtifactManifest::new(&ctx.description.name, report.written.clone());
        report.manifest = Some(manifest.write(dist_root)?);
    }

    Ok(report)
}

fn write_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
