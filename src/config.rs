//! Configuration management for the interface compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (ifc.toml, ifc.yaml or .ifc.toml)
//! - The XDG config directory
//! - An explicit `--config` file
//! - Environment variables (IFC__*)
//!
//! ## Example config file (ifc.toml):
//! ```toml
//! verbose = 1
//!
//! [output]
//! dist_root = "dist"
//!
//! [sources]
//! dir = "docs"
//!
//! [artifacts.rootType-py]
//! path = ["python", "models", "{}.py"]
//! template = "templates/model.py.j2"
//! options = { base_class = "BaseModel" }
//!
//! [artifacts.subjects-py]
//! enabled = false
//! ```

use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CompileError, Result};
use crate::registry::{canonical_class, BUILTIN_ARTIFACTS};

/// Main configuration for the compiler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Extra log verbosity on top of `-v`
    #[serde(default)]
    pub verbose: u8,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Where source documents are read from
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Artifact class -> settings
    #[serde(default)]
    pub artifacts: IndexMap<String, ArtifactConfig>,

    /// Config files left out of the last load, with the reason
    #[serde(skip)]
    pub skipped_files: Vec<(PathBuf, String)>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Distribution root every artifact path is placed under
    #[serde(default = "default_dist_root")]
    pub dist_root: PathBuf,

    /// Write manifest.json with artifact checksums
    #[serde(default = "default_true")]
    pub manifest: bool,
}

/// Source document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory documents named on the command line are resolved against
    #[serde(default = "default_sources_dir")]
    pub dir: PathBuf,
}

/// Settings for one artifact class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Path segments under the distribution root; the last one is a file
    /// name pattern with one `{}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,

    /// Template file overriding the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Passed to the template as `options`
    #[serde(default)]
    pub options: toml::Table,
}

// Default value functions
fn default_dist_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_sources_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dist_root: default_dist_root(),
            manifest: true,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            dir: default_sources_dir(),
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: None,
            template: None,
            enabled: true,
            options: toml::Table::new(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        let mut config = Self {
            verbose: 0,
            output: OutputConfig::default(),
            sources: SourcesConfig::default(),
            artifacts: IndexMap::new(),
            skipped_files: Vec::new(),
        };
        config.add_builtin_artifacts();
        config
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding an explicit file on top of the defaults.
    ///
    /// A file that cannot be read or parsed is skipped with a warning; the
    /// remaining files and the environment still apply.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        // Load from default locations
        let mut files: Vec<PathBuf> = ["ifc.toml", "ifc.yaml", ".ifc.toml"]
            .iter()
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .collect();

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "ifc", "ifc") {
            let xdg_config = config_dir.config_dir().join("ifc.toml");
            if xdg_config.exists() {
                files.push(xdg_config);
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            if path.exists() {
                files.push(path.to_path_buf());
            } else {
                warn!("Config file {} not found, using defaults", path.display());
            }
        }

        Self::from_layers(&files)
    }

    /// Layer the given files in order, then `IFC__*` environment variables
    fn from_layers(files: &[PathBuf]) -> Result<Self> {
        let mut builder = Config::builder();
        let mut layers = Vec::new();
        let mut skipped_files = Vec::new();

        for path in files {
            match read_layer(path) {
                Ok(layer) => {
                    builder = builder.add_source(File::from(path.as_path()).required(true));
                    layers.push(layer);
                }
                Err(e) => {
                    warn!("Skipping config file {}: {}", path.display(), e);
                    skipped_files.push((path.clone(), e.to_string()));
                }
            }
        }

        // Load from environment variables (IFC__*)
        builder = builder.add_source(
            Environment::with_prefix("IFC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.canonicalize_artifacts();
        for layer in &layers {
            config.restore_option_keys(layer);
        }
        config.add_builtin_artifacts();
        config.skipped_files = skipped_files;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// The effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CompileError::Config(e.to_string()))
    }

    /// Artifact classes that should be generated, in configuration order
    pub fn enabled_artifacts(&self) -> impl Iterator<Item = (&str, &ArtifactConfig)> {
        self.artifacts
            .iter()
            .filter(|(_, artifact)| artifact.enabled)
            .map(|(class, artifact)| (class.as_str(), artifact))
    }

    /// Resolve a document path against the sources directory
    pub fn source_path(&self, document: &Path) -> PathBuf {
        self.sources.dir.join(document)
    }

    // key lookups through the config crate may lose the case of class names
    fn canonicalize_artifacts(&mut self) {
        self.artifacts = std::mem::take(&mut self.artifacts)
            .into_iter()
            .map(|(class, artifact)| (canonical_class(&class), artifact))
            .collect();
    }

    // the config crate lowercases every key, template options included
    fn restore_option_keys(&mut self, layer: &CompilerConfig) {
        for (class, original) in &layer.artifacts {
            if let Some(artifact) = self.artifacts.get_mut(&canonical_class(class)) {
                restore_case(&mut artifact.options, &original.options);
            }
        }
    }

    fn add_builtin_artifacts(&mut self) {
        for (class, _) in BUILTIN_ARTIFACTS {
            if !self.artifacts.contains_key(*class) {
                self.artifacts.insert(class.to_string(), ArtifactConfig::default());
            }
        }
    }
}

/// Parse one config file on its own, keeping the case of every key
fn read_layer(path: &Path) -> Result<CompilerConfig> {
    let text = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        toml::from_str(&text).map_err(|e| CompileError::Config(e.to_string()))
    }
}

/// Rename lowercased keys of `effective` back to their spelling in `original`
fn restore_case(effective: &mut toml::Table, original: &toml::Table) {
    for (key, original_value) in original {
        let lowered = key.to_lowercase();
        let Some(mut value) = effective.remove(&lowered).or_else(|| effective.remove(key)) else {
            continue;
        };
        if let (toml::Value::Table(nested), toml::Value::Table(original_nested)) = (&mut value, original_value) {
            restore_case(nested, original_nested);
        }
        effective.insert(key.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.output.dist_root, PathBuf::from("dist"));
        assert_eq!(config.sources.dir, PathBuf::from("."));
        assert_eq!(config.artifacts.len(), BUILTIN_ARTIFACTS.len());
        assert!(config.artifacts["rootType-json"].enabled);
    }

    #[test]
    fn test_serialize_config() {
        let config = CompilerConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[artifacts.rootType-json]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[output]
dist_root = "out"

[artifacts.rootType-py]
path = ["py", "{}_model.py"]
options = { base_class = "BaseModel" }

[artifacts.subjects-py]
enabled = false

[artifacts.rootType-ts]
enabled = true
"#,
        )
        .unwrap();

        let config = CompilerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(config.output.dist_root, PathBuf::from("out"));

        let py = &config.artifacts["rootType-py"];
        assert_eq!(py.path.as_deref(), Some(&["py".to_string(), "{}_model.py".to_string()][..]));
        assert_eq!(py.options["base_class"].as_str(), Some("BaseModel"));

        let enabled: Vec<&str> = config.enabled_artifacts().map(|(class, _)| class).collect();
        assert!(enabled.contains(&"rootType-ts"));
        assert!(enabled.contains(&"rootType-json"));
        assert!(!enabled.contains(&"subjects-py"));
    }

    #[test]
    fn test_missing_explicit_file_uses_defaults() {
        let config = CompilerConfig::load_from(Some(Path::new("/nonexistent/ifc.toml"))).unwrap();
        assert_eq!(config.output.dist_root, PathBuf::from("dist"));
    }

    #[test]
    fn test_option_keys_keep_their_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[artifacts.httpRoutes-py]
options = { baseClass = "X", nested = { innerKey = 1, plain = true } }
"#,
        )
        .unwrap();

        let config = CompilerConfig::load_from(Some(&path)).unwrap();
        let options = &config.artifacts["httpRoutes-py"].options;
        assert_eq!(options["baseClass"].as_str(), Some("X"));
        assert!(!options.contains_key("baseclass"));
        let nested = options["nested"].as_table().unwrap();
        assert_eq!(nested["innerKey"].as_integer(), Some(1));
        assert_eq!(nested["plain"].as_bool(), Some(true));
    }

    #[test]
    fn test_later_layer_option_case() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let top = dir.path().join("top.toml");
        std::fs::write(&base, "artifacts:\n  rootType-py:\n    options:\n      baseClass: Base\n").unwrap();
        std::fs::write(&top, "[artifacts.rootType-py.options]\nbaseClass = \"Top\"\nextraField = 2\n").unwrap();

        let config = CompilerConfig::from_layers(&[base, top]).unwrap();
        let options = &config.artifacts["rootType-py"].options;
        assert_eq!(options["baseClass"].as_str(), Some("Top"));
        assert_eq!(options["extraField"].as_integer(), Some(2));
    }

    #[test]
    fn test_unparsable_layer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        let bad = dir.path().join("bad.toml");
        std::fs::write(&good, "[output]\ndist_root = \"out\"\n").unwrap();
        std::fs::write(&bad, "[output\ndist_root = ").unwrap();

        let config = CompilerConfig::from_layers(&[good, bad.clone()]).unwrap();
        assert_eq!(config.output.dist_root, PathBuf::from("out"));
        assert_eq!(config.skipped_files.len(), 1);
        assert_eq!(config.skipped_files[0].0, bad);

        let config = CompilerConfig::load_from(Some(&bad)).unwrap();
        assert_eq!(config.output.dist_root, PathBuf::from("dist"));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CompilerConfig::default();
        config.verbose = 2;
        config.save(&path).unwrap();

        let loaded = CompilerConfig::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.verbose, 2);
        assert_eq!(loaded.artifacts.len(), config.artifacts.len());
    }
}
