//! Interface Description Assembler
//!
//! Walks Markdown documents line by line, pulls out fenced YAML blocks, turns
//! every block document into a fragment and merges it into one description.
//! `Include.Interface: [label](path)` lines pull another document in at that
//! point.
//!
//! ```text
//!             "```yaml"
//!   Markdown ───────────▶ InBlock
//!      ▲                     │
//!      └──────── "```" ──────┘  (block parsed and dispatched)
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::description::InterfaceDescription;
use crate::error::{CompileError, Result};
use crate::fragment;
use crate::merge::merge;
use crate::validate::MetaSchemas;
use crate::xref;

const BLOCK_OPEN: &str = "```yaml";
const BLOCK_CLOSE: &str = "```";

// =============================================================================
// Document Sources
// =============================================================================

/// Where document text comes from
pub trait DocumentSource {
    /// All lines of a document, without line terminators
    fn read_lines(&self, path: &Path) -> Result<Vec<String>>;

    /// A stable identity for the document, used to detect repeated includes
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// Reads documents from disk, resolving relative paths against a root
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Default for FsSource {
    fn default() -> Self {
        Self::new(".")
    }
}

impl DocumentSource for FsSource {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let full = self.resolve(path);
        let text = fs::read_to_string(&full).map_err(|source| CompileError::Document { path: full, source })?;
        Ok(text.lines().map(String::from).collect())
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let full = self.resolve(path);
        fs::canonicalize(&full).map_err(|source| CompileError::Document { path: full, source })
    }
}

/// Documents held in memory, keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document (builder style)
    pub fn with_document(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.documents.insert(lexical_normalize(path.as_ref()), text.into());
    }
}

impl DocumentSource for MemorySource {
    fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        let key = lexical_normalize(path);
        self.documents
            .get(&key)
            .map(|text| text.lines().map(String::from).collect())
            .ok_or_else(|| CompileError::Document {
                path: key,
                source: io::Error::new(io::ErrorKind::NotFound, "no such document"),
            })
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let key = lexical_normalize(path);
        if self.documents.contains_key(&key) {
            Ok(key)
        } else {
            Err(CompileError::Document {
                path: key,
                source: io::Error::new(io::ErrorKind::NotFound, "no such document"),
            })
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Interface name for a top-level document: its path without extension,
/// separators replaced by `_`
pub fn interface_name(path: &Path) -> String {
    let stem = path.with_extension("");
    let text = stem.to_string_lossy();
    let text = text.strip_prefix("./").unwrap_or(text.as_ref());
    text.replace(&['/', '\\'][..], "_")
}

// =============================================================================
// Compilation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Markdown,
    InBlock,
}

/// The context for one compilation run
pub struct Compilation<S: DocumentSource = FsSource> {
    source: S,
    metas: MetaSchemas,
    include_pattern: Regex,
    description: Value,
    visited: HashSet<PathBuf>,
    include_stack: Vec<PathBuf>,
}

impl Compilation<FsSource> {
    /// Compile documents from the current directory
    pub fn new() -> Result<Self> {
        Self::with_source(FsSource::default())
    }
}

impl<S: DocumentSource> Compilation<S> {
    pub fn with_source(source: S) -> Result<Self> {
        Ok(Self {
            source,
            metas: MetaSchemas::compile()?,
            include_pattern: Regex::new(r"^\s*Include\.Interface:\s*\[([^\]]*)\]\(([^)\s]+)\)\s*$")
                .map_err(|e| CompileError::Config(e.to_string()))?,
            description: json!({}),
            visited: HashSet::new(),
            include_stack: Vec::new(),
        })
    }

    /// Assemble the document at `path` and everything it includes, check
    /// cross-references and freeze the result.
    pub fn load(mut self, path: impl AsRef<Path>) -> Result<InterfaceDescription> {
        let path = path.as_ref();
        let name = interface_name(path);
        info!("Compiling interface '{}' from {}", name, path.display());

        self.description = json!({ "name": name });
        self.process_document(path)?;

        let description = InterfaceDescription::from_value(self.description)?;
        xref::check(&description)?;
        Ok(description)
    }

    fn process_document(&mut self, path: &Path) -> Result<()> {
        let canonical = self.source.canonicalize(path)?;
        if !self.visited.insert(canonical.clone()) {
            let mut chain = self.include_stack.clone();
            chain.push(canonical);
            return Err(CompileError::IncludeCycle { chain });
        }
        debug!(document = %path.display(), depth = self.include_stack.len(), "processing document");
        self.include_stack.push(canonical);

        let lines = self.source.read_lines(path)?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let origin = path.display().to_string();

        let mut state = LineState::Markdown;
        let mut block: Vec<&str> = Vec::new();
        let mut block_start = 0;

        for (index, line) in lines.iter().enumerate() {
            match state {
                LineState::Markdown => {
                    if line.trim_end() == BLOCK_OPEN {
                        state = LineState::InBlock;
                        block.clear();
                        block_start = index + 1;
                    } else if let Some(target) = self.include_target(line) {
                        let included = directory.join(target);
                        info!("Including {} from {}", included.display(), origin);
                        self.process_document(&included)?;
                    }
                }
                LineState::InBlock => {
                    if line.trim_end() == BLOCK_CLOSE {
                        state = LineState::Markdown;
                        let location = format!("{}:{}", origin, block_start);
                        self.process_block(&block.join("\n"), &location)?;
                    } else {
                        block.push(line);
                    }
                }
            }
        }

        if state == LineState::InBlock {
            warn!("Ignoring unterminated yaml block at {}:{}", origin, block_start);
        }

        self.include_stack.pop();
        Ok(())
    }

    fn include_target(&self, line: &str) -> Option<PathBuf> {
        self.include_pattern
            .captures(line)
            .and_then(|captures| captures.get(2))
            .map(|target| PathBuf::from(target.as_str()))
    }

    fn process_block(&mut self, text: &str, location: &str) -> Result<()> {
        let documents = match fragment::parse_documents(text) {
            Ok(documents) => documents,
            Err(err) => {
                warn!("Skipping unparsable yaml block at {}: {}\n{}", location, err, text);
                return Ok(());
            }
        };

        for fragment in fragment::dispatch(documents, &self.metas, location)? {
            merge(&mut self.description, fragment.into_value()?, "")?;
        }
        Ok(())
    }
}
