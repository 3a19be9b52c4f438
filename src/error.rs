//! Error types for the interface compiler
//!
//! Only fatal conditions are represented here. Recoverable problems (an
//! unparsable block, a dropped type definition, a failed template render) are
//! logged where they happen and never surface as a `CompileError`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Fatal compiler errors
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Incompatible types while merging at '{path}': existing {existing}, new {addition}")]
    MergeConflict {
        path: String,
        existing: &'static str,
        addition: &'static str,
    },

    #[error("Malformed fragment in {document}: {reason}\n{excerpt}")]
    FragmentShape {
        document: String,
        reason: String,
        excerpt: String,
    },

    #[error("{kind} fragment failed validation:\n  {}\nFragment:\n{excerpt}", join_lines(.messages))]
    Validation {
        kind: &'static str,
        messages: Vec<String>,
        excerpt: String,
    },

    #[error("Cross-reference check failed: {0}")]
    CrossReference(String),

    #[error("Include cycle detected: {}", display_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not read {}: {source}", .path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid interface description at '{path}': {message}")]
    Description { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<config_crate::ConfigError> for CompileError {
    fn from(err: config_crate::ConfigError) -> Self {
        CompileError::Config(err.to_string())
    }
}

fn join_lines(messages: &[String]) -> String {
    messages.join("\n  ")
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
