//! Interface Compiler
//!
//! Compiles interface descriptions written as fenced YAML blocks inside
//! Markdown documents into schemas, route and subject bindings, and example
//! fixtures.
//!
//! ## Pipeline
//!
//! ```text
//! documents ──▶ fragments ──▶ normalize / validate ──▶ merge ──▶ description
//!     ▲                                                              │
//!     └──── Include.Interface ◀──────┘                               ▼
//!                                                      cross-reference check
//!                                                                    │
//!                                      artifacts ◀── generators ◀── output registry
//! ```
//!
//! ## Source documents
//!
//! Each fenced ```` ```yaml ```` block holds one or more YAML documents. A
//! document has exactly one top-level key:
//!
//! - `typePreambles`: schema preamble per root type
//! - `typeDefs`: type definitions in the abbreviated type grammar
//! - `httpRoutes`: mount point -> route template, body and response types
//! - `subjects`: subject name -> subject template and message type
//! - `examples`: an example header, followed by the example body document
//!
//! ## Example
//!
//! ```no_run
//! use interface_compiler::{Compilation, CompilerConfig, OutputRegistry};
//!
//! let config = CompilerConfig::load()?;
//! let description = Compilation::new()?.load("docs/payments.md")?;
//! let registry = OutputRegistry::build(&description, &config)?;
//! for entry in registry.entries() {
//!     println!("{} -> {}", entry.key, entry.path.display());
//! }
//! # Ok::<(), interface_compiler::CompileError>(())
//! ```

pub mod assembler;
pub mod checksum;
pub mod codegen;
pub mod config;
pub mod description;
pub mod error;
pub mod fragment;
pub mod merge;
pub mod paths;
pub mod registry;
pub mod types;
pub mod validate;
pub mod xref;

pub use assembler::{Compilation, DocumentSource, FsSource, MemorySource};
pub use checksum::{ArtifactManifest, Checksum};
pub use codegen::{
    generate, GenerationContext, GenerationReport, JsonSchemaWriter, MiniJinjaRenderer, SchemaGenerator,
    TemplateRenderer,
};
pub use config::{ArtifactConfig, CompilerConfig};
pub use description::{Example, InterfaceDescription, Route, Subject};
pub use error::{CompileError, Result};
pub use registry::{OutputRegistry, RegistryEntry};
pub use types::{normalize, TypeKind, TypeNode};
