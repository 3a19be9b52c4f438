//! Interface Compiler CLI
//!
//! Compiles a Markdown interface description and generates its artifacts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use interface_compiler::{
    generate, CompilerConfig, Compilation, FsSource, GenerationContext, InterfaceDescription, JsonSchemaWriter,
    MiniJinjaRenderer, OutputRegistry,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ifc")]
#[command(about = "Compile Markdown interface descriptions into schemas, bindings and fixtures")]
#[command(version)]
struct Cli {
    /// Config file to load on top of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document and generate every configured artifact
    Build {
        /// Top-level interface document
        document: PathBuf,
    },

    /// Compile a document and run the cross-reference checks only
    Check {
        /// Top-level interface document
        document: PathBuf,
    },

    /// Print the unified interface description
    Dump {
        /// Top-level interface document
        document: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: DumpFormat,
    },

    /// Print where every artifact would be written
    Paths {
        /// Top-level interface document
        document: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    Yaml,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // unparsable files are dropped one by one; only a failure of the merged
    // layers (e.g. a mistyped IFC__* variable) falls back to the defaults
    let (config, config_error) = match CompilerConfig::load_from(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (CompilerConfig::default(), Some(e)),
    };
    init_tracing(cli.verbose.saturating_add(config.verbose));
    for (path, reason) in &config.skipped_files {
        warn!("Skipped config file {}: {}", path.display(), reason);
    }
    if let Some(e) = config_error {
        warn!("Could not load configuration, using defaults: {}", e);
    }

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn compile(document: &Path, config: &CompilerConfig) -> Result<InterfaceDescription> {
    let compilation = Compilation::with_source(FsSource::new(&config.sources.dir))?;
    let description = compilation
        .load(document)
        .with_context(|| format!("failed to compile {}", config.source_path(document).display()))?;
    Ok(description)
}

fn run(command: Commands, config: &CompilerConfig) -> Result<()> {
    match command {
        Commands::Build { document } => {
            println!("🔨 Compiling {}...", document.display());
            let description = compile(&document, config)?;
            println!(
                "  {} types, {} routes, {} subjects, {} example groups",
                description.type_defs.len(),
                description.http_routes.len(),
                description.subjects.len(),
                description.examples.len()
            );

            let registry = OutputRegistry::build(&description, config)?;
            let ctx = GenerationContext::new(&description, &registry, &MiniJinjaRenderer, &JsonSchemaWriter);
            let report = generate(&ctx, config)?;

            for entry in &report.written {
                println!("  ✅ {} -> {}", entry.key, entry.path.display());
            }
            for (key, reason) in &report.skipped {
                println!("  ⏭️  {} ({})", key, reason);
            }
            for (key, message) in &report.failures {
                println!("  ❌ {}: {}", key, message);
            }
            if let Some(manifest) = &report.manifest {
                println!("📋 Manifest: {}", manifest.display());
            }

            println!();
            println!(
                "✅ Generated {} artifacts into {} ({} skipped, {} failed)",
                report.written.len(),
                config.output.dist_root.display(),
                report.skipped.len(),
                report.failures.len()
            );
            Ok(())
        }

        Commands::Check { document } => {
            let description = compile(&document, config)?;
            println!("✅ {} - all cross-references resolve", description.name);
            Ok(())
        }

        Commands::Dump { document, format } => {
            let description = compile(&document, config)?;
            let output = match format {
                DumpFormat::Yaml => serde_yaml::to_string(&description)?,
                DumpFormat::Json => serde_json::to_string_pretty(&description)?,
            };
            println!("{}", output);
            Ok(())
        }

        Commands::Paths { document } => {
            let description = compile(&document, config)?;
            let registry = OutputRegistry::build(&description, config)?;
            println!("📁 Output registry for {}", description.name);
            println!();
            let width = registry.entries().map(|entry| entry.key.len()).max().unwrap_or(0);
            for entry in registry.entries() {
                println!("  {:width$}  {}", entry.key, entry.path.display(), width = width);
            }
            Ok(())
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
