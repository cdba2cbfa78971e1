//! # akn-cli
//!
//! Command line for Akoma Ntoso application profiles: validation, cascade
//! edits, canonical ordering and profile generation.
//!
//! Exit codes of `validate`: 0 when clean, 1 with warnings only, 2 with
//! errors.

use akn_engine::{Engine, EngineConfig};
use akn_profile::Delta;
use akn_schema::{SchemaModel, SchemaRegistry};
use akn_validation::{ReportFormat, ValidationReporter};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "akn")]
#[command(about = "Akoma Ntoso application profile tooling")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema file path (overrides the configuration)
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a profile against the schema
    Validate {
        /// Profile file path
        input: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Add an element and everything the schema requires beneath it
    Expand {
        /// Profile file path
        input: PathBuf,

        /// Element type to expand
        element: String,

        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },

    /// Remove an element and the descendants nothing else needs
    Collapse {
        /// Profile file path
        input: PathBuf,

        /// Element type to collapse
        element: String,

        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },

    /// Put a profile in canonical order
    Reorder {
        /// Profile file path
        input: PathBuf,

        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },

    /// Generate a minimum viable profile
    Generate {
        /// Root element type (e.g., act, bill)
        root: String,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also list optional attributes
        #[arg(long)]
        optional_attributes: bool,
    },

    /// Add or remove identity attributes on every element
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Describe the loaded schema or one of its elements
    Schema {
        /// Element to describe
        element: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Add identity attributes where the schema supports them
    Add {
        /// Profile file path
        input: PathBuf,

        /// Attribute names
        #[arg(short, long, value_delimiter = ',', default_value = "eId")]
        names: Vec<String>,

        /// Mark added attributes as required
        #[arg(long)]
        required: bool,

        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },

    /// Remove identity attributes unless the schema makes them mandatory
    Remove {
        /// Profile file path
        input: PathBuf,

        /// Attribute names
        #[arg(short, long, value_delimiter = ',', default_value = "eId,wId,GUID")]
        names: Vec<String>,

        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => ReportFormat::Text,
            Format::Json => ReportFormat::Json,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(schema) = &cli.schema {
        config.schema.path = Some(schema.clone());
        config.schema.version = None;
    }
    Ok(config)
}

fn init_logging(config: &EngineConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Print the edited text, or write it back when asked
fn emit(path: &Path, text: &str, delta: &Delta, write: bool) -> anyhow::Result<()> {
    if !write {
        print!("{}", delta.apply(text));
        return Ok(());
    }
    if delta.is_empty() {
        println!("{}: no changes", path.display());
        return Ok(());
    }
    std::fs::write(path, delta.apply(text))
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("{}: updated", path.display());
    Ok(())
}

fn describe_schema(schema: &SchemaModel, element: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Some(name) = element else {
        if json {
            println!("{}", serde_json::to_string_pretty(schema)?);
            return Ok(());
        }
        println!("Schema: {}", schema.version());
        println!("Elements: {}", schema.element_count());
        println!("Choice groups: {}", schema.choice_group_count());
        if let Some(root) = schema.document_root() {
            println!("Document root: {root}");
            println!("Document types: {}", schema.document_types().join(", "));
        }
        return Ok(());
    };

    let Some(element_type) = schema.element(name) else {
        bail!("unknown element type '{name}'");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(element_type)?);
        return Ok(());
    }
    println!("<{name}>");
    if let Some(doc) = &element_type.documentation {
        println!("  {doc}");
    }
    println!("Children:");
    for child in &element_type.children {
        println!("  {} {}", child.name, child.occurs);
    }
    println!("Attributes:");
    for attribute in &element_type.attributes {
        let required = if attribute.required { " (required)" } else { "" };
        println!("  {}{required}", attribute.name);
    }
    for usage in &element_type.choices {
        println!(
            "Choice {} {}{}",
            usage.group.id,
            usage.occurs,
            if usage.is_exclusive() { " exclusive" } else { "" }
        );
        for branch in &usage.group.branches {
            let label = branch.label.as_deref().unwrap_or(&branch.id);
            println!("  {label}: {}", branch.members.join(", "));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config, cli.verbose);

    let registry = SchemaRegistry::new();
    let engine = Engine::from_config(config, &registry).context("failed to load schema")?;

    match cli.command {
        Commands::Validate { input, format } => {
            tracing::info!("Validating {}", input.display());
            let uri = input.display().to_string();
            engine.open(&uri, read_input(&input)?);
            let Some(result) = engine.validate_async(&uri).await? else {
                bail!("{uri} changed during validation");
            };
            let report = ValidationReporter::new(format.into()).report(&uri, &result.value)?;
            print!("{report}");
            let code = if result.value.has_errors() {
                2
            } else if result.value.warnings().next().is_some() {
                1
            } else {
                0
            };
            return Ok(ExitCode::from(code));
        }
        Commands::Expand {
            input,
            element,
            write,
        } => {
            let uri = input.display().to_string();
            let text = read_input(&input)?;
            engine.open(&uri, text.as_str());
            let edit = engine.expand(&uri, &element)?;
            emit(&input, &text, &edit.value, write)?;
        }
        Commands::Collapse {
            input,
            element,
            write,
        } => {
            let uri = input.display().to_string();
            let text = read_input(&input)?;
            engine.open(&uri, text.as_str());
            let edit = engine.collapse(&uri, &element)?;
            emit(&input, &text, &edit.value, write)?;
        }
        Commands::Reorder { input, write } => {
            let uri = input.display().to_string();
            let text = read_input(&input)?;
            engine.open(&uri, text.as_str());
            let edit = engine.reorder(&uri)?;
            emit(&input, &text, &edit.value, write)?;
        }
        Commands::Generate {
            root,
            output,
            optional_attributes,
        } => {
            let text = engine.generate(&root, optional_attributes)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!("Generated <{}> profile -> {}", root, path.display());
                }
                None => print!("{text}"),
            }
        }
        Commands::Identity { action } => match action {
            IdentityAction::Add {
                input,
                names,
                required,
                write,
            } => {
                let uri = input.display().to_string();
                let text = read_input(&input)?;
                engine.open(&uri, text.as_str());
                let edit = engine.add_identity(&uri, &names, required)?;
                emit(&input, &text, &edit.value, write)?;
            }
            IdentityAction::Remove {
                input,
                names,
                write,
            } => {
                let uri = input.display().to_string();
                let text = read_input(&input)?;
                engine.open(&uri, text.as_str());
                let outcome = engine.remove_identity(&uri, &names)?;
                let (delta, report) = outcome.value;
                for kept in &report.retained {
                    eprintln!(
                        "retained {} on <{}>: required by the schema",
                        kept.attribute, kept.element
                    );
                }
                emit(&input, &text, &delta, write)?;
            }
        },
        Commands::Schema { element, json } => {
            describe_schema(engine.schema(), element.as_deref(), json)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
