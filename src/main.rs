//! objectify CLI - convert and check JSON documents against a schema
//!
//! Commands:
//!   objectify convert --schema <file> --type <type> [input]  - print the converted instance
//!   objectify check --schema <file> --type <type> <inputs>   - validate each input
//!   objectify inspect --schema <file>                        - list records and aliases

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use objectify::{
    fingerprint, instance_to_json, load_schema, node_from_json, parse_type, read_json_file, Converter, Definition,
    Limits, Registry, Schema, TypeDescriptor,
};
use serde::Serialize;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "objectify")]
#[command(about = "Convert JSON documents into typed instances guided by a schema", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one JSON document and print the result as JSON
    Convert {
        /// Schema file with record and type definitions
        #[arg(long, short)]
        schema: PathBuf,

        /// Target type expression, e.g. `config` or `list<point>`
        #[arg(long = "type", short = 't')]
        type_expr: String,

        /// Input JSON file; reads stdin when absent or `-`
        input: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Maximum nesting depth accepted
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Check that each input converts, reporting every failure
    Check {
        #[arg(long, short)]
        schema: PathBuf,

        #[arg(long = "type", short = 't')]
        type_expr: String,

        /// Input JSON files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// List the records and aliases a schema defines
    Inspect {
        #[arg(long, short)]
        schema: PathBuf,

        /// Show structural fingerprints
        #[arg(long, short = 'H')]
        hashes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Convert {
            schema,
            type_expr,
            input,
            pretty,
            max_depth,
        } => convert_command(&schema, &type_expr, input.as_deref(), pretty, limits(max_depth)),
        Commands::Check {
            schema,
            type_expr,
            inputs,
            max_depth,
        } => check_command(&schema, &type_expr, &inputs, limits(max_depth)),
        Commands::Inspect { schema, hashes, json } => inspect_command(&schema, hashes, json),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn limits(max_depth: Option<usize>) -> Limits {
    let mut limits = Limits::default();
    if let Some(depth) = max_depth {
        limits.max_depth = depth;
    }
    limits
}

/// Load the schema, build its registry and resolve the target type.
fn prepare(schema_path: &Path, type_expr: &str) -> anyhow::Result<(Registry, TypeDescriptor)> {
    let schema = load_schema(schema_path).with_context(|| format!("failed to load {}", schema_path.display()))?;
    let target = parse_type(type_expr, &schema).with_context(|| format!("invalid target type `{type_expr}`"))?;
    let registry = schema
        .into_registry()
        .with_context(|| format!("invalid schema {}", schema_path.display()))?;
    registry
        .validate_descriptor(&target)
        .with_context(|| format!("target type `{type_expr}` does not resolve"))?;
    info!(ty = %target, records = registry.record_ids().len(), "schema ready");
    Ok((registry, target))
}

fn read_input(input: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    match input {
        Some(path) if path != Path::new("-") => {
            read_json_file(path).with_context(|| format!("failed to read {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            debug!(bytes = buf.len(), "read stdin");
            serde_json::from_str(&buf).context("stdin is not valid JSON")
        }
    }
}

fn convert_command(
    schema_path: &Path,
    type_expr: &str,
    input: Option<&Path>,
    pretty: bool,
    limits: Limits,
) -> anyhow::Result<()> {
    let (registry, target) = prepare(schema_path, type_expr)?;
    let value = read_input(input)?;
    let node = node_from_json(&value)?;

    let instance = Converter::new(&registry)
        .with_limits(limits)
        .convert(&node, &target)?;

    let output = instance_to_json(&instance);
    if pretty {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{output}");
    }
    Ok(())
}

fn check_command(schema_path: &Path, type_expr: &str, inputs: &[PathBuf], limits: Limits) -> anyhow::Result<()> {
    let (registry, target) = prepare(schema_path, type_expr)?;
    let converter = Converter::new(&registry).with_limits(limits);

    let mut failures = 0;
    for path in inputs {
        let outcome = read_json_file(path)
            .and_then(|value| node_from_json(&value))
            .and_then(|node| Ok(converter.convert(&node, &target)?));
        match outcome {
            Ok(_) => println!("{}: ok", path.display()),
            Err(err) => {
                failures += 1;
                println!("{}: {err}", path.display());
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} inputs failed", inputs.len());
    }
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

#[derive(Serialize)]
struct SchemaReport {
    records: Vec<RecordReport>,
    aliases: Vec<AliasReport>,
}

#[derive(Serialize)]
struct RecordReport {
    name: String,
    fields: Vec<FieldReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
}

#[derive(Serialize)]
struct FieldReport {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    descriptor: TypeDescriptor,
}

#[derive(Serialize)]
struct AliasReport {
    name: String,
    target: String,
    descriptor: TypeDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
}

fn inspect_command(schema_path: &Path, show_hashes: bool, json: bool) -> anyhow::Result<()> {
    let schema = load_schema(schema_path).with_context(|| format!("failed to load {}", schema_path.display()))?;
    let registry = schema
        .clone()
        .into_registry()
        .with_context(|| format!("invalid schema {}", schema_path.display()))?;
    let report = build_report(&schema, &registry, show_hashes);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build_report(schema: &Schema, registry: &Registry, show_hashes: bool) -> SchemaReport {
    let hash_of = |ty: &TypeDescriptor| show_hashes.then(|| fingerprint(ty, registry).to_hex());
    let mut report = SchemaReport {
        records: Vec::new(),
        aliases: Vec::new(),
    };

    for definition in schema.definitions() {
        match definition {
            Definition::Record { name, fields } => report.records.push(RecordReport {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|field| FieldReport {
                        name: field.name.clone(),
                        ty: field.ty.to_string(),
                        descriptor: field.ty.clone(),
                    })
                    .collect(),
                hash: hash_of(&TypeDescriptor::record(name.as_str())),
            }),
            Definition::Alias { name, target } => report.aliases.push(AliasReport {
                name: name.clone(),
                target: target.to_string(),
                descriptor: target.clone(),
                hash: hash_of(target),
            }),
        }
    }

    report.records.sort_by(|a, b| a.name.cmp(&b.name));
    report.aliases.sort_by(|a, b| a.name.cmp(&b.name));
    report
}

fn print_report(report: &SchemaReport) {
    if !report.records.is_empty() {
        println!("records:");
        for record in &report.records {
            let fields = record
                .fields
                .iter()
                .map(|f| format!("{}: {}", f.name, f.ty))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {} {{ {} }}", record.name, fields);
            if let Some(hash) = &record.hash {
                println!("    hash: {hash}");
            }
        }
    }

    if !report.aliases.is_empty() {
        println!("aliases:");
        for alias in &report.aliases {
            println!("  {} = {}", alias.name, alias.target);
            if let Some(hash) = &alias.hash {
                println!("    hash: {hash}");
            }
        }
    }
}
