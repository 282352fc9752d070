//! Command-line interface for xmlschema-grammar

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlschema_grammar::{BuiltSchema, EventSource, SchemaLoader, TraversalOptions};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdgrammar")]
#[command(author, version, about = "Build XML Schema grammars and report schema errors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args, Debug)]
struct LoadArgs {
    /// Path to the root XSD schema document
    #[arg(value_name = "SCHEMA")]
    schema: PathBuf,

    /// JSON file with traversal options
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Parse documents through push callbacks instead of the pull reader
    #[arg(long)]
    push: bool,

    /// Let later global declarations replace earlier ones of the same name
    #[arg(long)]
    tolerate_duplicates: bool,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the grammars of a schema set and display their components
    Inspect {
        #[command(flatten)]
        load: LoadArgs,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Build a schema set and list its diagnostics; exits 1 on errors
    Check {
        #[command(flatten)]
        load: LoadArgs,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { load, json } => cmd_inspect(load, json),
        Commands::Check { load } => cmd_check(load),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn load(args: &LoadArgs) -> Result<BuiltSchema, Box<dyn std::error::Error>> {
    let mut options = match &args.config {
        Some(path) => TraversalOptions::from_json_file(path)?,
        None => TraversalOptions::default(),
    };
    if args.push {
        options.event_source = EventSource::Push;
    }
    if args.tolerate_duplicates {
        options.tolerate_duplicates = true;
    }
    let location = args.schema.to_string_lossy();
    Ok(SchemaLoader::new(options).load_location(&location)?)
}

#[cfg(feature = "cli")]
fn cmd_inspect(args: LoadArgs, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&args)?;
    let summary = schema.summary();

    if json_output {
        println!("{}", summary.to_json()?);
        return Ok(());
    }

    println!("xmlschema-grammar v{}", xmlschema_grammar::VERSION);
    println!();
    println!("Documents:");
    for document in schema.documents() {
        println!("  {}", document);
    }

    for grammar in &summary.grammars {
        println!();
        match &grammar.target_namespace {
            Some(ns) => println!("=== Grammar {} ===", ns),
            None => println!("=== Grammar (no namespace) ==="),
        }
        print_names("Elements", &grammar.elements);
        print_names("Attributes", &grammar.attributes);
        print_names("Complex Types", &grammar.complex_types);
        print_names("Simple Types", &grammar.simple_types);
        print_names("Notations", &grammar.notations);

        if !grammar.groups.is_empty() {
            println!("  Model Groups:");
            for group in &grammar.groups {
                println!("    {} ({}): {}", group.name, group.compositor, group.particles.join(", "));
            }
        }
        if !grammar.attribute_groups.is_empty() {
            println!("  Attribute Groups:");
            for group in &grammar.attribute_groups {
                let wildcard = if group.wildcard { " + anyAttribute" } else { "" };
                println!("    {}: {}{}", group.name, group.attributes.join(", "), wildcard);
            }
        }
        if !grammar.identity_constraints.is_empty() {
            println!("  Identity Constraints:");
            for constraint in &grammar.identity_constraints {
                let refer = constraint
                    .refer
                    .as_ref()
                    .map(|key| format!(" -> {}", key))
                    .unwrap_or_default();
                println!(
                    "    {} {} on {} ({} fields){}",
                    constraint.kind, constraint.name, constraint.element, constraint.fields, refer
                );
            }
        }
    }

    for record in schema.redefinitions() {
        println!();
        println!("Redefined {} (original renamed to {})", record.name, record.original);
    }

    println!();
    println!("Diagnostics: {} errors, {} warnings", summary.errors, summary.warnings);
    Ok(())
}

#[cfg(feature = "cli")]
fn print_names(title: &str, names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("  {}:", title);
    for name in names {
        println!("    {}", name);
    }
}

#[cfg(feature = "cli")]
fn cmd_check(args: LoadArgs) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load(&args)?;

    for diagnostic in schema.diagnostics() {
        println!("{}", diagnostic);
    }

    if schema.is_valid() {
        println!("✓ Schema is valid");
        Ok(())
    } else {
        println!("✗ Schema has {} errors", schema.errors().count());
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
