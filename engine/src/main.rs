//! Docmap CLI - Transform CSV files into JSON documents
//!
//! ```bash
//! docmap transform users.csv mapping.json -o users.json   # Full pipeline
//! docmap parse users.csv                                  # CSV rows as JSON
//! docmap validate mapping.json                            # Check a schema
//! docmap example-schema [--nested]                        # Print an example schema
//! docmap types                                            # Supported target types
//! ```
//!
//! Defaults can be set in the environment or a `.env` file:
//! `DOCMAP_DELIMITER`, `DOCMAP_PREVIEW_ROWS`, `DOCMAP_DIAGNOSTIC_LIMIT`.

use clap::{Parser, Subcommand};
use docmap::logs::LOG_BROADCASTER;
use docmap::models::TargetType;
use docmap::pipeline::{export_file_name, parse_delimiter, transform_files, TransformOptions};
use docmap::{example_nested_schema, example_schema, load_schema, parse_bytes_auto};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Transform CSV rows into typed JSON documents", long_about = None)]
struct Cli {
    /// Suppress progress output on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Cell separator: a character, "tab" or "auto"
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transform a CSV file with a mapping schema
    Transform {
        /// Input CSV file
        input: PathBuf,

        /// Mapping schema (JSON)
        schema: PathBuf,

        /// Cell separator: a character, "tab" or "auto"
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Collection to transform (nested schemas; default: first)
        #[arg(short, long)]
        collection: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the output next to the input as <collection>-mongodb.json
        #[arg(long, conflicts_with = "output")]
        export: bool,

        /// Documents shown in the stderr preview (0 to disable; default 5)
        #[arg(long)]
        preview: Option<usize>,

        /// Number of diagnostics listed before summarising
        #[arg(long)]
        max_diagnostics: Option<usize>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// Validate a mapping schema
    Validate {
        /// Mapping schema (JSON)
        schema: PathBuf,
    },

    /// Show an example mapping schema
    ExampleSchema {
        /// Use the collections shape
        #[arg(long)]
        nested: bool,
    },

    /// Show the supported target types
    Types,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter.as_deref(), output.as_deref()),

        Commands::Transform {
            input,
            schema,
            delimiter,
            collection,
            output,
            export,
            preview,
            max_diagnostics,
            compact,
        } => cmd_transform(
            &input,
            &schema,
            TransformArgs {
                delimiter,
                collection,
                export,
                preview,
                max_diagnostics,
                compact,
                quiet,
            },
            output,
        ),

        Commands::Validate { schema } => cmd_validate(&schema),

        Commands::ExampleSchema { nested } => cmd_example_schema(nested),

        Commands::Types => cmd_types(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct TransformArgs {
    delimiter: Option<String>,
    collection: Option<String>,
    export: bool,
    preview: Option<usize>,
    max_diagnostics: Option<usize>,
    compact: bool,
    quiet: bool,
}

fn resolve_delimiter(raw: &str) -> Result<Option<char>, Box<dyn std::error::Error>> {
    parse_delimiter(raw).ok_or_else(|| format!("Invalid delimiter: '{}'", raw).into())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let delimiter = match delimiter {
        Some(raw) => resolve_delimiter(raw)?,
        None => TransformOptions::from_env().delimiter,
    };
    let bytes = fs::read(input)?;
    let result = parse_bytes_auto(&bytes, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_transform(
    input: &Path,
    schema: &Path,
    args: TransformArgs,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = if args.export {
        Some(export_path(input, schema)?)
    } else {
        output
    };

    let mut options = TransformOptions::from_env();
    if let Some(raw) = args.delimiter.as_deref() {
        options.delimiter = resolve_delimiter(raw)?;
    }
    if let Some(n) = args.max_diagnostics {
        options.diagnostic_limit = n;
    }
    if let Some(n) = args.preview {
        options.preview_rows = n;
    }
    options.collection = args.collection;

    let result = transform_files(input, schema, &options)?;

    if !args.quiet && !result.head().is_empty() {
        eprintln!("\nPreview ({} of {}):", result.head().len(), result.documents.len());
        eprintln!("{}", result.export_preview(result.preview_rows)?);
    }

    let json = result.documents_json(!args.compact)?;
    write_output(&json, output.as_deref())?;

    if !result.diagnostics.is_empty() {
        eprintln!("\n{} diagnostics", result.diagnostics.len());
    }
    Ok(())
}

fn cmd_validate(schema_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Validating: {}", schema_path.display());

    let content = fs::read_to_string(schema_path)?;
    let schema = load_schema(&content)?;

    println!("Shape: {}", schema.shape());
    if schema.shape() == docmap::SchemaShape::Nested {
        println!("Collections: {}", schema.collection_names().join(", "));
    }
    println!("Mappings: {}", schema.mapping_count());
    for (target, mapping) in schema.active_mappings() {
        println!("  {} -> {} ({})", mapping.from, target, mapping.kind);
    }
    println!("Export file: {}", export_file_name(&schema));

    Ok(())
}

fn cmd_example_schema(nested: bool) -> Result<(), Box<dyn std::error::Error>> {
    let schema = if nested {
        example_nested_schema()
    } else {
        example_schema()
    };
    println!("{}", schema.to_json_pretty()?);
    Ok(())
}

fn cmd_types() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supported target types:\n");
    for kind in TargetType::KNOWN {
        println!("  {:<8} {}", kind.as_str(), kind.description());
    }
    println!("\nEmpty or missing values always resolve to the mapping's default (or null).");
    Ok(())
}

fn export_path(input: &Path, schema_path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let schema = load_schema(&fs::read_to_string(schema_path)?)?;
    let dir = input.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(export_file_name(&schema)))
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
