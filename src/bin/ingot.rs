//! ingot: Flatten a JSON document into relational CSV tables
//!
//! Usage:
//!   # Read from file, write one CSV per table into ./out
//!   ingot data.json --out-dir ./out
//!
//!   # Read from stdin
//!   echo '{"name": "Ann", "tags": ["x", "y"]}' | ingot -o ./out
//!
//!   # One document per line, all sharing the same tables
//!   ingot --ndjson events.jsonl -o ./out --mkdir
//!
//! Set RUST_LOG (or pass -v) for more detail; skipped elements are logged as warnings.

// Use MiMalloc allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use ingot::melt::{CsvOptions, IdColumn, MeltConfig, QuoteStyle, SchemaPolicy};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingot")]
#[command(about = "Flatten nested JSON into relational CSV tables", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Directory that receives one <table>.csv per table
    #[arg(long, short = 'o', env = "INGOT_OUT_DIR")]
    out_dir: PathBuf,

    /// Create the output directory if it does not exist
    #[arg(long)]
    mkdir: bool,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Table name for the top-level document (default: "main")
    #[arg(long)]
    root_name: Option<String>,

    /// Separator for nested table names (default: "_")
    #[arg(long)]
    separator: Option<String>,

    /// Name object-array tables <owner>_<field> instead of <field>
    #[arg(long)]
    qualified_names: bool,

    /// Skip objects whose keys differ from their table's first object
    #[arg(long)]
    reject_mismatched: bool,

    /// Quote every non-empty text field, not only those that need it
    #[arg(long)]
    quote_text: bool,

    /// Leave out the id column of tables whose rows nothing refers to
    #[arg(long)]
    omit_unreferenced_ids: bool,

    /// Print the parsed document tree to stdout before flattening
    #[arg(long)]
    print_tree: bool,

    /// Print a JSON summary of the written tables to stdout
    #[arg(long)]
    summary: bool,

    /// Exit with an error if any part of the document was skipped
    #[arg(long)]
    strict: bool,

    /// More log output (-v: info, -vv: debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Build config
    let mut config = MeltConfig::default();
    if let Some(name) = args.root_name.clone() {
        config.root_name = name;
    }
    if let Some(sep) = args.separator.clone() {
        config.separator = sep;
    }
    config.qualified_names = args.qualified_names;
    if args.reject_mismatched {
        config.schema_policy = SchemaPolicy::Reject;
    }

    let options = CsvOptions {
        quote_style: if args.quote_text {
            QuoteStyle::NonNumeric
        } else {
            QuoteStyle::Necessary
        },
        id_column: if args.omit_unreferenced_ids {
            IdColumn::WhenReferenced
        } else {
            IdColumn::Always
        },
    };

    if args.mkdir {
        std::fs::create_dir_all(&args.out_dir).with_context(|| {
            format!("Failed to create output directory {}", args.out_dir.display())
        })?;
    }

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin()),
    };

    let result = if args.print_tree {
        print_then_melt(reader, config, args.ndjson)?
    } else {
        ingot::melt_json(reader, config, args.ndjson).context("Failed to read input")?
    };

    let written = ingot::CsvWriter::new(options)
        .write_catalog(&result.catalog, &args.out_dir)
        .context("Failed to write tables")?;

    tracing::info!(
        tables = written.len(),
        rows = result.catalog.ids_issued(),
        skipped = result.diagnostics.len(),
        "done"
    );

    if args.summary {
        let summary = serde_json::to_string_pretty(&result.catalog.summary())?;
        println!("{}", summary);
    }

    if args.strict && !result.diagnostics.is_empty() {
        bail!(
            "{} element(s) skipped, first {}",
            result.diagnostics.len(),
            result.diagnostics[0]
        );
    }

    Ok(())
}

/// Parse, dump the tree of every document, then flatten.
fn print_then_melt(
    mut reader: Box<dyn Read>,
    config: MeltConfig,
    ndjson: bool,
) -> Result<ingot::Normalized> {
    let documents = if ndjson {
        ingot::parse_ndjson(BufReader::new(reader))?
    } else {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).context("Failed to read input")?;
        vec![ingot::parse_document(&content)?]
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut normalizer = ingot::Normalizer::new(config);
    for document in &documents {
        document.write_tree(&mut out)?;
        normalizer.flatten_document(document);
    }
    out.flush()?;

    Ok(normalizer.finish())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}
