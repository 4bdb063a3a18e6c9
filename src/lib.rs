//! # Ingot - JSON to relational CSV
//!
//! Flattens a parsed JSON document into a set of relational tables and writes
//! each table as a CSV file.
//!
//! ## Modules
//!
//! - **value**: the document tree the normalizer works on
//! - **melt**: table catalog, normalizer and CSV writer
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::melt::{CsvOptions, CsvWriter, MeltConfig, Normalizer};
//! use ingot::Value;
//! use serde_json::json;
//!
//! let document = Value::from(json!({
//!     "name": "Ann",
//!     "tags": ["x", "y"],
//!     "items": [{"k": 1}, {"k": 2}]
//! }));
//!
//! let mut normalizer = Normalizer::new(MeltConfig::default());
//! normalizer.flatten_document(&document);
//! let result = normalizer.finish();
//!
//! // main, main_tags, items
//! assert_eq!(result.catalog.len(), 3);
//!
//! let mut csv = Vec::new();
//! let writer = CsvWriter::new(CsvOptions::default());
//! writer.write_table(&result.catalog.tables()[0], &mut csv).unwrap();
//! assert_eq!(String::from_utf8(csv).unwrap(), "id,name\n1,Ann\n");
//! ```
//!
//! ## Output styles
//!
//! By default every table starts with an `id` column and text is quoted
//! only when it contains a comma, a double quote or a line break. Quoting
//! every text field ([`melt::QuoteStyle::NonNumeric`]) and writing ids only
//! for rows something can point at ([`melt::IdColumn::WhenReferenced`]) gives
//! the compact layout below; the CLI equivalents are `--quote-text` and
//! `--omit-unreferenced-ids`.
//!
//! ```rust
//! use ingot::melt::{CsvOptions, CsvWriter, IdColumn, MeltConfig, QuoteStyle};
//!
//! let input = br#"{"name": "Ann", "age": 30, "tags": ["x", "y"]}"#;
//! let result = ingot::melt_json(&input[..], MeltConfig::default(), false).unwrap();
//!
//! let writer = CsvWriter::new(CsvOptions {
//!     quote_style: QuoteStyle::NonNumeric,
//!     id_column: IdColumn::WhenReferenced,
//! });
//! let render = |idx: usize| {
//!     let mut csv = Vec::new();
//!     writer.write_table(&result.catalog.tables()[idx], &mut csv).unwrap();
//!     String::from_utf8(csv).unwrap()
//! };
//! assert_eq!(render(0), "id,name,age\n1,\"Ann\",30\n");
//! assert_eq!(render(1), "parent_id,index,value\n1,0,\"x\"\n1,1,\"y\"\n");
//! ```

use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub mod error;
pub mod melt;
pub mod value;

pub use error::{Error, Result};
pub use melt::{Catalog, CsvOptions, CsvWriter, MeltConfig, Normalized, Normalizer};
pub use value::{parse_document, parse_ndjson, Value};

/// Read JSON from `reader` and flatten it. With `ndjson`, every non-empty
/// line is a separate document and all of them share one set of tables.
pub fn melt_json<R: Read>(reader: R, config: MeltConfig, ndjson: bool) -> Result<Normalized> {
    let documents = if ndjson {
        parse_ndjson(BufReader::new(reader))?
    } else {
        let mut content = Vec::new();
        BufReader::new(reader)
            .read_to_end(&mut content)
            .map_err(Error::Read)?;
        vec![parse_document(&content)?]
    };

    let mut normalizer = Normalizer::new(config);
    for document in &documents {
        normalizer.flatten_document(document);
    }
    Ok(normalizer.finish())
}

/// [`melt_json`], then write every table into `out_dir` as `<table>.csv`.
pub fn melt_to_dir<R: Read>(
    reader: R,
    out_dir: &Path,
    config: MeltConfig,
    options: CsvOptions,
    ndjson: bool,
) -> Result<(Normalized, Vec<PathBuf>)> {
    let normalized = melt_json(reader, config, ndjson)?;
    let written = CsvWriter::new(options).write_catalog(&normalized.catalog, out_dir)?;
    Ok((normalized, written))
}
