use crate::error::{Error, Result};
use crate::melt::catalog::{Catalog, Table};
use crate::melt::types::{Cell, TableKind};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// When text fields are wrapped in double quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// Only fields containing a comma, a double quote or a line break.
    #[default]
    Necessary,
    /// Also every non-empty text field. Numbers and ids stay bare.
    NonNumeric,
}

/// Which tables get a leading `id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdColumn {
    #[default]
    Always,
    /// Only object tables and tables whose rows own nested data. Rows of
    /// junction tables, and of child tables with nothing below them, are
    /// never referenced, so their ids are left out.
    WhenReferenced,
}

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub quote_style: QuoteStyle,
    pub id_column: IdColumn,
}

/// Quote `field` if it contains a comma, a double quote or a line break,
/// doubling any embedded quotes.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(quote(field))
    } else {
        Cow::Borrowed(field)
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Writes each table of a catalog as a CSV file.
pub struct CsvWriter {
    options: CsvOptions,
}

impl CsvWriter {
    pub fn new(options: CsvOptions) -> Self {
        CsvWriter { options }
    }

    /// Write `table` to `out`: an `id,<columns>` header, then one line per row.
    pub fn write_table<W: Write>(&self, table: &Table, mut out: W) -> std::io::Result<()> {
        let with_id = match self.options.id_column {
            IdColumn::Always => true,
            IdColumn::WhenReferenced => table.kind() == TableKind::Entity || table.is_referenced(),
        };

        let mut line = String::new();
        let mut names = table.columns().iter().map(|c| escape_field(&c.name));
        if with_id {
            line.push_str("id");
        } else if let Some(first) = names.next() {
            line.push_str(&first);
        }
        for name in names {
            line.push(',');
            line.push_str(&name);
        }
        writeln!(out, "{line}")?;

        for row in table.rows() {
            line.clear();
            let mut cells = row.cells.iter();
            if with_id {
                line.push_str(&row.id.to_string());
            } else if let Some(first) = cells.next() {
                self.push_cell(&mut line, first);
            }
            for cell in cells {
                line.push(',');
                self.push_cell(&mut line, cell);
            }
            writeln!(out, "{line}")?;
        }

        out.flush()
    }

    fn push_cell(&self, line: &mut String, cell: &Cell) {
        match cell {
            Cell::Empty => {}
            Cell::Key(id) => line.push_str(&id.to_string()),
            Cell::Ordinal(n) => line.push_str(&n.to_string()),
            Cell::Number(n) => line.push_str(&escape_field(n)),
            Cell::Text(s) if s.is_empty() => {}
            Cell::Text(s) => match self.options.quote_style {
                QuoteStyle::Necessary => line.push_str(&escape_field(s)),
                QuoteStyle::NonNumeric => line.push_str(&quote(s)),
            },
        }
    }

    /// Write every table into `dir` as `<table name>.csv`, in creation order.
    ///
    /// `dir` must already exist. The first file that cannot be written
    /// aborts the whole run; files written before it are left in place.
    pub fn write_catalog(&self, catalog: &Catalog, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(Error::OutputDir(dir.to_path_buf()));
        }

        let mut written = Vec::with_capacity(catalog.len());
        for table in catalog.tables() {
            let path = dir.join(format!("{}.csv", table.name()));
            let file = File::create(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            self.write_table(table, BufWriter::new(file))
                .map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;

            tracing::info!(
                table = %table.name(),
                rows = table.rows().len(),
                path = %path.display(),
                "wrote table"
            );
            written.push(path);
        }

        Ok(written)
    }
}
