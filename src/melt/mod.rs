//! JSON melting - flatten a document tree into relational tables
//!
//! Objects become rows, nested objects become rows of their own table
//! referenced through a foreign-key column, and arrays become child or
//! junction tables pointing back at the row that held them. Table schemas
//! are fixed by the first object seen for each `(owning table, field)` pair.

pub mod types;
pub mod ids;
pub mod naming;
pub mod catalog;
pub mod normalizer;
pub mod writer;

pub use types::{Cell, Column, ColumnKind, MeltConfig, SchemaPolicy, SurrogateId, TableId, TableIdentity, TableKind};
pub use ids::IdAllocator;
pub use catalog::{Catalog, Row, Table, TableSummary};
pub use normalizer::{Context, Diagnostic, NormalizeWarning, Normalized, Normalizer};
pub use writer::{escape_field, CsvOptions, CsvWriter, IdColumn, QuoteStyle};
