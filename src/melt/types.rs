use serde::Serialize;
use std::fmt;
use std::num::NonZeroU64;

/// Surrogate primary key of a row. Unique across the whole run, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SurrogateId(NonZeroU64);

impl SurrogateId {
    pub(crate) fn new(id: NonZeroU64) -> Self {
        SurrogateId(id)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a table in its catalog, which is also its creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub(crate) usize);

impl TableId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What decides whether two objects share a table: the table that owns the
/// field and the field name, not the shape of the objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableIdentity {
    /// The top-level document.
    Root,
    Field { owner: TableId, field: String },
}

impl TableIdentity {
    pub fn field(owner: TableId, field: impl Into<String>) -> Self {
        TableIdentity::Field {
            owner,
            field: field.into(),
        }
    }
}

/// How the rows of a table were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Objects reached through the root or an object-valued field.
    Entity,
    /// Elements of an array of objects, keyed by `(parent_id, seq)`.
    Child,
    /// Elements of an array of scalars, as `(parent_id, index, value)`.
    Junction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Scalar text taken from an object field.
    Value,
    /// Id of a row in the table built from a nested object.
    ForeignKey,
    /// Id of the row that owns the array this row came from.
    ParentRef,
    /// Position of the element within its array.
    Ordinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Header name; unique within the table.
    pub name: String,
    pub kind: ColumnKind,
    /// Object key that fills this column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Column {
    pub fn value(key: impl Into<String>) -> Self {
        let key = key.into();
        Column {
            name: key.clone(),
            kind: ColumnKind::Value,
            source: Some(key),
        }
    }

    pub fn foreign_key(key: impl Into<String>, suffix: &str) -> Self {
        let key = key.into();
        Column {
            name: format!("{key}{suffix}"),
            kind: ColumnKind::ForeignKey,
            source: Some(key),
        }
    }

    pub fn parent_ref() -> Self {
        Column {
            name: String::from("parent_id"),
            kind: ColumnKind::ParentRef,
            source: None,
        }
    }

    /// The `value` column of a junction table.
    pub fn element() -> Self {
        Column {
            name: String::from("value"),
            kind: ColumnKind::Value,
            source: None,
        }
    }

    pub fn ordinal(name: &str) -> Self {
        Column {
            name: name.to_string(),
            kind: ColumnKind::Ordinal,
            source: None,
        }
    }
}

/// One field of a row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    /// Missing or null.
    #[default]
    Empty,
    Text(String),
    /// Lexical number text, written as-is.
    Number(String),
    /// Reference to another row.
    Key(SurrogateId),
    Ordinal(usize),
}

/// Whether objects that disagree with their table's first-seen key set are
/// accepted or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Unknown keys are dropped, absent keys become empty cells.
    #[default]
    FirstSeen,
    /// Objects whose key set differs are skipped with a diagnostic.
    Reject,
}

/// Configuration for the melting process
#[derive(Debug, Clone)]
pub struct MeltConfig {
    /// Table name for the top-level document
    pub root_name: String,

    /// Separator for nested table names
    pub separator: String,

    /// Suffix for foreign-key columns of nested objects
    pub fk_suffix: String,

    /// Name object-array tables `<owner><sep><field>` instead of `<field>`
    pub qualified_names: bool,

    pub schema_policy: SchemaPolicy,
}

impl Default for MeltConfig {
    fn default() -> Self {
        MeltConfig {
            root_name: String::from("main"),
            separator: String::from("_"),
            fk_suffix: String::from("_id"),
            qualified_names: false,
            schema_policy: SchemaPolicy::FirstSeen,
        }
    }
}
