use crate::melt::catalog::Catalog;
use crate::melt::types::{
    Cell, Column, ColumnKind, MeltConfig, SchemaPolicy, SurrogateId, TableId, TableIdentity,
    TableKind,
};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Why part of the document was left out of the tables. None of these stop
/// the run; the offending element (and everything below it) is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeWarning {
    /// An element does not match the kind of the array's first element.
    #[error("array element is {found}, expected {expected} like the first element")]
    MixedArray {
        expected: &'static str,
        found: &'static str,
    },
    /// An array directly inside an array.
    #[error("nested arrays are not supported")]
    NestedArray,
    /// A field's value does not fit the column fixed by the table's first row.
    #[error("field `{key}` is {found}, but column `{column}` of table `{table}` holds {expected} values")]
    ColumnConflict {
        table: String,
        column: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The same field produced both an object and an array, or two kinds of array.
    #[error("table `{table}` holds {existing:?} rows, cannot add {requested:?} rows")]
    TableKindConflict {
        table: String,
        existing: TableKind,
        requested: TableKind,
    },
    /// Key set differs from the table's first-seen schema (reject policy only).
    #[error("object keys do not match the schema of table `{table}`")]
    SchemaMismatch { table: String },
    /// A top-level scalar has no table to go into.
    #[error("top-level {found} cannot be stored in a table")]
    ScalarDocument { found: &'static str },
}

/// A warning plus the JSON pointer of the element it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub warning: NormalizeWarning,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "at document root: {}", self.warning)
        } else {
            write!(f, "at {}: {}", self.path, self.warning)
        }
    }
}

/// Where a foreign key to the next row must be written.
#[derive(Debug, Clone, Copy)]
struct Link {
    table: TableId,
    row: SurrogateId,
    column: usize,
}

/// Where a value sits relative to the tables built so far.
#[derive(Debug, Clone)]
pub struct Context {
    /// Table the value's rows go into.
    pub identity: TableIdentity,
    /// Row owning the array this value came from.
    pub parent: Option<SurrogateId>,
    /// Position within that array.
    pub seq: Option<usize>,
    link: Option<Link>,
    path: String,
}

impl Context {
    /// The top-level document.
    pub fn root() -> Self {
        Context {
            identity: TableIdentity::Root,
            parent: None,
            seq: None,
            link: None,
            path: String::new(),
        }
    }

    /// An array held by field `field` of row `parent` in table `owner`.
    pub fn array_field(owner: TableId, field: &str, parent: SurrogateId) -> Self {
        Context {
            identity: TableIdentity::field(owner, field),
            parent: Some(parent),
            seq: None,
            link: None,
            path: child_path("", field),
        }
    }
}

/// A value waiting to be flattened.
struct Task<'v> {
    value: &'v Value,
    context: Context,
}

/// Result of a run: the filled catalog and everything that was skipped.
#[derive(Debug)]
pub struct Normalized {
    pub catalog: Catalog,
    pub diagnostics: Vec<Diagnostic>,
}

/// Flattens document trees into the tables of a [`Catalog`].
///
/// Objects become rows, nested objects become rows of a child table linked
/// by a `<key>_id` column, arrays of objects become rows carrying
/// `(parent_id, seq)` and arrays of scalars become `(parent_id, index, value)`
/// rows. Traversal is depth-first on an explicit stack, so nesting depth is
/// limited by memory only.
pub struct Normalizer {
    config: MeltConfig,
    catalog: Catalog,
    diagnostics: Vec<Diagnostic>,
}

impl Normalizer {
    pub fn new(config: MeltConfig) -> Self {
        let catalog = Catalog::new(&config);
        Normalizer {
            config,
            catalog,
            diagnostics: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Flatten one top-level document. Several documents flattened by the
    /// same normalizer share their tables.
    pub fn flatten_document(&mut self, value: &Value) {
        self.flatten(value, Context::root());
    }

    /// Flatten `value` and everything below it.
    pub fn flatten(&mut self, value: &Value, context: Context) {
        let mut stack = vec![Task { value, context }];

        while let Some(Task { value, context }) = stack.pop() {
            match value {
                Value::Object(fields) => self.flatten_object(fields, context, &mut stack),
                Value::Array(items) => self.flatten_array(items, context, &mut stack),
                scalar => self.warn(
                    &context.path,
                    NormalizeWarning::ScalarDocument {
                        found: scalar.kind_name(),
                    },
                ),
            }
        }
    }

    pub fn finish(self) -> Normalized {
        Normalized {
            catalog: self.catalog,
            diagnostics: self.diagnostics,
        }
    }

    /// One object becomes one row.
    fn flatten_object<'v>(
        &mut self,
        fields: &'v [(String, Value)],
        context: Context,
        stack: &mut Vec<Task<'v>>,
    ) {
        let kind = if context.seq.is_some() {
            TableKind::Child
        } else {
            TableKind::Entity
        };

        let existed = self
            .catalog
            .lookup(&context.identity)
            .is_some_and(|id| !self.catalog.table(id).is_provisional());
        let proposed = if existed {
            Vec::new()
        } else {
            self.propose_columns(fields, &context)
        };
        let table = self
            .catalog
            .get_or_create(context.identity.clone(), kind, proposed);
        let t = self.catalog.table(table);

        if t.kind() != kind {
            let warning = NormalizeWarning::TableKindConflict {
                table: t.name().to_string(),
                existing: t.kind(),
                requested: kind,
            };
            self.warn(&context.path, warning);
            return;
        }

        if existed && self.config.schema_policy == SchemaPolicy::Reject {
            let mismatch = {
                let expected: HashSet<&str> = t.source_keys().collect();
                let actual: HashSet<&str> = fields
                    .iter()
                    .filter(|(_, v)| !matches!(v, Value::Array(_)))
                    .map(|(k, _)| k.as_str())
                    .collect();
                expected != actual
            };
            if mismatch {
                let warning = NormalizeWarning::SchemaMismatch {
                    table: t.name().to_string(),
                };
                self.warn(&context.path, warning);
                return;
            }
        }

        let mut cells = vec![Cell::Empty; t.columns().len()];
        if let (Some(parent), Some(col)) = (context.parent, t.column_of_kind(ColumnKind::ParentRef)) {
            cells[col] = Cell::Key(parent);
        }
        if let (Some(seq), Some(col)) = (context.seq, t.column_of_kind(ColumnKind::Ordinal)) {
            cells[col] = Cell::Ordinal(seq);
        }

        // (key, value, foreign-key column) of fields that get their own rows
        let mut nested: Vec<(&'v str, &'v Value, Option<usize>)> = Vec::new();
        let mut conflicts = Vec::new();

        for (key, value) in fields {
            match (value, t.column_for(key)) {
                (Value::Array(_), _) => nested.push((key.as_str(), value, None)),
                (Value::Object(_), Some((col, ColumnKind::ForeignKey))) => {
                    nested.push((key.as_str(), value, Some(col)));
                }
                (Value::Null, Some((_, ColumnKind::ForeignKey))) => {}
                (Value::Object(_), None) => {
                    tracing::debug!(table = %t.name(), key = %key, "dropping object field not in schema");
                }
                (scalar, Some((col, ColumnKind::Value))) if scalar.is_scalar() => {
                    cells[col] = scalar_cell(scalar);
                }
                (_, Some((col, column_kind))) => {
                    conflicts.push((
                        child_path(&context.path, key),
                        NormalizeWarning::ColumnConflict {
                            table: t.name().to_string(),
                            column: t.columns()[col].name.clone(),
                            key: key.clone(),
                            expected: expected_kind(column_kind),
                            found: value.kind_name(),
                        },
                    ));
                }
                (_, None) => {
                    tracing::debug!(table = %t.name(), key = %key, "dropping field not in schema");
                }
            }
        }

        for (path, warning) in conflicts {
            self.warn(&path, warning);
        }

        let id = self.catalog.append_row(table, cells);

        // the referencing row exists already; its key cell is filled now that
        // this row has an id
        if let Some(link) = context.link {
            self.catalog
                .set_cell(link.table, link.row, link.column, Cell::Key(id));
        }

        for (key, value, fk_column) in nested.into_iter().rev() {
            let identity = TableIdentity::field(table, key);
            let path = child_path(&context.path, key);
            let child = match fk_column {
                Some(column) => Context {
                    identity,
                    parent: None,
                    seq: None,
                    link: Some(Link {
                        table,
                        row: id,
                        column,
                    }),
                    path,
                },
                None => Context {
                    identity,
                    parent: Some(id),
                    seq: None,
                    link: None,
                    path,
                },
            };
            stack.push(Task { value, context: child });
        }
    }

    /// Arrays are classified by their first element: objects go to a child
    /// table, anything else (or nothing) to a junction table.
    fn flatten_array<'v>(&mut self, items: &'v [Value], context: Context, stack: &mut Vec<Task<'v>>) {
        match items.first() {
            Some(Value::Object(_)) => self.flatten_object_array(items, context, stack),
            _ => self.flatten_scalar_array(items, context),
        }
    }

    fn flatten_object_array<'v>(
        &mut self,
        items: &'v [Value],
        context: Context,
        stack: &mut Vec<Task<'v>>,
    ) {
        if let Some(existing) = self.catalog.lookup(&context.identity) {
            let t = self.catalog.table(existing);
            if t.kind() != TableKind::Child && !t.is_provisional() {
                let warning = NormalizeWarning::TableKindConflict {
                    table: t.name().to_string(),
                    existing: t.kind(),
                    requested: TableKind::Child,
                };
                self.warn(&context.path, warning);
                return;
            }
        }

        let mut elements = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let path = index_path(&context.path, idx);
            if matches!(item, Value::Object(_)) {
                elements.push((idx, item, path));
            } else {
                let warning = NormalizeWarning::MixedArray {
                    expected: "object",
                    found: item.kind_name(),
                };
                self.warn(&path, warning);
            }
        }

        // the first element is popped first and fixes the table's columns
        for (idx, item, path) in elements.into_iter().rev() {
            stack.push(Task {
                value: item,
                context: Context {
                    identity: context.identity.clone(),
                    parent: context.parent,
                    seq: Some(idx),
                    link: None,
                    path,
                },
            });
        }
    }

    fn flatten_scalar_array(&mut self, items: &[Value], context: Context) {
        if items.is_empty() && self.catalog.lookup(&context.identity).is_some() {
            // nothing to add, and any existing table will do
            return;
        }

        let mut proposed = Vec::with_capacity(3);
        if context.parent.is_some() {
            proposed.push(Column::parent_ref());
        }
        proposed.push(Column::ordinal("index"));
        proposed.push(Column::element());

        // an empty array only reserves the table; the first non-empty array
        // under the same field decides what it holds
        let table = if items.is_empty() {
            self.catalog
                .get_or_create_provisional(context.identity.clone(), TableKind::Junction, proposed)
        } else {
            self.catalog
                .get_or_create(context.identity.clone(), TableKind::Junction, proposed)
        };
        let t = self.catalog.table(table);

        if t.kind() != TableKind::Junction {
            let warning = NormalizeWarning::TableKindConflict {
                table: t.name().to_string(),
                existing: t.kind(),
                requested: TableKind::Junction,
            };
            self.warn(&context.path, warning);
            return;
        }

        let width = t.columns().len();
        let parent_col = t.column_of_kind(ColumnKind::ParentRef);
        let index_col = t.column_of_kind(ColumnKind::Ordinal);
        let value_col = t.column_of_kind(ColumnKind::Value);

        for (idx, item) in items.iter().enumerate() {
            match item {
                Value::Array(_) => {
                    self.warn(&index_path(&context.path, idx), NormalizeWarning::NestedArray);
                }
                Value::Object(_) => {
                    let warning = NormalizeWarning::MixedArray {
                        expected: "scalar",
                        found: item.kind_name(),
                    };
                    self.warn(&index_path(&context.path, idx), warning);
                }
                scalar => {
                    let mut cells = vec![Cell::Empty; width];
                    if let (Some(col), Some(parent)) = (parent_col, context.parent) {
                        cells[col] = Cell::Key(parent);
                    }
                    if let Some(col) = index_col {
                        cells[col] = Cell::Ordinal(idx);
                    }
                    if let Some(col) = value_col {
                        cells[col] = scalar_cell(scalar);
                    }
                    self.catalog.append_row(table, cells);
                }
            }
        }
    }

    /// Columns for a table whose first row is `fields`.
    fn propose_columns(&self, fields: &[(String, Value)], context: &Context) -> Vec<Column> {
        let mut columns = Vec::with_capacity(fields.len() + 2);
        if context.seq.is_some() {
            if context.parent.is_some() {
                columns.push(Column::parent_ref());
            }
            columns.push(Column::ordinal("seq"));
        }
        for (key, value) in fields {
            match value {
                Value::Array(_) => {}
                Value::Object(_) => columns.push(Column::foreign_key(key.as_str(), &self.config.fk_suffix)),
                _ => columns.push(Column::value(key.as_str())),
            }
        }
        columns
    }

    fn warn(&mut self, path: &str, warning: NormalizeWarning) {
        let diagnostic = Diagnostic {
            path: path.to_string(),
            warning,
        };
        tracing::warn!("skipped {diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

fn scalar_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(n) => Cell::Number(n.clone()),
        other => other
            .stringify()
            .map(|s| Cell::Text(s.into_owned()))
            .unwrap_or_default(),
    }
}

fn expected_kind(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::ForeignKey => "object",
        _ => "scalar",
    }
}

/// JSON pointer of field `key` below `parent`.
fn child_path(parent: &str, key: &str) -> String {
    format!("{parent}/{}", key.replace('~', "~0").replace('/', "~1"))
}

fn index_path(parent: &str, idx: usize) -> String {
    format!("{parent}/{idx}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::catalog::Table;
    use serde_json::json;
    use std::collections::HashSet;

    fn normalize(input: serde_json::Value) -> Normalized {
        normalize_with(input, MeltConfig::default())
    }

    fn normalize_with(input: serde_json::Value, config: MeltConfig) -> Normalized {
        let value = Value::from(input);
        let mut normalizer = Normalizer::new(config);
        normalizer.flatten_document(&value);
        normalizer.finish()
    }

    fn table<'a>(result: &'a Normalized, name: &str) -> &'a Table {
        result
            .catalog
            .table_by_name(name)
            .unwrap_or_else(|| panic!("no table named {name}"))
    }

    fn header(table: &Table) -> Vec<&str> {
        table.columns().iter().map(|c| c.name.as_str()).collect()
    }

    fn ids(table: &Table) -> Vec<u64> {
        table.rows().iter().map(|r| r.id.get()).collect()
    }

    fn key(id: u64) -> Cell {
        Cell::Key(SurrogateId::new(std::num::NonZeroU64::new(id).unwrap()))
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn number(s: &str) -> Cell {
        Cell::Number(s.to_string())
    }

    /// Every key cell points at a row that exists somewhere.
    fn assert_keys_resolve(catalog: &Catalog) {
        let all_ids: HashSet<u64> = catalog
            .tables()
            .iter()
            .flat_map(|t| t.rows().iter().map(|r| r.id.get()))
            .collect();
        for t in catalog.tables() {
            for row in t.rows() {
                assert_eq!(row.cells.len(), t.columns().len());
                for cell in &row.cells {
                    if let Cell::Key(id) = cell {
                        assert!(all_ids.contains(&id.get()), "dangling key {id} in {}", t.name());
                    }
                }
            }
        }
    }

    #[test]
    fn test_flat_object() {
        let result = normalize(json!({"name": "Ann", "age": 30}));

        assert_eq!(result.catalog.len(), 1);
        let main = table(&result, "main");
        assert_eq!(header(main), vec!["name", "age"]);
        assert_eq!(ids(main), vec![1]);
        assert_eq!(main.rows()[0].cells, vec![text("Ann"), number("30")]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_scalar_array_becomes_junction_table() {
        let result = normalize(json!({"tags": ["x", "y"]}));

        let main = table(&result, "main");
        assert!(header(main).is_empty());
        assert_eq!(ids(main), vec![1]);

        let tags = table(&result, "main_tags");
        assert_eq!(tags.kind(), TableKind::Junction);
        assert_eq!(header(tags), vec!["parent_id", "index", "value"]);
        assert_eq!(tags.rows()[0].cells, vec![key(1), Cell::Ordinal(0), text("x")]);
        assert_eq!(tags.rows()[1].cells, vec![key(1), Cell::Ordinal(1), text("y")]);
    }

    #[test]
    fn test_object_array_becomes_child_table() {
        let result = normalize(json!({"items": [{"k": 1}, {"k": 2}]}));

        assert_eq!(ids(table(&result, "main")), vec![1]);
        let items = table(&result, "items");
        assert_eq!(items.kind(), TableKind::Child);
        assert_eq!(header(items), vec!["parent_id", "seq", "k"]);
        assert_eq!(ids(items), vec![2, 3]);
        assert_eq!(items.rows()[0].cells, vec![key(1), Cell::Ordinal(0), number("1")]);
        assert_eq!(items.rows()[1].cells, vec![key(1), Cell::Ordinal(1), number("2")]);
    }

    #[test]
    fn test_empty_object() {
        let result = normalize(json!({}));
        let main = table(&result, "main");
        assert!(header(main).is_empty());
        assert_eq!(ids(main), vec![1]);
        assert!(main.rows()[0].cells.is_empty());
    }

    #[test]
    fn test_mixed_scalar_array_skips_objects() {
        let result = normalize(json!({"vals": [1, {"a": 2}, 3]}));

        let vals = table(&result, "main_vals");
        assert_eq!(vals.rows().len(), 2);
        assert_eq!(vals.rows()[0].cells[1], Cell::Ordinal(0));
        assert_eq!(vals.rows()[1].cells[1], Cell::Ordinal(2));
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic {
                path: String::from("/vals/1"),
                warning: NormalizeWarning::MixedArray {
                    expected: "scalar",
                    found: "object"
                },
            }]
        );
        assert!(result.catalog.table_by_name("vals").is_none());
    }

    #[test]
    fn test_mixed_object_array_skips_scalars() {
        let result = normalize(json!({"items": [{"k": 1}, 5, {"k": 2}]}));

        let items = table(&result, "items");
        let seqs: Vec<_> = items.rows().iter().map(|r| r.cells[1].clone()).collect();
        assert_eq!(seqs, vec![Cell::Ordinal(0), Cell::Ordinal(2)]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].path, "/items/1");
    }

    #[test]
    fn test_nested_objects_get_foreign_keys() {
        let result = normalize(json!({
            "title": "doc",
            "owner": {"name": "x", "address": {"city": "y"}}
        }));

        let main = table(&result, "main");
        assert_eq!(header(main), vec!["title", "owner_id"]);
        let owner = table(&result, "main_owner");
        assert_eq!(header(owner), vec!["name", "address_id"]);
        let address = table(&result, "main_owner_address");
        assert_eq!(header(address), vec!["city"]);

        assert_eq!(main.rows()[0].cells, vec![text("doc"), key(2)]);
        assert_eq!(owner.rows()[0].cells, vec![text("x"), key(3)]);
        assert_eq!(ids(address), vec![3]);
        assert_keys_resolve(&result.catalog);
    }

    #[test]
    fn test_scalar_rendering() {
        let result = normalize(json!({"t": true, "f": false, "n": null, "s": "", "x": 1.5}));
        let main = table(&result, "main");
        assert_eq!(
            main.rows()[0].cells,
            vec![text("true"), text("false"), Cell::Empty, text(""), number("1.5")]
        );
    }

    #[test]
    fn test_first_seen_schema_wins() {
        let result = normalize(json!([
            {"a": 1, "b": 2},
            {"b": 3, "c": 4}
        ]));

        let main = table(&result, "main");
        assert_eq!(header(main), vec!["seq", "a", "b"]);
        assert_eq!(main.rows()[1].cells, vec![Cell::Ordinal(1), Cell::Empty, number("3")]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_reject_policy_skips_mismatched_objects() {
        let config = MeltConfig {
            schema_policy: SchemaPolicy::Reject,
            ..MeltConfig::default()
        };
        let result = normalize_with(
            json!([
                {"a": 1, "b": 2},
                {"b": 3, "c": 4},
                {"b": 5, "a": 6, "tags": ["ignored", "in", "comparison"]}
            ]),
            config,
        );

        let main = table(&result, "main");
        assert_eq!(main.rows().len(), 2);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic {
                path: String::from("/1"),
                warning: NormalizeWarning::SchemaMismatch {
                    table: String::from("main")
                },
            }]
        );
    }

    #[test]
    fn test_null_where_object_expected_is_empty() {
        let result = normalize(json!([{"o": {"x": 1}}, {"o": null}]));

        let main = table(&result, "main");
        assert_eq!(header(main), vec!["seq", "o_id"]);
        assert_eq!(main.rows()[1].cells, vec![Cell::Ordinal(1), Cell::Empty]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_object_where_scalar_expected_is_skipped() {
        let result = normalize(json!([{"o": 1}, {"o": {"x": 1}}]));

        assert!(result.catalog.table_by_name("main_o").is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].path, "/1/o");
        assert!(matches!(
            result.diagnostics[0].warning,
            NormalizeWarning::ColumnConflict { expected: "scalar", found: "object", .. }
        ));
        // the row itself is still written
        assert_eq!(table(&result, "main").rows().len(), 2);
    }

    #[test]
    fn test_table_kind_conflict() {
        let result = normalize(json!([
            {"x": ["a"]},
            {"x": [{"k": 1}]}
        ]));

        let x = table(&result, "main_x");
        assert_eq!(x.kind(), TableKind::Junction);
        assert_eq!(x.rows().len(), 1);
        assert!(matches!(
            result.diagnostics[0].warning,
            NormalizeWarning::TableKindConflict { requested: TableKind::Child, .. }
        ));
    }

    #[test]
    fn test_empty_array_creates_junction_table() {
        let result = normalize(json!({"tags": []}));
        let tags = table(&result, "main_tags");
        assert_eq!(tags.kind(), TableKind::Junction);
        assert!(tags.rows().is_empty());
    }

    #[test]
    fn test_object_array_after_empty_array() {
        let result = normalize(json!([
            {"items": []},
            {"items": [{"k": 1}, {"k": 2}]},
            {"items": []}
        ]));

        let items = table(&result, "items");
        assert_eq!(items.kind(), TableKind::Child);
        assert_eq!(header(items), vec!["parent_id", "seq", "k"]);
        assert_eq!(items.rows().len(), 2);
        assert_eq!(items.rows()[0].cells, vec![key(2), Cell::Ordinal(0), number("1")]);
        assert!(result.catalog.table_by_name("main_items").is_none());
        assert_eq!(result.catalog.ids_issued(), 5);
        assert!(result.diagnostics.is_empty());
        assert_keys_resolve(&result.catalog);
    }

    #[test]
    fn test_scalar_array_after_empty_array() {
        let result = normalize(json!([{"tags": []}, {"tags": ["x"]}]));
        let tags = table(&result, "main_tags");
        assert_eq!(tags.kind(), TableKind::Junction);
        assert_eq!(tags.rows()[0].cells, vec![key(2), Cell::Ordinal(0), text("x")]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_array_after_objects_is_not_a_conflict() {
        let result = normalize(json!([
            {"items": [{"k": 1}]},
            {"items": []}
        ]));
        assert_eq!(table(&result, "items").rows().len(), 1);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_nested_arrays_are_skipped() {
        let result = normalize(json!({"grid": [[1, 2], [3]]}));
        assert!(table(&result, "main_grid").rows().is_empty());
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.warning == NormalizeWarning::NestedArray));
    }

    #[test]
    fn test_scalar_document() {
        let result = normalize(json!("hello"));
        assert!(result.catalog.is_empty());
        assert_eq!(
            result.diagnostics[0].warning,
            NormalizeWarning::ScalarDocument { found: "string" }
        );
    }

    #[test]
    fn test_root_scalar_array_has_no_parent_column() {
        let result = normalize(json!([1, 2]));
        let main = table(&result, "main");
        assert_eq!(header(main), vec!["index", "value"]);
        assert_eq!(main.rows()[1].cells, vec![Cell::Ordinal(1), number("2")]);
    }

    #[test]
    fn test_objects_inside_array_elements() {
        let result = normalize(json!({
            "orders": [
                {"sku": "a", "ship": {"city": "x"}, "notes": ["n1"]},
                {"sku": "b", "ship": {"city": "y"}, "notes": []}
            ]
        }));

        let orders = table(&result, "orders");
        assert_eq!(header(orders), vec!["parent_id", "seq", "sku", "ship_id"]);
        let ship = table(&result, "orders_ship");
        let notes = table(&result, "orders_notes");
        assert_eq!(ship.rows().len(), 2);
        assert_eq!(notes.rows().len(), 1);

        // main=1, order a=2, ship=3, note=4, order b=5, ship=6
        assert_eq!(ids(orders), vec![2, 5]);
        assert_eq!(ids(ship), vec![3, 6]);
        assert_eq!(notes.rows()[0].cells[0], key(2));
        assert_keys_resolve(&result.catalog);
    }

    #[test]
    fn test_documents_share_tables() {
        let mut normalizer = Normalizer::new(MeltConfig::default());
        normalizer.flatten_document(&Value::from(json!({"a": 1, "t": ["x"]})));
        normalizer.flatten_document(&Value::from(json!({"a": 2, "t": ["y"]})));
        let result = normalizer.finish();

        assert_eq!(result.catalog.len(), 2);
        assert_eq!(ids(table(&result, "main")), vec![1, 3]);
        assert_eq!(table(&result, "main_t").rows()[1].cells[0], key(3));
    }

    #[test]
    fn test_flatten_with_explicit_context() {
        let mut normalizer = Normalizer::new(MeltConfig::default());
        normalizer.flatten_document(&Value::from(json!({"a": 1})));
        let root = normalizer.catalog().lookup(&TableIdentity::Root).unwrap();
        let parent = normalizer.catalog().table(root).rows()[0].id;

        normalizer.flatten(
            &Value::from(json!(["p", "q"])),
            Context::array_field(root, "extra", parent),
        );
        let result = normalizer.finish();

        let extra = table(&result, "main_extra");
        assert_eq!(extra.rows()[1].cells, vec![Cell::Key(parent), Cell::Ordinal(1), text("q")]);
    }

    #[test]
    fn test_deep_nesting() {
        const DEPTH: usize = 1_000;

        let mut value = Value::Object(vec![(String::from("leaf"), Value::Bool(true))]);
        for _ in 0..DEPTH {
            value = Value::Object(vec![(String::from("next"), value)]);
        }

        let mut normalizer = Normalizer::new(MeltConfig::default());
        normalizer.flatten_document(&value);
        let result = normalizer.finish();

        assert_eq!(result.catalog.len(), DEPTH + 1);
        assert_eq!(result.catalog.ids_issued(), DEPTH as u64 + 1);
        assert_keys_resolve(&result.catalog);
    }

    #[test]
    fn test_ids_unique_across_tables() {
        let result = normalize(json!({
            "a": [{"b": [1, 2, {"skip": true}]}, {"b": [3]}],
            "c": {"d": ["e"]}
        }));

        let mut seen = HashSet::new();
        let mut last = 0;
        for t in result.catalog.tables() {
            for row in t.rows() {
                assert!(seen.insert(row.id.get()));
                last = last.max(row.id.get());
            }
        }
        assert_eq!(last, result.catalog.ids_issued());
        assert_keys_resolve(&result.catalog);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            path: String::from("/a~1b/0"),
            warning: NormalizeWarning::NestedArray,
        };
        assert_eq!(d.to_string(), "at /a~1b/0: nested arrays are not supported");
    }
}
