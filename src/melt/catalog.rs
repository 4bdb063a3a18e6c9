//! Table catalog: every table discovered during one run, in creation order.
//!
//! Tables are only ever added, and a table's columns are fixed when it is
//! created. The exception is a provisional table, made for an empty array:
//! until it receives a row, the first non-empty array under the same field may
//! replace its kind and columns. Rows are appended with a freshly allocated
//! id; the one in-place update allowed is filling a foreign-key cell once the
//! referenced child row exists.

use crate::melt::ids::IdAllocator;
use crate::melt::naming::{unique_name, TableNamer};
use crate::melt::types::{
    Cell, Column, ColumnKind, MeltConfig, SurrogateId, TableId, TableIdentity, TableKind,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A stored row: its id plus one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: SurrogateId,
    pub cells: Vec<Cell>,
}

#[derive(Debug)]
pub struct Table {
    identity: TableIdentity,
    name: String,
    kind: TableKind,
    columns: Vec<Column>,
    rows: Vec<Row>,
    by_source: HashMap<String, usize>,
    provisional: bool,
    referenced: bool,
}

impl Table {
    pub fn identity(&self) -> &TableIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Columns after the implicit `id`.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Created for an empty array and still without rows.
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Whether another table is keyed to this one's field values, so its
    /// row ids can appear in other tables.
    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    /// Column filled by the object key `key`.
    pub fn column_for(&self, key: &str) -> Option<(usize, ColumnKind)> {
        self.by_source
            .get(key)
            .map(|&idx| (idx, self.columns[idx].kind))
    }

    pub fn column_of_kind(&self, kind: ColumnKind) -> Option<usize> {
        self.columns.iter().position(|c| c.kind == kind)
    }

    /// Object keys that make up this table's schema, in column order.
    pub fn source_keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| c.source.as_deref())
    }

    pub fn row(&self, id: SurrogateId) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| &self.rows[idx])
    }
}

/// Short description of a table, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: usize,
}

#[derive(Debug)]
pub struct Catalog {
    tables: Vec<Table>,
    by_identity: HashMap<TableIdentity, TableId>,
    namer: TableNamer,
    ids: IdAllocator,
}

impl Catalog {
    pub fn new(config: &MeltConfig) -> Self {
        Catalog {
            tables: Vec::new(),
            by_identity: HashMap::new(),
            namer: TableNamer::new(config),
            ids: IdAllocator::new(),
        }
    }

    pub fn lookup(&self, identity: &TableIdentity) -> Option<TableId> {
        self.by_identity.get(identity).copied()
    }

    /// Return the table registered under `identity`, creating it with
    /// `proposed` as its columns if there is none. An existing table is
    /// returned unchanged: the first schema seen for an identity wins.
    ///
    /// A provisional table asked for with a different kind is redefined
    /// with `kind` and `proposed`, and renamed to match its new kind.
    pub fn get_or_create(
        &mut self,
        identity: TableIdentity,
        kind: TableKind,
        proposed: Vec<Column>,
    ) -> TableId {
        if let Some(id) = self.lookup(&identity) {
            let table = &self.tables[id.0];
            if table.provisional && table.kind != kind {
                self.redefine(id, kind, proposed);
            }
            return id;
        }

        let name = self.assign_name(&identity, kind);
        let (columns, by_source) = build_columns(proposed);

        tracing::debug!(
            table = %name,
            kind = ?kind,
            columns = columns.len(),
            "created table"
        );

        if let TableIdentity::Field { owner, .. } = &identity {
            self.tables[owner.0].referenced = true;
        }

        let id = TableId(self.tables.len());
        self.tables.push(Table {
            identity: identity.clone(),
            name,
            kind,
            columns,
            rows: Vec::new(),
            by_source,
            provisional: false,
            referenced: false,
        });
        self.by_identity.insert(identity, id);
        id
    }

    /// Like [`Catalog::get_or_create`], but a newly created table stays open
    /// to redefinition until its first row is appended.
    pub fn get_or_create_provisional(
        &mut self,
        identity: TableIdentity,
        kind: TableKind,
        proposed: Vec<Column>,
    ) -> TableId {
        let existed = self.lookup(&identity).is_some();
        let id = self.get_or_create(identity, kind, proposed);
        if !existed {
            self.tables[id.0].provisional = true;
        }
        id
    }

    fn assign_name(&mut self, identity: &TableIdentity, kind: TableKind) -> String {
        let owner = match identity {
            TableIdentity::Root => None,
            TableIdentity::Field { owner, field } => {
                Some((self.tables[owner.0].name.as_str(), field.as_str()))
            }
        };
        self.namer.assign(owner, kind)
    }

    fn redefine(&mut self, id: TableId, kind: TableKind, proposed: Vec<Column>) {
        let old_name = std::mem::take(&mut self.tables[id.0].name);
        self.namer.release(&old_name);
        let identity = self.tables[id.0].identity.clone();
        let name = self.assign_name(&identity, kind);
        let (columns, by_source) = build_columns(proposed);

        tracing::debug!(
            table = %name,
            was = %old_name,
            kind = ?kind,
            columns = columns.len(),
            "redefined provisional table"
        );

        let table = &mut self.tables[id.0];
        table.name = name;
        table.kind = kind;
        table.columns = columns;
        table.by_source = by_source;
        table.provisional = false;
    }

    /// Store `cells` as a new row of `table` under a freshly allocated id.
    ///
    /// `cells` should hold one entry per column; a short list is padded with
    /// empty cells and a long one truncated.
    pub fn append_row(&mut self, table: TableId, mut cells: Vec<Cell>) -> SurrogateId {
        let id = self.ids.next_id();
        let table = &mut self.tables[table.0];
        cells.resize(table.columns.len(), Cell::Empty);
        table.provisional = false;
        table.rows.push(Row { id, cells });
        id
    }

    /// Overwrite one cell of an existing row. Returns false if the row or
    /// column does not exist.
    pub fn set_cell(&mut self, table: TableId, row: SurrogateId, column: usize, cell: Cell) -> bool {
        let table = &mut self.tables[table.0];
        // rows are appended with increasing ids, so they stay sorted
        match table.rows.binary_search_by_key(&row, |r| r.id) {
            Ok(idx) if column < table.columns.len() => {
                table.rows[idx].cells[column] = cell;
                true
            }
            _ => false,
        }
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    /// All tables in creation order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Largest id handed out so far.
    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }

    pub fn summary(&self) -> Vec<TableSummary> {
        self.tables
            .iter()
            .map(|t| TableSummary {
                name: t.name.clone(),
                kind: t.kind,
                columns: std::iter::once(String::from("id"))
                    .chain(t.columns.iter().map(|c| c.name.clone()))
                    .collect(),
                rows: t.rows.len(),
            })
            .collect()
    }
}

/// Final column list plus the source-key index. Repeated source keys are
/// dropped, and names clashing with `id` or each other get a counter suffix.
fn build_columns(proposed: Vec<Column>) -> (Vec<Column>, HashMap<String, usize>) {
    let mut seen = HashSet::from([String::from("id")]);
    let mut by_source = HashMap::new();
    let mut columns = Vec::with_capacity(proposed.len());
    for mut column in proposed {
        if let Some(source) = &column.source {
            if by_source.contains_key(source) {
                continue;
            }
            by_source.insert(source.clone(), columns.len());
        }
        column.name = unique_name(&column.name, "_", &seen);
        seen.insert(column.name.clone());
        columns.push(column);
    }
    (columns, by_source)
}
