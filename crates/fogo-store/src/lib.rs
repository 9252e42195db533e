// fogo-store: reference in-memory table store for the fogo execution bridge.
//
// Executes the SELECT subset the fogo SQL generator emits (single table,
// projection, DISTINCT, WHERE, GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET)
// against registered columnar tables, parsed with sqlparser.

pub mod csv;

mod cursor;
mod eval;
mod select;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fogo::{StoreError, Table, TableStore};

pub use cursor::SqlCursor;

/// A registry of named in-memory tables. Lookup is case-insensitive.
#[derive(Default)]
pub struct Store {
    tables: HashMap<String, Arc<Table>>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// Register (or replace) a table under `name`.
    pub fn register(&mut self, name: &str, table: Table) {
        self.tables.insert(name.to_lowercase(), Arc::new(table));
    }

    /// Read a CSV file and register it under `name`. Column types are
    /// inferred: Int if every cell parses as an integer, Real if every cell
    /// parses as a number, Text otherwise.
    pub fn load_csv(&mut self, name: &str, path: &Path) -> Result<(), StoreError> {
        let table = csv::read_csv(path)?;
        self.register(name, table);
        Ok(())
    }

    /// Registered table names.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Get (nrows, ncols) for a registered table, or None if not found.
    pub fn table_info(&self, name: &str) -> Option<(usize, usize)> {
        self.tables
            .get(&name.to_lowercase())
            .map(|t| (t.nrows(), t.ncols()))
    }
}

impl TableStore for Store {
    type Cursor = SqlCursor;

    fn cursor(&self, sql: &str) -> Result<SqlCursor, StoreError> {
        // The cursor owns a snapshot of the registry (Arc clones), so it
        // stays valid however long the caller drives the protocol.
        Ok(SqlCursor::new(self.tables.clone(), sql.to_string()))
    }
}
