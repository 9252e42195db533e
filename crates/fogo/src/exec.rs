// Execution bridge: compile a Query to SQL, run it on a table store, and
// materialize the streamed rows into an owned Table.

use crate::query::Query;
use crate::table::{ColumnData, ColumnType, Table};
use crate::{Error, Result};

/// Failure reported by a table store: connectivity, parse or planning
/// failure on the generated text, cursor misuse, or a type mismatch on
/// read. Carries a plain message; the bridge wraps it together with the
/// generated SQL in [`Error::Execution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> StoreError {
        StoreError(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StoreError {}

/// A cursor over the result of one query text.
///
/// Protocol: `prepare` once, `begin` once, then loop `more` / `get_*` /
/// `next` until `more` returns false. Column metadata is valid once `begin`
/// has returned. Callers wanting streaming drive this protocol directly;
/// [`execute`] drives it to completion and materializes everything.
pub trait Cursor {
    fn prepare(&mut self) -> std::result::Result<(), StoreError>;
    fn begin(&mut self) -> std::result::Result<(), StoreError>;
    /// Whether a current row is available.
    fn more(&mut self) -> std::result::Result<bool, StoreError>;
    /// Advance to the following row.
    fn next(&mut self) -> std::result::Result<(), StoreError>;
    fn get_i64(&self, col: usize) -> std::result::Result<i64, StoreError>;
    fn get_f64(&self, col: usize) -> std::result::Result<f64, StoreError>;
    fn get_str(&self, col: usize) -> std::result::Result<String, StoreError>;
    fn column_count(&self) -> usize;
    fn column_name(&self, col: usize) -> &str;
    fn column_type(&self, col: usize) -> ColumnType;
}

/// The external engine that executes compiled query text and streams typed
/// rows. This is the only I/O boundary of the crate; connection pooling,
/// cancellation, and concurrent-access safety live behind it.
pub trait TableStore {
    type Cursor: Cursor;

    /// Open a cursor for one query text.
    fn cursor(&self, sql: &str) -> std::result::Result<Self::Cursor, StoreError>;
}

/// Compile `query` to SQL, execute it on `store`, and materialize the full
/// result. Blocking; there is no partial result. Any store failure surfaces
/// as [`Error::Execution`] carrying the underlying cause and the generated
/// text that was attempted. No retry happens at this layer.
pub fn execute<S: TableStore>(query: &Query, store: &S) -> Result<Table> {
    let sql = query.to_sql()?;
    match fetch_all(store, &sql) {
        Ok(table) => Ok(table),
        Err(cause) => Err(Error::Execution { cause, sql }),
    }
}

fn fetch_all<S: TableStore>(store: &S, sql: &str) -> std::result::Result<Table, StoreError> {
    let mut cursor = store.cursor(sql)?;
    cursor.prepare()?;
    cursor.begin()?;

    let ncols = cursor.column_count();
    let mut columns: Vec<(String, ColumnData)> = (0..ncols)
        .map(|i| {
            (
                cursor.column_name(i).to_string(),
                ColumnData::empty(cursor.column_type(i)),
            )
        })
        .collect();

    while cursor.more()? {
        for (i, (_, data)) in columns.iter_mut().enumerate() {
            match data {
                ColumnData::Int(v) => v.push(cursor.get_i64(i)?),
                ColumnData::Real(v) => v.push(cursor.get_f64(i)?),
                ColumnData::Text(v) => v.push(cursor.get_str(i)?),
            }
        }
        cursor.next()?;
    }

    Ok(Table::from_columns(columns))
}
