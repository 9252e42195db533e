// Cursor over one query text: parse on prepare, execute on begin, then
// walk the materialized rows.

use std::collections::HashMap;
use std::sync::Arc;

use sqlparser::ast::{self, Statement};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use fogo::{ColumnType, Cursor, StoreError, Table};

use crate::select;

enum State {
    Created,
    Prepared(Box<ast::Query>),
    Active { result: Table, row: usize },
}

/// Cursor produced by [`crate::Store`]. Owns a snapshot of the table
/// registry taken when the cursor was opened.
pub struct SqlCursor {
    tables: HashMap<String, Arc<Table>>,
    sql: String,
    state: State,
}

impl SqlCursor {
    pub(crate) fn new(tables: HashMap<String, Arc<Table>>, sql: String) -> SqlCursor {
        SqlCursor {
            tables,
            sql,
            state: State::Created,
        }
    }

    fn result(&self) -> Result<(&Table, usize), StoreError> {
        match &self.state {
            State::Active { result, row } => Ok((result, *row)),
            _ => Err(StoreError::new("cursor not begun")),
        }
    }

    fn cell_error(&self, col: usize, row: usize, want: &str) -> StoreError {
        match self.state {
            State::Active { ref result, .. } if col < result.ncols() => StoreError::new(format!(
                "column '{}' is not {want} (row {row})",
                result.col_name_str(col)
            )),
            _ => StoreError::new(format!("column index {col} out of range")),
        }
    }
}

impl Cursor for SqlCursor {
    fn prepare(&mut self) -> Result<(), StoreError> {
        if !matches!(self.state, State::Created) {
            return Err(StoreError::new("cursor already prepared"));
        }
        let mut statements = Parser::parse_sql(&DuckDbDialect {}, &self.sql)
            .map_err(|e| StoreError::new(format!("parse error: {e}")))?;
        if statements.len() != 1 {
            return Err(StoreError::new(format!(
                "expected one statement, got {}",
                statements.len()
            )));
        }
        match statements.pop() {
            Some(Statement::Query(query)) => {
                self.state = State::Prepared(query);
                Ok(())
            }
            other => Err(StoreError::new(format!(
                "only queries are supported, got: {}",
                other.map(|s| s.to_string()).unwrap_or_default()
            ))),
        }
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        let query = match std::mem::replace(&mut self.state, State::Created) {
            State::Prepared(query) => query,
            state => {
                self.state = state;
                return Err(StoreError::new("cursor not prepared"));
            }
        };
        let result = select::run(&query, &self.tables)?;
        self.state = State::Active { result, row: 0 };
        Ok(())
    }

    fn more(&mut self) -> Result<bool, StoreError> {
        let (result, row) = self.result()?;
        Ok(row < result.nrows())
    }

    fn next(&mut self) -> Result<(), StoreError> {
        match &mut self.state {
            State::Active { result, row } => {
                if *row >= result.nrows() {
                    return Err(StoreError::new("cursor already exhausted"));
                }
                *row += 1;
                Ok(())
            }
            _ => Err(StoreError::new("cursor not begun")),
        }
    }

    fn get_i64(&self, col: usize) -> Result<i64, StoreError> {
        let (result, row) = self.result()?;
        result
            .get_i64(col, row)
            .ok_or_else(|| self.cell_error(col, row, "an integer"))
    }

    fn get_f64(&self, col: usize) -> Result<f64, StoreError> {
        let (result, row) = self.result()?;
        result
            .get_f64(col, row)
            .ok_or_else(|| self.cell_error(col, row, "a real"))
    }

    fn get_str(&self, col: usize) -> Result<String, StoreError> {
        let (result, row) = self.result()?;
        result
            .get_str(col, row)
            .map(str::to_string)
            .ok_or_else(|| self.cell_error(col, row, "text"))
    }

    fn column_count(&self) -> usize {
        match &self.state {
            State::Active { result, .. } => result.ncols(),
            _ => 0,
        }
    }

    fn column_name(&self, col: usize) -> &str {
        match &self.state {
            State::Active { result, .. } => result.col_name_str(col),
            _ => "",
        }
    }

    fn column_type(&self, col: usize) -> ColumnType {
        match &self.state {
            State::Active { result, .. } => result.col_type(col).unwrap_or(ColumnType::Text),
            _ => ColumnType::Text,
        }
    }
}
