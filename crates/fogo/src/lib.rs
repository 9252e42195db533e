//! fogo: a query expression algebra with two compile targets.
//!
//! Queries are built programmatically as trees of [`Node`]s, appended to a
//! [`Query`] that validates clause ordering eagerly, compiled to either a
//! compact native syntax ([`Query::to_native`]) or SQL ([`Query::to_sql`]),
//! and executed against a [`TableStore`] to produce an owned, fully
//! materialized [`Table`].
//!
//! Ownership discipline: every insertion — a child into a parent, a node
//! into a query — deep-copies the inserted subtree. No two parents ever
//! alias a child, and a caller's handle is never retained after `append`
//! returns.

pub mod exec;
pub mod node;
pub mod query;
pub mod table;

mod native;
mod sql;

pub use exec::{execute, Cursor, StoreError, TableStore};
pub use node::{BinaryOp, Node, UnaryOp};
pub use query::Query;
pub use table::{Column, ColumnData, ColumnType, Table};

/// Errors produced by construction, assembly, compilation, and execution.
#[derive(Debug)]
pub enum Error {
    /// A node was built with the wrong child count or an out-of-range count.
    InvalidArity(String),
    /// A Query append would violate the clause partial order.
    ClauseOrder(String),
    /// A code generator met a variant with no meaning in that position.
    UnsupportedNode(String),
    /// The table store failed; carries the generated text that was attempted.
    Execution { cause: StoreError, sql: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArity(msg) => write!(f, "invalid arity: {msg}"),
            Error::ClauseOrder(msg) => write!(f, "clause order violation: {msg}"),
            Error::UnsupportedNode(msg) => write!(f, "unsupported node: {msg}"),
            Error::Execution { cause, sql } => {
                write!(f, "execution failed: {cause} (query: {sql})")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
