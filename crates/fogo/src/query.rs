// Query assembly: an ordered clause container with eager validation.

use crate::node::Node;
use crate::{native, sql, Error, Result};

/// An ordered, validated sequence of clause nodes targeting one table.
///
/// Clauses must respect a fixed partial order: projection expressions and
/// selection markers come first, then `Where`, `By`, `Having`, `Order`,
/// `Limit`, `Offset`. Violations surface at [`append`](Query::append) time,
/// not at compile time.
///
/// `append` deep-copies its argument, so the caller keeps full ownership of
/// the node it passed in and the query keeps exclusive ownership of its
/// tree. Confine a `Query` to one owner while assembling it; once
/// assembled it is read-only and freely shareable — both compilers are
/// pure functions of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    nodes: Vec<Node>,
}

/// Clause stratum in the partial order. Scalar expressions (projection
/// items) and selection markers sit at rank 0.
fn clause_rank(node: &Node) -> u8 {
    match node {
        Node::Where(_) => 1,
        Node::By(_) | Node::Margin(_) => 2,
        Node::Having(_) => 3,
        Node::Order(_) => 4,
        Node::Limit(_) => 5,
        Node::Offset(_) => 6,
        // Top expands starting at the By stratum.
        Node::Top { .. } => 2,
        _ => 0,
    }
}

impl Query {
    /// Create an empty query over the named table.
    pub fn new(table: impl Into<String>) -> Query {
        Query {
            table: table.into(),
            nodes: Vec::new(),
        }
    }

    /// Target table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The appended nodes, in declaration order (`Top` never appears here;
    /// it is normalized on append).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Deep-copy `node` and insert it as the next clause.
    ///
    /// Fails with [`Error::ClauseOrder`] if the resulting sequence would
    /// violate the clause partial order, and with [`Error::InvalidArity`]
    /// if a directly-constructed `Limit`/`Offset`/`Top` carries a negative
    /// count. `Top` is normalized into `By` + `Order` + `Limit` here, so
    /// downstream components never see it.
    pub fn append(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Top { by, key, count } => {
                if *count < 0 {
                    return Err(Error::InvalidArity(format!(
                        "top count must be non-negative, got {count}"
                    )));
                }
                // Validate the whole triple before mutating, so a rejected
                // Top leaves the query untouched.
                if clause_rank(node) < self.max_rank() {
                    return Err(self.order_error(node));
                }
                self.push(Node::By(by.clone()))?;
                self.push(Node::Order(key.clone()))?;
                self.push(Node::Limit(*count))?;
                Ok(())
            }
            other => self.push(other.clone()),
        }
    }

    fn max_rank(&self) -> u8 {
        self.nodes.iter().map(clause_rank).max().unwrap_or(0)
    }

    fn order_error(&self, node: &Node) -> Error {
        Error::ClauseOrder(format!(
            "{} clause cannot follow the clauses already present",
            node.kind_name()
        ))
    }

    fn push(&mut self, node: Node) -> Result<()> {
        if let Node::Limit(n) | Node::Offset(n) = &node {
            if *n < 0 {
                return Err(Error::InvalidArity(format!(
                    "{} count must be non-negative, got {n}",
                    node.kind_name()
                )));
            }
        }

        if clause_rank(&node) < self.max_rank() {
            return Err(self.order_error(&node));
        }

        // Single-occurrence clauses.
        let duplicate = match &node {
            Node::Distinct | Node::All => self
                .nodes
                .iter()
                .any(|n| matches!(n, Node::Distinct | Node::All)),
            Node::Limit(_) => self.nodes.iter().any(|n| matches!(n, Node::Limit(_))),
            Node::Offset(_) => self.nodes.iter().any(|n| matches!(n, Node::Offset(_))),
            _ => false,
        };
        if duplicate {
            return Err(Error::ClauseOrder(format!(
                "duplicate {} clause",
                node.kind_name()
            )));
        }

        self.nodes.push(node);
        Ok(())
    }

    // ---- Compilation ------------------------------------------------------

    /// Compile to the compact native syntax. Pure and deterministic:
    /// identical trees always produce byte-identical text.
    pub fn to_native(&self) -> Result<String> {
        native::render(self)
    }

    /// Compile to SQL. Pure and deterministic; clauses are re-ordered onto
    /// the standard SELECT skeleton regardless of declaration order.
    pub fn to_sql(&self) -> Result<String> {
        sql::render(self)
    }
}
