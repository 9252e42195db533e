// Node algebra: tagged-union tree elements for building queries programmatically.

use crate::{Error, Result};

/// Unary operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

/// Binary operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A single element of a query expression tree.
///
/// Every node is either a leaf or exclusively owns its children — a `Node`
/// is strictly a tree, never shared, never cyclic. Inserting a node into a
/// parent or appending it to a [`Query`](crate::Query) deep-copies the
/// subtree, so the caller's handle is never retained across an ownership
/// boundary and destroying a tree destroys every node in it exactly once.
///
/// The union is closed: every consumer (clone, both code generators, the
/// store evaluator) matches exhaustively, so adding a variant without
/// updating a generator fails to compile rather than silently emitting
/// wrong text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Boolean constant.
    Bool(bool),
    /// Integer constant.
    Int(i64),
    /// Floating-point constant.
    Real(f64),
    /// Text constant.
    Text(String),
    /// Reference to a column of the queried table, by name.
    Column(String),
    Unary { op: UnaryOp, operand: Box<Node> },
    Binary { op: BinaryOp, left: Box<Node>, right: Box<Node> },
    /// Arbitrary function invocation. Arity is the function's own contract;
    /// none is enforced here.
    Call { name: String, args: Vec<Node> },
    /// Aggregate function over a group.
    Aggregate { name: String, arg: Box<Node> },
    /// Names a computed value (`expr AS name`).
    Alias { value: Box<Node>, name: String },
    /// Selection-mode marker: drop duplicate result rows.
    Distinct,
    /// Selection-mode marker: keep all rows (the default, made explicit).
    All,
    /// Row filter; the predicate is expected to be boolean-valued.
    Where(Box<Node>),
    /// A grouping key.
    By(Box<Node>),
    /// Post-grouping filter.
    Having(Box<Node>),
    /// A sort key.
    Order(Box<Node>),
    /// Bounds the result to the first `n` rows.
    Limit(i64),
    /// Skips the first `n` rows.
    Offset(i64),
    /// Top-`count` rows per partition of `by`, ordered by `key`. Sugar:
    /// normalized into `By` + `Order` + `Limit` when appended to a Query.
    Top { by: Box<Node>, key: Box<Node>, count: i64 },
    /// Requests a subtotal row alongside grouped results.
    Margin(Box<Node>),
    /// Rewrites a value as a fraction of a grouped (or grand) total.
    Proportion { value: Box<Node>, by: Option<Box<Node>> },
}

impl Node {
    // ---- Leaf constructors ------------------------------------------------

    pub fn int(v: i64) -> Node {
        Node::Int(v)
    }

    pub fn real(v: f64) -> Node {
        Node::Real(v)
    }

    pub fn text(v: impl Into<String>) -> Node {
        Node::Text(v.into())
    }

    pub fn column(name: impl Into<String>) -> Node {
        Node::Column(name.into())
    }

    // ---- Operator constructors --------------------------------------------

    pub fn unary(op: UnaryOp, operand: Node) -> Node {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn neg(operand: Node) -> Node {
        Node::unary(UnaryOp::Neg, operand)
    }

    pub fn pos(operand: Node) -> Node {
        Node::unary(UnaryOp::Pos, operand)
    }

    pub fn not(operand: Node) -> Node {
        Node::unary(UnaryOp::Not, operand)
    }

    pub fn mul(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Mul, left, right)
    }

    pub fn div(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Div, left, right)
    }

    pub fn add(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Sub, left, right)
    }

    pub fn eq(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Lt, left, right)
    }

    pub fn le(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Le, left, right)
    }

    pub fn gt(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Ge, left, right)
    }

    pub fn and(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Node, right: Node) -> Node {
        Node::binary(BinaryOp::Or, left, right)
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Node {
        Node::Call {
            name: name.into(),
            args,
        }
    }

    pub fn aggregate(name: impl Into<String>, arg: Node) -> Node {
        Node::Aggregate {
            name: name.into(),
            arg: Box::new(arg),
        }
    }

    pub fn alias(value: Node, name: impl Into<String>) -> Node {
        Node::Alias {
            value: Box::new(value),
            name: name.into(),
        }
    }

    pub fn proportion(value: Node, by: Option<Node>) -> Node {
        Node::Proportion {
            value: Box::new(value),
            by: by.map(Box::new),
        }
    }

    // ---- Validated clause constructors ------------------------------------

    /// Bound the result to the first `count` rows. Negative counts are
    /// rejected at construction, before any append or compile is attempted.
    pub fn limit(count: i64) -> Result<Node> {
        if count < 0 {
            return Err(Error::InvalidArity(format!(
                "limit count must be non-negative, got {count}"
            )));
        }
        Ok(Node::Limit(count))
    }

    /// Skip the first `count` rows. Negative counts are rejected at
    /// construction.
    pub fn offset(count: i64) -> Result<Node> {
        if count < 0 {
            return Err(Error::InvalidArity(format!(
                "offset count must be non-negative, got {count}"
            )));
        }
        Ok(Node::Offset(count))
    }

    /// Top-`count` rows per partition of `by`, ordered by `key`.
    pub fn top(by: Node, key: Node, count: i64) -> Result<Node> {
        if count < 0 {
            return Err(Error::InvalidArity(format!(
                "top count must be non-negative, got {count}"
            )));
        }
        Ok(Node::Top {
            by: Box::new(by),
            key: Box::new(key),
            count,
        })
    }

    // ---- Introspection ----------------------------------------------------

    /// Whether this node is a top-level clause (as opposed to a scalar
    /// expression usable in projection or predicate position).
    pub fn is_clause(&self) -> bool {
        matches!(
            self,
            Node::Distinct
                | Node::All
                | Node::Where(_)
                | Node::By(_)
                | Node::Having(_)
                | Node::Order(_)
                | Node::Limit(_)
                | Node::Offset(_)
                | Node::Top { .. }
                | Node::Margin(_)
        )
    }

    /// Human-readable variant name, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Bool(_) => "bool constant",
            Node::Int(_) => "integer constant",
            Node::Real(_) => "real constant",
            Node::Text(_) => "text constant",
            Node::Column(_) => "column reference",
            Node::Unary { .. } => "unary operator",
            Node::Binary { .. } => "binary operator",
            Node::Call { .. } => "function call",
            Node::Aggregate { .. } => "aggregate",
            Node::Alias { .. } => "alias",
            Node::Distinct => "distinct",
            Node::All => "all",
            Node::Where(_) => "where",
            Node::By(_) => "by",
            Node::Having(_) => "having",
            Node::Order(_) => "order",
            Node::Limit(_) => "limit",
            Node::Offset(_) => "offset",
            Node::Top { .. } => "top",
            Node::Margin(_) => "margin",
            Node::Proportion { .. } => "proportion",
        }
    }
}
