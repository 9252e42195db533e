// Native-syntax code generator: clauses render in declaration order.

use crate::node::{BinaryOp, Node, UnaryOp};
use crate::query::Query;
use crate::{Error, Result};

/// Render a query in the compact native syntax.
///
/// Clauses appear on the wire in the order they were appended. Consecutive
/// projection expressions merge into a single `select a, b` group so the
/// declaration order stays visible. Every binary operator is fully
/// parenthesized; booleans are bare `true`/`false`; strings use native
/// double-quote escaping; identifiers are never quoted.
pub(crate) fn render(query: &Query) -> Result<String> {
    let mut out = format!("from {}", query.table());
    let nodes = query.nodes();
    let mut i = 0;

    while i < nodes.len() {
        let node = &nodes[i];
        match node {
            Node::Distinct => out.push_str(" distinct"),
            Node::All => out.push_str(" all"),
            Node::Where(pred) => {
                out.push_str(" where ");
                out.push_str(&scalar(pred)?);
            }
            Node::By(key) => {
                out.push_str(" by ");
                out.push_str(&scalar(key)?);
            }
            Node::Having(pred) => {
                out.push_str(" having ");
                out.push_str(&scalar(pred)?);
            }
            Node::Order(key) => {
                out.push_str(" order ");
                out.push_str(&scalar(key)?);
            }
            Node::Limit(n) => out.push_str(&format!(" limit {n}")),
            Node::Offset(n) => out.push_str(&format!(" offset {n}")),
            Node::Margin(source) => {
                out.push_str(" margin ");
                out.push_str(&scalar(source)?);
            }
            Node::Top { .. } => {
                return Err(Error::UnsupportedNode(
                    "top must be normalized away before compilation".into(),
                ))
            }
            // Anything else is a projection item; gather the consecutive run.
            expr => {
                let mut items = vec![scalar(expr)?];
                while i + 1 < nodes.len() && !nodes[i + 1].is_clause() {
                    i += 1;
                    items.push(scalar(&nodes[i])?);
                }
                out.push_str(" select ");
                out.push_str(&items.join(", "));
            }
        }
        i += 1;
    }

    Ok(out)
}

/// Render a scalar expression. Clause variants are rejected: they have no
/// meaning in expression position.
fn scalar(node: &Node) -> Result<String> {
    match node {
        Node::Bool(b) => Ok(b.to_string()),
        Node::Int(v) => Ok(v.to_string()),
        Node::Real(v) => Ok(format_real(*v)),
        Node::Text(s) => Ok(format!("{s:?}")),
        Node::Column(name) => Ok(name.clone()),
        Node::Unary { op, operand } => {
            let inner = scalar(operand)?;
            Ok(match op {
                UnaryOp::Neg => format!("-{inner}"),
                UnaryOp::Pos => format!("+{inner}"),
                UnaryOp::Not => format!("not {inner}"),
            })
        }
        Node::Binary { op, left, right } => Ok(format!(
            "({} {} {})",
            scalar(left)?,
            op_symbol(*op),
            scalar(right)?
        )),
        Node::Call { name, args } => {
            let rendered = args.iter().map(scalar).collect::<Result<Vec<_>>>()?;
            Ok(format!("{}({})", name, rendered.join("; ")))
        }
        Node::Aggregate { name, arg } => Ok(format!("{}({})", name, scalar(arg)?)),
        Node::Alias { value, name } => Ok(format!("{} as {}", scalar(value)?, name)),
        Node::Proportion { value, by } => match by {
            Some(key) => Ok(format!("proportion({}; {})", scalar(value)?, scalar(key)?)),
            None => Ok(format!("proportion({})", scalar(value)?)),
        },
        Node::Distinct
        | Node::All
        | Node::Where(_)
        | Node::By(_)
        | Node::Having(_)
        | Node::Order(_)
        | Node::Limit(_)
        | Node::Offset(_)
        | Node::Top { .. }
        | Node::Margin(_) => Err(Error::UnsupportedNode(format!(
            "{} node in expression position",
            node.kind_name()
        ))),
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

/// Deterministic float rendering: whole values keep one fractional digit so
/// they stay floating-point literals in both targets.
pub(crate) fn format_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
