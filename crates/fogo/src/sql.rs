// SQL code generator: clauses re-ordered onto the standard SELECT skeleton.

use crate::native::format_real;
use crate::node::{BinaryOp, Node, UnaryOp};
use crate::query::Query;
use crate::{Error, Result};

/// Render a query as SQL.
///
/// Whatever the declaration order, clauses land on the wire as
/// `SELECT [DISTINCT] projection FROM table [WHERE] [GROUP BY] [HAVING]
/// [ORDER BY] [LIMIT] [OFFSET]`. Multiple `Where` (or `Having`) predicates
/// join with `AND`; `Margin` expands into a `UNION ALL` subtotal branch;
/// `Proportion` expands into a window-function ratio.
pub(crate) fn render(query: &Query) -> Result<String> {
    let mut projection: Vec<String> = Vec::new();
    let mut distinct = false;
    let mut wheres: Vec<String> = Vec::new();
    let mut bys: Vec<String> = Vec::new();
    let mut havings: Vec<String> = Vec::new();
    let mut orders: Vec<String> = Vec::new();
    let mut limit: Option<i64> = None;
    let mut offset: Option<i64> = None;
    let mut margins: Vec<&Node> = Vec::new();

    for node in query.nodes() {
        match node {
            Node::Distinct => distinct = true,
            Node::All => {}
            Node::Where(pred) => wheres.push(scalar(pred, 0)?),
            Node::By(key) => bys.push(scalar(key, 0)?),
            Node::Having(pred) => havings.push(scalar(pred, 0)?),
            Node::Order(key) => orders.push(scalar(key, 0)?),
            Node::Limit(n) => limit = Some(*n),
            Node::Offset(n) => offset = Some(*n),
            Node::Margin(source) => margins.push(source),
            Node::Top { .. } => {
                return Err(Error::UnsupportedNode(
                    "top must be normalized away before compilation".into(),
                ))
            }
            expr => projection.push(projection_item(expr)?),
        }
    }

    let mut out = String::from("SELECT ");
    if distinct {
        out.push_str("DISTINCT ");
    }
    if projection.is_empty() {
        out.push('*');
    } else {
        out.push_str(&projection.join(", "));
    }
    out.push_str(" FROM ");
    out.push_str(&ident(query.table()));

    if !wheres.is_empty() {
        out.push_str(" WHERE ");
        out.push_str(&wheres.join(" AND "));
    }
    if !bys.is_empty() {
        out.push_str(" GROUP BY ");
        out.push_str(&bys.join(", "));
    }
    if !havings.is_empty() {
        out.push_str(" HAVING ");
        out.push_str(&havings.join(" AND "));
    }
    if !orders.is_empty() {
        out.push_str(" ORDER BY ");
        out.push_str(&orders.join(", "));
    }
    if let Some(n) = limit {
        out.push_str(&format!(" LIMIT {n}"));
    }
    if let Some(n) = offset {
        out.push_str(&format!(" OFFSET {n}"));
    }

    // Each Margin becomes a UNION ALL branch computing the subtotal over the
    // same filtered input, with NULL padding for the group-key columns.
    for source in &margins {
        out.push_str(" UNION ALL SELECT ");
        for _ in &bys {
            out.push_str("NULL, ");
        }
        out.push_str(&scalar(source, 0)?);
        out.push_str(" FROM ");
        out.push_str(&ident(query.table()));
        if !wheres.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&wheres.join(" AND "));
        }
    }

    Ok(out)
}

/// Render one projection item. `Alias` gets `AS` here because it is only
/// meaningful at the top of a select-list entry.
fn projection_item(node: &Node) -> Result<String> {
    match node {
        Node::Alias { value, name } => Ok(format!("{} AS {}", scalar(value, 0)?, ident(name))),
        other => scalar(other, 0),
    }
}

// Precedence levels, loosest to tightest. A subexpression is parenthesized
// only when its level is below its parent's.
fn prec(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => 3,
        BinaryOp::Add | BinaryOp::Sub => 4,
        BinaryOp::Mul | BinaryOp::Div => 5,
    }
}

const UNARY_PREC: u8 = 6;

/// Render a scalar expression, parenthesizing only where precedence would
/// otherwise be ambiguous. Clause variants are rejected.
fn scalar(node: &Node, parent: u8) -> Result<String> {
    match node {
        Node::Bool(b) => Ok(if *b { "TRUE".into() } else { "FALSE".into() }),
        Node::Int(v) => Ok(v.to_string()),
        Node::Real(v) => Ok(format_real(*v)),
        Node::Text(s) => Ok(quote_text(s)),
        Node::Column(name) => Ok(ident(name)),
        Node::Unary { op, operand } => match op {
            UnaryOp::Neg => Ok(format!("-{}", scalar(operand, UNARY_PREC)?)),
            UnaryOp::Pos => Ok(format!("+{}", scalar(operand, UNARY_PREC)?)),
            UnaryOp::Not => {
                // NOT binds looser than comparison.
                let rendered = format!("NOT {}", scalar(operand, 3)?);
                if parent > 2 {
                    Ok(format!("({rendered})"))
                } else {
                    Ok(rendered)
                }
            }
        },
        Node::Binary { op, left, right } => {
            let level = prec(*op);
            let rendered = format!(
                "{} {} {}",
                scalar(left, level)?,
                op_symbol(*op),
                scalar(right, level + 1)?
            );
            if level < parent {
                Ok(format!("({rendered})"))
            } else {
                Ok(rendered)
            }
        }
        Node::Call { name, args } => {
            let rendered = args
                .iter()
                .map(|a| scalar(a, 0))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{}({})", name, rendered.join(", ")))
        }
        Node::Aggregate { name, arg } => {
            Ok(format!("{}({})", name.to_uppercase(), scalar(arg, 0)?))
        }
        Node::Alias { value, .. } => {
            // Nested aliases carry no SQL meaning; render the value.
            scalar(value, parent)
        }
        Node::Proportion { value, by } => {
            let window = match by {
                Some(key) => format!("PARTITION BY {}", scalar(key, 0)?),
                None => String::new(),
            };
            // The expansion is a division, so it carries division precedence.
            let level = prec(BinaryOp::Div);
            let rendered = format!(
                "{} / SUM({}) OVER ({})",
                scalar(value, level)?,
                scalar(value, 0)?,
                window
            );
            if level < parent {
                Ok(format!("({rendered})"))
            } else {
                Ok(rendered)
            }
        }
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
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
    }
}

/// Single-quote a text literal, doubling embedded quotes.
fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote an identifier only when it contains reserved characters or
/// collides with a keyword.
fn ident(name: &str) -> String {
    if is_plain_ident(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    head_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !is_reserved(&name.to_ascii_lowercase())
}

fn is_reserved(lower: &str) -> bool {
    const RESERVED: &[&str] = &[
        "all", "and", "as", "asc", "avg", "between", "by", "case", "cast", "count", "create",
        "desc", "distinct", "drop", "else", "end", "false", "from", "group", "having", "in",
        "is", "like", "limit", "max", "min", "not", "null", "offset", "or", "order", "over",
        "partition", "select", "sum", "table", "then", "true", "union", "when", "where",
    ];
    RESERVED.binary_search(&lower).is_ok()
}
