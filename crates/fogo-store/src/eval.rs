// Expression evaluation over sqlparser ASTs: row-wise scalars, grouped
// aggregates, and the runtime Value they produce.

use std::cmp::Ordering;

use sqlparser::ast::{
    BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
    UnaryOperator, Value as SqlValue,
};

use fogo::{ColumnData, StoreError, Table};

/// Runtime scalar value of one evaluated cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub(crate) fn truthy(&self) -> Result<bool, StoreError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(StoreError::new(format!(
                "predicate did not evaluate to a boolean: {other:?}"
            ))),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

/// Total order over values, for sorting and duplicate elimination. Values
/// of different kinds order by kind; numerics compare cross-kind.
pub(crate) fn total_cmp(a: &Value, b: &Value) -> Ordering {
    fn tag(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Real(_) => 1,
            Value::Text(_) => 2,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => tag(a).cmp(&tag(b)),
        },
    }
}

pub(crate) fn value_eq(a: &Value, b: &Value) -> bool {
    total_cmp(a, b) == Ordering::Equal
}

/// Read one cell of a source table as a Value.
pub(crate) fn read_cell(table: &Table, col: usize, row: usize) -> Result<Value, StoreError> {
    match table.columns()[col].data() {
        ColumnData::Int(v) => Ok(Value::Int(v[row])),
        ColumnData::Real(v) => Ok(Value::Real(v[row])),
        ColumnData::Text(v) => Ok(Value::Text(v[row].clone())),
    }
}

// ---------------------------------------------------------------------------
// Row-wise evaluation
// ---------------------------------------------------------------------------

/// Evaluate a scalar expression against one row of a table.
pub(crate) fn eval(expr: &Expr, table: &Table, row: usize) -> Result<Value, StoreError> {
    match expr {
        Expr::Identifier(ident) => {
            let idx = table.column_index(&ident.value).ok_or_else(|| {
                StoreError::new(format!("column '{}' not found", ident.value))
            })?;
            read_cell(table, idx, row)
        }

        Expr::CompoundIdentifier(parts) => {
            let last = parts
                .last()
                .ok_or_else(|| StoreError::new("empty compound identifier"))?;
            let idx = table
                .column_index(&last.value)
                .ok_or_else(|| StoreError::new(format!("column '{}' not found", last.value)))?;
            read_cell(table, idx, row)
        }

        Expr::Value(v) => literal(v),

        Expr::Nested(inner) => eval(inner, table, row),

        Expr::UnaryOp { op, expr: inner } => {
            let v = eval(inner, table, row)?;
            apply_unary(op, v)
        }

        Expr::BinaryOp { left, op, right } => {
            let l = eval(left, table, row)?;
            let r = eval(right, table, row)?;
            apply_binary(op, l, r)
        }

        Expr::Function(f) => {
            if f.over.is_some() {
                return Err(StoreError::new("window functions not supported"));
            }
            let name = f.name.to_string().to_lowercase();
            if is_aggregate_name(&name) {
                return Err(StoreError::new(format!(
                    "aggregate function '{name}' not allowed in this context"
                )));
            }
            let args = func_args(f)?
                .iter()
                .map(|a| eval(a, table, row))
                .collect::<Result<Vec<_>, _>>()?;
            apply_scalar_function(&name, args)
        }

        _ => Err(StoreError::new(format!("unsupported expression: {expr}"))),
    }
}

fn literal(v: &SqlValue) -> Result<Value, StoreError> {
    match v {
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                let f = n
                    .parse::<f64>()
                    .map_err(|_| StoreError::new(format!("invalid number literal: {n}")))?;
                Ok(Value::Real(f))
            }
        }
        SqlValue::SingleQuotedString(s) => Ok(Value::Text(s.clone())),
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        other => Err(StoreError::new(format!("unsupported value: {other}"))),
    }
}

fn apply_unary(op: &UnaryOperator, v: Value) -> Result<Value, StoreError> {
    match (op, v) {
        (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOperator::Minus, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnaryOperator::Minus, Value::Real(f)) => Ok(Value::Real(-f)),
        (UnaryOperator::Plus, v @ (Value::Int(_) | Value::Real(_))) => Ok(v),
        (op, v) => Err(StoreError::new(format!(
            "unary operator {op} not applicable to {v:?}"
        ))),
    }
}

fn apply_binary(op: &BinaryOperator, l: Value, r: Value) -> Result<Value, StoreError> {
    use BinaryOperator as B;
    match op {
        B::Plus | B::Minus | B::Multiply | B::Divide => numeric(op, l, r),
        B::Eq => Ok(Value::Bool(compare(op, &l, &r)? == Ordering::Equal)),
        B::NotEq => Ok(Value::Bool(compare(op, &l, &r)? != Ordering::Equal)),
        B::Lt => Ok(Value::Bool(compare(op, &l, &r)? == Ordering::Less)),
        B::LtEq => Ok(Value::Bool(compare(op, &l, &r)? != Ordering::Greater)),
        B::Gt => Ok(Value::Bool(compare(op, &l, &r)? == Ordering::Greater)),
        B::GtEq => Ok(Value::Bool(compare(op, &l, &r)? != Ordering::Less)),
        B::And => logic(op, l, r, |a, b| a && b),
        B::Or => logic(op, l, r, |a, b| a || b),
        other => Err(StoreError::new(format!("unsupported operator: {other}"))),
    }
}

fn numeric(op: &BinaryOperator, l: Value, r: Value) -> Result<Value, StoreError> {
    use BinaryOperator as B;
    // Division always produces a real result; the other operators stay
    // integral when both operands are.
    if let (Value::Int(a), Value::Int(b)) = (&l, &r) {
        let checked = match op {
            B::Plus => Some(a.checked_add(*b)),
            B::Minus => Some(a.checked_sub(*b)),
            B::Multiply => Some(a.checked_mul(*b)),
            B::Divide => None,
            _ => unreachable!("numeric() called with non-arithmetic operator"),
        };
        if let Some(result) = checked {
            return result
                .map(Value::Int)
                .ok_or_else(|| StoreError::new(format!("integer overflow in {op}")));
        }
    }
    let (a, b) = match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(StoreError::new(format!(
                "operator {op} requires numeric operands"
            )))
        }
    };
    match op {
        B::Plus => Ok(Value::Real(a + b)),
        B::Minus => Ok(Value::Real(a - b)),
        B::Multiply => Ok(Value::Real(a * b)),
        B::Divide => {
            if b == 0.0 {
                Err(StoreError::new("division by zero"))
            } else {
                Ok(Value::Real(a / b))
            }
        }
        _ => unreachable!("numeric() called with non-arithmetic operator"),
    }
}

fn compare(op: &BinaryOperator, l: &Value, r: &Value) -> Result<Ordering, StoreError> {
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| StoreError::new("incomparable floating-point values")),
            _ => Err(StoreError::new(format!(
                "type mismatch in {op} comparison: {l:?} vs {r:?}"
            ))),
        },
    }
}

fn logic(
    op: &BinaryOperator,
    l: Value,
    r: Value,
    f: fn(bool, bool) -> bool,
) -> Result<Value, StoreError> {
    match (l, r) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(f(a, b))),
        (l, r) => Err(StoreError::new(format!(
            "operator {op} requires boolean operands, got {l:?} and {r:?}"
        ))),
    }
}

fn apply_scalar_function(name: &str, args: Vec<Value>) -> Result<Value, StoreError> {
    match name {
        "abs" => {
            check_arg_count(name, &args, 1)?;
            match &args[0] {
                Value::Int(v) => Ok(Value::Int(v.abs())),
                Value::Real(v) => Ok(Value::Real(v.abs())),
                other => Err(StoreError::new(format!("abs() requires a number, got {other:?}"))),
            }
        }
        "upper" => {
            check_arg_count(name, &args, 1)?;
            match &args[0] {
                Value::Text(s) => Ok(Value::Text(s.to_uppercase())),
                other => Err(StoreError::new(format!("upper() requires text, got {other:?}"))),
            }
        }
        "lower" => {
            check_arg_count(name, &args, 1)?;
            match &args[0] {
                Value::Text(s) => Ok(Value::Text(s.to_lowercase())),
                other => Err(StoreError::new(format!("lower() requires text, got {other:?}"))),
            }
        }
        "length" | "len" => {
            check_arg_count(name, &args, 1)?;
            match &args[0] {
                Value::Text(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(StoreError::new(format!("length() requires text, got {other:?}"))),
            }
        }
        _ => Err(StoreError::new(format!("unsupported function: {name}"))),
    }
}

fn check_arg_count(name: &str, args: &[Value], expected: usize) -> Result<(), StoreError> {
    if args.len() != expected {
        Err(StoreError::new(format!(
            "{name}() expects {expected} argument(s), got {}",
            args.len()
        )))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Aggregates and grouped evaluation
// ---------------------------------------------------------------------------

pub(crate) fn is_aggregate_name(name: &str) -> bool {
    matches!(name, "sum" | "avg" | "min" | "max" | "count")
}

/// Whether an expression contains any aggregate function call.
pub(crate) fn expr_is_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Function(f) => is_aggregate_name(&f.name.to_string().to_lowercase()),
        Expr::BinaryOp { left, right, .. } => expr_is_aggregate(left) || expr_is_aggregate(right),
        Expr::UnaryOp { expr, .. } => expr_is_aggregate(expr),
        Expr::Nested(inner) => expr_is_aggregate(inner),
        _ => false,
    }
}

/// Display name for an expression, used to name result columns and to match
/// projection items against GROUP BY keys.
pub(crate) fn expr_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.to_lowercase(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.to_lowercase())
            .unwrap_or_default(),
        _ => format!("{expr}").to_lowercase(),
    }
}

/// Evaluate an aggregate function call over a set of rows.
pub(crate) fn eval_aggregate(
    f: &Function,
    table: &Table,
    rows: &[usize],
) -> Result<Value, StoreError> {
    if f.over.is_some() {
        return Err(StoreError::new("window functions not supported"));
    }
    let name = f.name.to_string().to_lowercase();

    let args = match &f.args {
        FunctionArguments::List(list) => &list.args,
        _ => {
            return Err(StoreError::new(format!(
                "unsupported argument syntax for '{name}'"
            )))
        }
    };

    // COUNT(*) counts rows without evaluating anything.
    if let Some(FunctionArg::Unnamed(FunctionArgExpr::Wildcard)) = args.first() {
        if name != "count" {
            return Err(StoreError::new(format!(
                "wildcard (*) not supported for {name}()"
            )));
        }
        return Ok(Value::Int(rows.len() as i64));
    }

    let arg = match args.first() {
        Some(FunctionArg::Unnamed(FunctionArgExpr::Expr(e))) if args.len() == 1 => e,
        _ => {
            return Err(StoreError::new(format!(
                "{name}() expects exactly one argument"
            )))
        }
    };

    let values = rows
        .iter()
        .map(|&r| eval(arg, table, r))
        .collect::<Result<Vec<_>, _>>()?;

    match name.as_str() {
        "count" => Ok(Value::Int(values.len() as i64)),
        "sum" => sum_values(&values),
        "avg" => {
            if values.is_empty() {
                return Err(StoreError::new("avg() of empty input"));
            }
            let total = match sum_values(&values)? {
                Value::Int(v) => v as f64,
                Value::Real(v) => v,
                _ => unreachable!("sum_values produces numbers"),
            };
            Ok(Value::Real(total / values.len() as f64))
        }
        "min" => fold_extreme(&name, &values, Ordering::Less),
        "max" => fold_extreme(&name, &values, Ordering::Greater),
        _ => Err(StoreError::new(format!("unknown aggregate function: {name}"))),
    }
}

fn sum_values(values: &[Value]) -> Result<Value, StoreError> {
    let mut int_sum: i64 = 0;
    let mut real_sum: f64 = 0.0;
    let mut saw_real = false;
    for v in values {
        match v {
            Value::Int(i) => {
                int_sum = int_sum
                    .checked_add(*i)
                    .ok_or_else(|| StoreError::new("integer overflow in sum()"))?;
                real_sum += *i as f64;
            }
            Value::Real(f) => {
                saw_real = true;
                real_sum += f;
            }
            other => {
                return Err(StoreError::new(format!(
                    "sum() requires numbers, got {other:?}"
                )))
            }
        }
    }
    if saw_real {
        Ok(Value::Real(real_sum))
    } else {
        Ok(Value::Int(int_sum))
    }
}

fn fold_extreme(name: &str, values: &[Value], keep: Ordering) -> Result<Value, StoreError> {
    let mut best: Option<&Value> = None;
    for v in values {
        match v {
            Value::Int(_) | Value::Real(_) | Value::Text(_) => {}
            other => {
                return Err(StoreError::new(format!(
                    "{name}() not applicable to {other:?}"
                )))
            }
        }
        best = match best {
            None => Some(v),
            Some(b) if total_cmp(v, b) == keep => Some(v),
            Some(b) => Some(b),
        };
    }
    best.cloned()
        .ok_or_else(|| StoreError::new(format!("{name}() of empty input")))
}

/// One group of source rows plus its key bindings.
pub(crate) struct GroupContext<'a> {
    pub table: &'a Table,
    pub rows: &'a [usize],
    /// (display name, this group's value) per GROUP BY key.
    pub keys: &'a [(String, Value)],
}

/// Evaluate an expression in grouped context: aggregates run over the
/// group's rows, identifiers resolve against the GROUP BY keys, everything
/// else must be built from those two.
pub(crate) fn eval_grouped(expr: &Expr, ctx: &GroupContext) -> Result<Value, StoreError> {
    // A projection item that textually repeats a group key resolves to it,
    // whether it is a bare identifier or a whole key expression.
    let name = expr_name(expr);
    if let Some((_, v)) = ctx.keys.iter().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
        return Ok(v.clone());
    }

    match expr {
        Expr::Function(f) => {
            let fname = f.name.to_string().to_lowercase();
            if is_aggregate_name(&fname) {
                return eval_aggregate(f, ctx.table, ctx.rows);
            }
            let args = func_args(f)?
                .iter()
                .map(|a| eval_grouped(a, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            apply_scalar_function(&fname, args)
        }
        Expr::Identifier(ident) => Err(StoreError::new(format!(
            "column '{}' must appear in GROUP BY or an aggregate",
            ident.value
        ))),
        Expr::Value(v) => literal(v),
        Expr::Nested(inner) => eval_grouped(inner, ctx),
        Expr::UnaryOp { op, expr: inner } => {
            let v = eval_grouped(inner, ctx)?;
            apply_unary(op, v)
        }
        Expr::BinaryOp { left, op, right } => {
            let l = eval_grouped(left, ctx)?;
            let r = eval_grouped(right, ctx)?;
            apply_binary(op, l, r)
        }
        _ => Err(StoreError::new(format!(
            "unsupported expression in grouped context: {expr}"
        ))),
    }
}

fn func_args(f: &Function) -> Result<Vec<&Expr>, StoreError> {
    match &f.args {
        FunctionArguments::List(list) => {
            let mut exprs = Vec::new();
            for arg in &list.args {
                match arg {
                    FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => exprs.push(e),
                    _ => {
                        return Err(StoreError::new(format!(
                            "unsupported argument syntax in {}()",
                            f.name
                        )))
                    }
                }
            }
            Ok(exprs)
        }
        FunctionArguments::None => Ok(Vec::new()),
        _ => Err(StoreError::new(format!(
            "unsupported argument syntax for '{}'",
            f.name
        ))),
    }
}
