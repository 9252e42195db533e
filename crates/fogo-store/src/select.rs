// Single-table SELECT execution: filter, group, project, order, slice,
// then materialize into a columnar Table.

use std::collections::HashMap;
use std::sync::Arc;

use sqlparser::ast::{
    Expr, GroupByExpr, ObjectName, OrderByExpr, Query, Select, SelectItem, SetExpr, TableFactor,
    Value as SqlValue,
};

use fogo::{ColumnData, StoreError, Table};

use crate::eval::{
    eval, eval_grouped, expr_is_aggregate, expr_name, read_cell, total_cmp, value_eq,
    GroupContext, Value,
};

/// Row-major intermediate result. `source_rows` maps each result row back to
/// its source row when the projection was a plain per-row pass; grouping,
/// and DISTINCT sever that link.
struct ResultSet {
    names: Vec<String>,
    rows: Vec<Vec<Value>>,
    source_rows: Option<Vec<usize>>,
}

pub(crate) fn run(
    query: &Query,
    tables: &HashMap<String, Arc<Table>>,
) -> Result<Table, StoreError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        other => return Err(StoreError::new(format!("unsupported query form: {other}"))),
    };

    let table = resolve_table(select, tables)?;

    // WHERE: keep the indices of qualifying source rows.
    let mut rows: Vec<usize> = Vec::new();
    for row in 0..table.nrows() {
        let keep = match &select.selection {
            Some(pred) => eval(pred, table, row)?.truthy()?,
            None => true,
        };
        if keep {
            rows.push(row);
        }
    }

    let group_keys = group_by_exprs(select)?;
    let grouped = !group_keys.is_empty()
        || select.having.is_some()
        || projection_has_aggregate(&select.projection);

    let mut result = if grouped {
        run_grouped(select, table, &rows, &group_keys)?
    } else {
        run_plain(select, table, &rows)?
    };

    if select.distinct.is_some() {
        dedup(&mut result);
    }

    if let Some(order_by) = &query.order_by {
        sort(&mut result, &order_by.exprs, table)?;
    }

    let offset = match &query.offset {
        Some(o) => int_literal(&o.value, "OFFSET")? as usize,
        None => 0,
    };
    if offset > 0 {
        result.rows.drain(..offset.min(result.rows.len()));
    }
    if let Some(limit) = &query.limit {
        let n = int_literal(limit, "LIMIT")? as usize;
        result.rows.truncate(n);
    }

    materialize(result)
}

fn resolve_table<'a>(
    select: &Select,
    tables: &'a HashMap<String, Arc<Table>>,
) -> Result<&'a Table, StoreError> {
    if select.from.len() != 1 {
        return Err(StoreError::new("exactly one FROM table is required"));
    }
    let item = &select.from[0];
    if !item.joins.is_empty() {
        return Err(StoreError::new("joins are not supported"));
    }
    let name = match &item.relation {
        TableFactor::Table { name, .. } => object_name(name),
        other => return Err(StoreError::new(format!("unsupported FROM item: {other}"))),
    };
    tables
        .get(&name.to_lowercase())
        .map(|t| t.as_ref())
        .ok_or_else(|| StoreError::new(format!("table '{name}' not found")))
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

fn group_by_exprs(select: &Select) -> Result<Vec<&Expr>, StoreError> {
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => Ok(exprs.iter().collect()),
        other => Err(StoreError::new(format!(
            "unsupported GROUP BY form: {other}"
        ))),
    }
}

fn projection_has_aggregate(projection: &[SelectItem]) -> bool {
    projection.iter().any(|item| match item {
        SelectItem::UnnamedExpr(e) => expr_is_aggregate(e),
        SelectItem::ExprWithAlias { expr, .. } => expr_is_aggregate(expr),
        _ => false,
    })
}

// ---------------------------------------------------------------------------
// Plain (per-row) pipeline
// ---------------------------------------------------------------------------

fn run_plain(select: &Select, table: &Table, rows: &[usize]) -> Result<ResultSet, StoreError> {
    // SELECT * passes every source column through untouched.
    if matches!(select.projection.as_slice(), [SelectItem::Wildcard(_)]) {
        let names = table
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut out = Vec::with_capacity(rows.len());
        for &row in rows {
            let mut cells = Vec::with_capacity(table.ncols());
            for col in 0..table.ncols() {
                cells.push(read_cell(table, col, row)?);
            }
            out.push(cells);
        }
        return Ok(ResultSet {
            names,
            rows: out,
            source_rows: Some(rows.to_vec()),
        });
    }

    let items = named_items(&select.projection)?;
    let mut out = Vec::with_capacity(rows.len());
    for &row in rows {
        let mut cells = Vec::with_capacity(items.len());
        for (expr, _) in &items {
            cells.push(eval(expr, table, row)?);
        }
        out.push(cells);
    }
    Ok(ResultSet {
        names: items.into_iter().map(|(_, name)| name).collect(),
        rows: out,
        source_rows: Some(rows.to_vec()),
    })
}

// ---------------------------------------------------------------------------
// Grouped pipeline
// ---------------------------------------------------------------------------

fn run_grouped(
    select: &Select,
    table: &Table,
    rows: &[usize],
    keys: &[&Expr],
) -> Result<ResultSet, StoreError> {
    // Partition rows by key tuple, first occurrence order. With no keys the
    // whole input forms a single group, even when empty.
    let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
    if keys.is_empty() {
        groups.push((Vec::new(), rows.to_vec()));
    } else {
        for &row in rows {
            let key: Vec<Value> = keys
                .iter()
                .map(|k| eval(k, table, row))
                .collect::<Result<_, _>>()?;
            match groups
                .iter_mut()
                .find(|(k, _)| k.iter().zip(&key).all(|(a, b)| value_eq(a, b)))
            {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
    }

    let key_names: Vec<String> = keys.iter().map(|k| expr_name(k)).collect();
    let items = named_items(&select.projection)?;

    let mut out = Vec::with_capacity(groups.len());
    for (key, members) in &groups {
        let bindings: Vec<(String, Value)> = key_names
            .iter()
            .cloned()
            .zip(key.iter().cloned())
            .collect();
        let ctx = GroupContext {
            table,
            rows: members,
            keys: &bindings,
        };

        if let Some(having) = &select.having {
            if !eval_grouped(having, &ctx)?.truthy()? {
                continue;
            }
        }

        let mut cells = Vec::with_capacity(items.len());
        for (expr, _) in &items {
            cells.push(eval_grouped(expr, &ctx)?);
        }
        out.push(cells);
    }

    Ok(ResultSet {
        names: items.into_iter().map(|(_, name)| name).collect(),
        rows: out,
        source_rows: None,
    })
}

/// Projection items as (expression, result column name) pairs.
fn named_items(projection: &[SelectItem]) -> Result<Vec<(&Expr, String)>, StoreError> {
    if projection.is_empty() {
        return Err(StoreError::new("empty projection"));
    }
    projection
        .iter()
        .map(|item| match item {
            SelectItem::UnnamedExpr(e) => Ok((e, expr_name(e))),
            SelectItem::ExprWithAlias { expr, alias } => Ok((expr, alias.value.clone())),
            other => Err(StoreError::new(format!(
                "unsupported projection item: {other}"
            ))),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// DISTINCT, ORDER BY, slicing
// ---------------------------------------------------------------------------

fn dedup(result: &mut ResultSet) {
    let mut seen: Vec<Vec<Value>> = Vec::new();
    result.rows.retain(|row| {
        if seen
            .iter()
            .any(|s| s.iter().zip(row).all(|(a, b)| value_eq(a, b)))
        {
            false
        } else {
            seen.push(row.clone());
            true
        }
    });
    // Row identity no longer maps one-to-one onto source rows.
    result.source_rows = None;
}

fn sort(
    result: &mut ResultSet,
    order: &[OrderByExpr],
    table: &Table,
) -> Result<(), StoreError> {
    // Each sort key becomes a precomputed column of values, one per result
    // row. Identifiers naming a result column sort by it; any other
    // expression needs the source-row mapping of a plain projection.
    let mut sort_cols: Vec<(Vec<Value>, bool)> = Vec::new();
    for ob in order {
        let asc = ob.asc.unwrap_or(true);
        let name = expr_name(&ob.expr);
        let keys = if let Some(col) = result
            .names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(&name))
        {
            result.rows.iter().map(|row| row[col].clone()).collect()
        } else if let Some(source) = &result.source_rows {
            source
                .iter()
                .map(|&row| eval(&ob.expr, table, row))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            return Err(StoreError::new(format!(
                "ORDER BY expression '{}' does not name a result column",
                ob.expr
            )));
        };
        sort_cols.push((keys, asc));
    }

    let mut perm: Vec<usize> = (0..result.rows.len()).collect();
    perm.sort_by(|&a, &b| {
        for (keys, asc) in &sort_cols {
            let ord = total_cmp(&keys[a], &keys[b]);
            let ord = if *asc { ord } else { ord.reverse() };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });

    result.rows = permute(std::mem::take(&mut result.rows), &perm);
    if let Some(source) = result.source_rows.take() {
        result.source_rows = Some(perm.iter().map(|&i| source[i]).collect());
    }
    Ok(())
}

fn permute<T>(mut items: Vec<T>, perm: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    perm.iter()
        .map(|&i| slots[i].take().expect("permutation index used twice"))
        .collect()
}

fn int_literal(expr: &Expr, clause: &str) -> Result<i64, StoreError> {
    if let Expr::Value(SqlValue::Number(n, _)) = expr {
        if let Ok(v) = n.parse::<i64>() {
            if v >= 0 {
                return Ok(v);
            }
        }
    }
    Err(StoreError::new(format!(
        "{clause} requires a non-negative integer literal, got {expr}"
    )))
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

/// Convert row-major values into typed columns. A column holding any Text is
/// all Text; otherwise any Real widens the whole column to Real; otherwise
/// it is Int, with booleans as 0/1. Columns of an empty result default Int.
fn materialize(result: ResultSet) -> Result<Table, StoreError> {
    let ncols = result.names.len();
    let mut columns: Vec<(String, ColumnData)> = Vec::with_capacity(ncols);

    for (col, name) in result.names.into_iter().enumerate() {
        let cells: Vec<&Value> = result.rows.iter().map(|row| &row[col]).collect();
        let any_text = cells.iter().any(|v| matches!(v, Value::Text(_)));
        let all_text = cells.iter().all(|v| matches!(v, Value::Text(_)));
        let any_real = cells.iter().any(|v| matches!(v, Value::Real(_)));

        let data = if any_text {
            if !all_text {
                return Err(StoreError::new(format!(
                    "column '{name}' mixes text and non-text values"
                )));
            }
            ColumnData::Text(
                cells
                    .iter()
                    .map(|v| match v {
                        Value::Text(s) => s.clone(),
                        _ => unreachable!(),
                    })
                    .collect(),
            )
        } else if any_real {
            let mut out = Vec::with_capacity(cells.len());
            for v in &cells {
                match v {
                    Value::Real(f) => out.push(*f),
                    Value::Int(i) => out.push(*i as f64),
                    Value::Bool(b) => out.push(if *b { 1.0 } else { 0.0 }),
                    Value::Text(_) => unreachable!(),
                }
            }
            ColumnData::Real(out)
        } else {
            let mut out = Vec::with_capacity(cells.len());
            for v in &cells {
                match v {
                    Value::Int(i) => out.push(*i),
                    Value::Bool(b) => out.push(if *b { 1 } else { 0 }),
                    _ => unreachable!(),
                }
            }
            ColumnData::Int(out)
        };
        columns.push((name, data));
    }

    Ok(Table::from_columns(columns))
}
