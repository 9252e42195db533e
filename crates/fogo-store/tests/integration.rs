//! End-to-end tests: assemble a query, compile it to SQL, run it through the
//! in-memory store via the cursor protocol, and check the materialized table.

use std::io::Write;

use fogo::{execute, ColumnData, ColumnType, Error, Node, Query, Table};
use fogo_store::Store;

// ---------------------------------------------------------------------------
// Test data helpers
// ---------------------------------------------------------------------------

fn people() -> Table {
    Table::from_columns(vec![
        (
            "name".into(),
            ColumnData::Text(vec!["ada".into(), "bert".into(), "cleo".into()]),
        ),
        ("score".into(), ColumnData::Real(vec![12.5, 7.0, 30.0])),
    ])
}

fn sales() -> Table {
    Table::from_columns(vec![
        (
            "region".into(),
            ColumnData::Text(vec![
                "east".into(),
                "east".into(),
                "west".into(),
                "west".into(),
                "west".into(),
            ]),
        ),
        ("amount".into(), ColumnData::Int(vec![10, 20, 5, 5, 40])),
    ])
}

fn store() -> Store {
    let mut s = Store::new();
    s.register("people", people());
    s.register("sales", sales());
    s
}

fn text_column(table: &Table, name: &str) -> Vec<String> {
    let idx = table.column_index(name).unwrap();
    match table.columns()[idx].data() {
        ColumnData::Text(v) => v.clone(),
        other => panic!("column '{name}' is not text: {other:?}"),
    }
}

fn int_column(table: &Table, name: &str) -> Vec<i64> {
    let idx = table.column_index(name).unwrap();
    match table.columns()[idx].data() {
        ColumnData::Int(v) => v.clone(),
        other => panic!("column '{name}' is not int: {other:?}"),
    }
}

fn real_column(table: &Table, name: &str) -> Vec<f64> {
    let idx = table.column_index(name).unwrap();
    match table.columns()[idx].data() {
        ColumnData::Real(v) => v.clone(),
        other => panic!("column '{name}' is not real: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Plain selection
// ---------------------------------------------------------------------------

#[test]
fn select_star_returns_every_row() {
    let q = Query::new("people");
    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.ncols(), 2);
    assert_eq!(t.nrows(), 3);
    assert_eq!(text_column(&t, "name"), ["ada", "bert", "cleo"]);
    assert_eq!(real_column(&t, "score"), [12.5, 7.0, 30.0]);
}

#[test]
fn where_filters_rows() {
    let mut q = Query::new("people");
    q.append(&Node::column("name")).unwrap();
    q.append(&Node::Where(Box::new(Node::gt(
        Node::column("score"),
        Node::int(10),
    ))))
    .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(text_column(&t, "name"), ["ada", "cleo"]);
}

#[test]
fn projection_arithmetic_with_alias() {
    let mut q = Query::new("people");
    q.append(&Node::alias(
        Node::mul(Node::column("score"), Node::int(2)),
        "doubled",
    ))
    .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.col_type(0), Some(ColumnType::Real));
    assert_eq!(real_column(&t, "doubled"), [25.0, 14.0, 60.0]);
}

#[test]
fn empty_result_keeps_zero_rows() {
    let mut q = Query::new("people");
    q.append(&Node::column("name")).unwrap();
    q.append(&Node::Where(Box::new(Node::gt(
        Node::column("score"),
        Node::int(1000),
    ))))
    .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.nrows(), 0);
    assert_eq!(t.ncols(), 1);
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[test]
fn group_by_with_sum() {
    let mut q = Query::new("sales");
    q.append(&Node::column("region")).unwrap();
    q.append(&Node::alias(
        Node::aggregate("sum", Node::column("amount")),
        "total",
    ))
    .unwrap();
    q.append(&Node::By(Box::new(Node::column("region")))).unwrap();
    q.append(&Node::Order(Box::new(Node::column("region"))))
        .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(text_column(&t, "region"), ["east", "west"]);
    assert_eq!(int_column(&t, "total"), [30, 50]);
}

#[test]
fn having_filters_groups() {
    let mut q = Query::new("sales");
    q.append(&Node::column("region")).unwrap();
    q.append(&Node::aggregate("sum", Node::column("amount")))
        .unwrap();
    q.append(&Node::By(Box::new(Node::column("region")))).unwrap();
    q.append(&Node::Having(Box::new(Node::gt(
        Node::aggregate("sum", Node::column("amount")),
        Node::int(40),
    ))))
    .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.nrows(), 1);
    assert_eq!(text_column(&t, "region"), ["west"]);
}

#[test]
fn aggregate_without_group_key_collapses_to_one_row() {
    let mut q = Query::new("sales");
    q.append(&Node::aggregate("count", Node::column("amount")))
        .unwrap();
    q.append(&Node::aggregate("max", Node::column("amount")))
        .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.nrows(), 1);
    assert_eq!(t.get_i64(0, 0), Some(5));
    assert_eq!(t.get_i64(1, 0), Some(40));
}

#[test]
fn avg_widens_integers_to_real() {
    let mut q = Query::new("sales");
    q.append(&Node::alias(
        Node::aggregate("avg", Node::column("amount")),
        "mean",
    ))
    .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(real_column(&t, "mean"), [16.0]);
}

// ---------------------------------------------------------------------------
// Distinct, order, slicing
// ---------------------------------------------------------------------------

#[test]
fn distinct_drops_duplicate_rows() {
    let mut q = Query::new("sales");
    q.append(&Node::Distinct).unwrap();
    q.append(&Node::column("region")).unwrap();
    q.append(&Node::Order(Box::new(Node::column("region"))))
        .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(text_column(&t, "region"), ["east", "west"]);
}

#[test]
fn order_by_expression_over_source_rows() {
    // The sort key is not a result column; a plain projection still allows
    // ordering by an arbitrary expression of the source row.
    let mut q = Query::new("people");
    q.append(&Node::column("name")).unwrap();
    q.append(&Node::Order(Box::new(Node::neg(Node::column("score")))))
        .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(text_column(&t, "name"), ["cleo", "ada", "bert"]);
}

#[test]
fn limit_and_offset_slice_after_ordering() {
    let mut q = Query::new("sales");
    q.append(&Node::column("amount")).unwrap();
    q.append(&Node::Order(Box::new(Node::column("amount"))))
        .unwrap();
    q.append(&Node::limit(2).unwrap()).unwrap();
    q.append(&Node::offset(1).unwrap()).unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(int_column(&t, "amount"), [5, 10]);
}

#[test]
fn top_sugar_runs_end_to_end() {
    let mut q = Query::new("sales");
    q.append(&Node::column("region")).unwrap();
    q.append(&Node::alias(
        Node::aggregate("min", Node::column("amount")),
        "low",
    ))
    .unwrap();
    q.append(&Node::top(Node::column("region"), Node::column("region"), 1).unwrap())
        .unwrap();

    let t = execute(&q, &store()).unwrap();
    assert_eq!(t.nrows(), 1);
    assert_eq!(text_column(&t, "region"), ["east"]);
    assert_eq!(int_column(&t, "low"), [10]);
}

// ---------------------------------------------------------------------------
// Failure surfaces
// ---------------------------------------------------------------------------

#[test]
fn unknown_table_reports_cause_and_sql() {
    let mut q = Query::new("nowhere");
    q.append(&Node::column("a")).unwrap();

    match execute(&q, &store()) {
        Err(Error::Execution { cause, sql }) => {
            assert!(cause.message().contains("nowhere"), "cause: {cause}");
            assert_eq!(sql, "SELECT a FROM nowhere");
        }
        other => panic!("expected Execution error, got {other:?}"),
    }
}

#[test]
fn unknown_column_fails_execution() {
    let mut q = Query::new("people");
    q.append(&Node::column("missing")).unwrap();
    let err = execute(&q, &store()).unwrap_err();
    assert!(matches!(err, Error::Execution { .. }));
    assert!(err.to_string().contains("missing"));
}

#[test]
fn summing_text_fails_execution() {
    let mut q = Query::new("people");
    q.append(&Node::aggregate("sum", Node::column("name")))
        .unwrap();
    assert!(matches!(
        execute(&q, &store()),
        Err(Error::Execution { .. })
    ));
}

#[test]
fn integer_overflow_surfaces_as_execution_error() {
    let mut s = Store::new();
    s.register(
        "big",
        Table::from_columns(vec![("v".into(), ColumnData::Int(vec![i64::MAX, 1]))]),
    );

    // Per-row arithmetic.
    let mut q = Query::new("big");
    q.append(&Node::add(Node::column("v"), Node::int(1))).unwrap();
    match execute(&q, &s) {
        Err(Error::Execution { cause, .. }) => {
            assert!(cause.message().contains("overflow"), "cause: {cause}")
        }
        other => panic!("expected Execution error, got {other:?}"),
    }

    // Aggregate accumulation.
    let mut q = Query::new("big");
    q.append(&Node::aggregate("sum", Node::column("v"))).unwrap();
    match execute(&q, &s) {
        Err(Error::Execution { cause, .. }) => {
            assert!(cause.message().contains("overflow"), "cause: {cause}")
        }
        other => panic!("expected Execution error, got {other:?}"),
    }
}

#[test]
fn margin_is_beyond_the_store_subset() {
    // The generated UNION ALL is valid SQL, but this store only runs plain
    // single-table SELECTs; the failure must surface as an Execution error.
    let mut q = Query::new("sales");
    q.append(&Node::column("region")).unwrap();
    q.append(&Node::By(Box::new(Node::column("region")))).unwrap();
    q.append(&Node::Margin(Box::new(Node::aggregate(
        "sum",
        Node::column("amount"),
    ))))
    .unwrap();
    assert!(matches!(
        execute(&q, &store()),
        Err(Error::Execution { .. })
    ));
}

// ---------------------------------------------------------------------------
// Identifier handling and CSV loading
// ---------------------------------------------------------------------------

#[test]
fn reserved_word_identifiers_round_trip() {
    let mut s = Store::new();
    s.register(
        "select",
        Table::from_columns(vec![("order".into(), ColumnData::Int(vec![3, 1, 2]))]),
    );

    let mut q = Query::new("select");
    q.append(&Node::column("order")).unwrap();
    q.append(&Node::Order(Box::new(Node::column("order"))))
        .unwrap();

    let t = execute(&q, &s).unwrap();
    assert_eq!(int_column(&t, "order"), [1, 2, 3]);
}

#[test]
fn csv_load_infers_column_types() {
    let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(f, "id,price,label").unwrap();
    writeln!(f, "1,1.5,apple").unwrap();
    writeln!(f, "2,2,pear").unwrap();
    writeln!(f, "3,0.25,plum").unwrap();
    f.flush().unwrap();

    let mut s = Store::new();
    s.load_csv("fruit", f.path()).unwrap();
    assert_eq!(s.table_info("fruit"), Some((3, 3)));

    let mut q = Query::new("fruit");
    q.append(&Node::column("label")).unwrap();
    q.append(&Node::Where(Box::new(Node::lt(
        Node::column("price"),
        Node::real(2.0),
    ))))
    .unwrap();

    let t = execute(&q, &s).unwrap();
    assert_eq!(text_column(&t, "label"), ["apple", "plum"]);
}

#[test]
fn csv_rejects_ragged_rows() {
    let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(f, "a,b").unwrap();
    writeln!(f, "1,2").unwrap();
    writeln!(f, "3").unwrap();
    f.flush().unwrap();

    let mut s = Store::new();
    let err = s.load_csv("bad", f.path()).unwrap_err();
    assert!(err.message().contains("line 3"), "message: {err}");
}
