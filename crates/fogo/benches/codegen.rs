//! Compilation benchmarks: assemble a moderately wide query once and time
//! both code generators over it.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fogo::{Node, Query};

fn wide_query() -> Query {
    let mut q = Query::new("events");
    for i in 0..8 {
        q.append(&Node::alias(
            Node::add(
                Node::mul(Node::column(format!("v{i}")), Node::int(i)),
                Node::real(0.5),
            ),
            format!("m{i}"),
        ))
        .unwrap();
    }
    q.append(&Node::Where(Box::new(Node::and(
        Node::gt(Node::column("v0"), Node::int(10)),
        Node::ne(Node::column("kind"), Node::text("noise")),
    ))))
    .unwrap();
    q.append(&Node::By(Box::new(Node::column("kind")))).unwrap();
    q.append(&Node::Having(Box::new(Node::gt(
        Node::aggregate("sum", Node::column("v0")),
        Node::int(100),
    ))))
    .unwrap();
    q.append(&Node::Order(Box::new(Node::column("kind")))).unwrap();
    q.append(&Node::limit(1000).unwrap()).unwrap();
    q
}

fn deep_predicate(depth: i64) -> Node {
    let mut expr = Node::gt(Node::column("v"), Node::int(0));
    for i in 0..depth {
        expr = Node::and(expr, Node::lt(Node::column("v"), Node::int(i)));
    }
    expr
}

fn bench_codegen(c: &mut Criterion) {
    let wide = wide_query();
    c.bench_function("to_native/wide", |b| {
        b.iter(|| black_box(&wide).to_native().unwrap())
    });
    c.bench_function("to_sql/wide", |b| {
        b.iter(|| black_box(&wide).to_sql().unwrap())
    });

    let mut deep = Query::new("t");
    deep.append(&Node::Where(Box::new(deep_predicate(64)))).unwrap();
    c.bench_function("to_sql/deep_predicate", |b| {
        b.iter(|| black_box(&deep).to_sql().unwrap())
    });

    c.bench_function("append/clause_sequence", |b| {
        b.iter(|| {
            let mut q = Query::new("events");
            q.append(&Node::column("a")).unwrap();
            q.append(&Node::Where(Box::new(Node::gt(
                Node::column("a"),
                Node::int(1),
            ))))
            .unwrap();
            q.append(&Node::By(Box::new(Node::column("k")))).unwrap();
            q.append(&Node::limit(10).unwrap()).unwrap();
            q
        })
    });
}

criterion_group!(benches, bench_codegen);
criterion_main!(benches);
