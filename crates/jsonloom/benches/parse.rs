//! Benchmark – `jsonloom::JsonParser`
#![allow(missing_docs)]

use std::{fmt::Write as _, time::Duration};

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use jsonloom::{DeclaredType, JsonParser, ParserConfig, ParserOptions, TypeDescriptor, TypeRef};

/// Produce a deterministic array of `items` order lines. With `lenient` set
/// the document uses unquoted keys, single quotes, comments and trailing
/// commas.
fn make_orders_payload(items: usize, lenient: bool) -> String {
    let mut s = String::with_capacity(items * 96);
    s.push('[');
    for i in 0..items {
        if i > 0 {
            s.push(',');
        }
        if lenient {
            let _ = write!(
                s,
                "/* {i} */{{sku:'SKU-{i}',qty:{},price:{}.{:02},note:'line {i}',}}",
                i % 7,
                i * 3,
                i % 100
            );
        } else {
            let _ = write!(
                s,
                r#"{{"sku":"SKU-{i}","qty":{},"price":{}.{:02},"note":"line {i}"}}"#,
                i % 7,
                i * 3,
                i % 100
            );
        }
    }
    s.push(']');
    s
}

/// A tree of `nodes` children that each point back at the root and at their
/// previous sibling.
fn make_reference_payload(nodes: usize) -> String {
    let mut s = String::from(r#"{"name":"root","children":["#);
    for i in 0..nodes {
        if i > 0 {
            s.push(',');
        }
        let _ = write!(s, r#"{{"id":{i},"root":{{"$ref":"$"}}"#);
        if i > 0 {
            let _ = write!(s, r#","prev":{{"$ref":"$.children[{}]"}}"#, i - 1);
        }
        s.push('}');
    }
    s.push_str("]}");
    s
}

fn item_type(config: &ParserConfig) -> TypeRef {
    let ty = TypeDescriptor::builder("bench.Item")
        .field("sku", DeclaredType::String)
        .field("qty", DeclaredType::Int)
        .field("price", DeclaredType::Decimal)
        .field("note", DeclaredType::String)
        .build();
    config.register(ty.clone());
    ty
}

fn bench_generic(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_generic");

    for &items in &[10usize, 1_000, 10_000] {
        let strict = make_orders_payload(items, false);
        let lenient = make_orders_payload(items, true);

        group.bench_with_input(BenchmarkId::new("strict", items), &strict, |b, text| {
            b.iter(|| black_box(jsonloom::parse(black_box(text)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("lenient", items), &lenient, |b, text| {
            b.iter(|| black_box(jsonloom::parse_with(black_box(text), ParserOptions::lenient()).unwrap()));
        });
    }
    group.finish();
}

fn bench_typed(c: &mut Criterion) {
    let config = ParserConfig::new();
    let item = item_type(&config);
    let items = DeclaredType::list_of(DeclaredType::named(item.name()));
    let options = ParserOptions {
        use_big_decimal: true,
        ..Default::default()
    };

    let mut group = c.benchmark_group("parse_typed");

    for &count in &[10usize, 1_000, 10_000] {
        let payload = make_orders_payload(count, false);
        // Matcher misses push every field through the general key loop.
        let reordered = payload.replace(r#"{"sku""#, r#"{"note":"","sku""#);

        group.bench_with_input(BenchmarkId::new("fast_path", count), &payload, |b, text| {
            b.iter(|| {
                let value = JsonParser::with_config(black_box(text), options, &config)
                    .parse_as(&items)
                    .unwrap();
                black_box(value);
            });
        });
        group.bench_with_input(BenchmarkId::new("fallback", count), &reordered, |b, text| {
            b.iter(|| {
                let value = JsonParser::with_config(black_box(text), options, &config)
                    .parse_as(&items)
                    .unwrap();
                black_box(value);
            });
        });
    }
    group.finish();
}

fn bench_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_references");

    for &nodes in &[10usize, 1_000] {
        let payload = make_reference_payload(nodes);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &payload, |b, text| {
            b.iter(|| black_box(jsonloom::parse(black_box(text)).unwrap()));
        });
    }
    group.finish();
}

fn criterion() -> Criterion {
    let mut c = Criterion::default();
    if cfg!(feature = "bench-fast") {
        c = c
            .warm_up_time(Duration::from_millis(10))
            .measurement_time(Duration::from_millis(100))
            .sample_size(10);
    } else {
        c = c
            .warm_up_time(Duration::from_secs(3))
            .measurement_time(Duration::from_secs(5));
    }
    c
}

criterion_group! { name = benches; config = criterion(); targets = bench_generic, bench_typed, bench_references }
criterion_main!(benches);
