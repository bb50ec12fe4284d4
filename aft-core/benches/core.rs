//! Throughput benchmarks for the write -> notify path and the expression
//! evaluator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use aft_core::{computed, effect, evaluate, evaluate_parsed, parse, reactive, BindingContext, Value};

fn write_notify(c: &mut Criterion) {
    let data = reactive(json!({"n": 0})).expect("objects are trackable");
    let object = match &data {
        Value::Object(object) => object.clone(),
        other => panic!("expected an object, got {other:?}"),
    };

    let reader = object.clone();
    let _binding = effect(move || {
        black_box(reader.get("n"));
    });

    let mut i = 0.0;
    c.bench_function("write_through_one_effect", |b| {
        b.iter(|| {
            i += 1.0;
            object.set("n", i);
        })
    });
}

fn computed_reads(c: &mut Criterion) {
    let data = reactive(json!({"n": 1})).expect("objects are trackable");
    let object = match &data {
        Value::Object(object) => object.clone(),
        other => panic!("expected an object, got {other:?}"),
    };

    let source = object.clone();
    let derived = computed(move || source.get("n").to_number() * 2.0);

    c.bench_function("computed_read_clean", |b| {
        b.iter(|| black_box(derived.value().expect("getter is infallible")))
    });
}

fn expression_evaluation(c: &mut Criterion) {
    let mut ctx = BindingContext::new();
    ctx.insert_data("a", Value::from(json!({"b": 2})));
    ctx.insert_data("flag", true);

    c.bench_function("evaluate_parse_and_run", |b| {
        b.iter(|| black_box(evaluate("flag ? a.b + 1 : 0", &ctx).expect("expression parses")))
    });

    let ast = parse("flag ? a.b + 1 : 0").expect("expression parses");
    c.bench_function("evaluate_preparsed", |b| {
        b.iter(|| black_box(evaluate_parsed(&ast, &ctx)))
    });
}

criterion_group!(benches, write_notify, computed_reads, expression_evaluation);
criterion_main!(benches);
