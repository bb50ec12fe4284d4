//! Integration tests for the reactive core and the expression layer.
//!
//! These exercise the crate the way the binding layer does: reactive data
//! wrapped from JSON, effects evaluating binding expressions, computed
//! caches deriving values, and paths resolved for two-way writes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use aft_core::{
    computed, effect, evaluate, reactive, resolve_path, BindingContext, Error, Value,
};

fn as_object(value: &Value) -> aft_core::ReactiveObject {
    match value {
        Value::Object(object) => object.clone(),
        other => panic!("expected an object, got {other:?}"),
    }
}

fn as_list(value: &Value) -> aft_core::ReactiveList {
    match value {
        Value::List(list) => list.clone(),
        other => panic!("expected a list, got {other:?}"),
    }
}

/// Wrapping is idempotent: re-wrapping returns the same tracked identity.
#[test]
fn rewrapping_returns_the_same_identity() {
    let wrapped = reactive(json!({"a": 1})).expect("objects are trackable");
    let rewrapped = reactive(wrapped.clone()).expect("tracked values pass through");

    assert_eq!(as_object(&wrapped).id(), as_object(&rewrapped).id());

    let list = reactive(json!([1])).expect("arrays are trackable");
    let relist = reactive(list.clone()).expect("tracked values pass through");
    assert_eq!(as_list(&list).id(), as_list(&relist).id());
}

/// A changed write re-runs a watching effect exactly once; a no-op write
/// re-runs nothing.
#[test]
fn one_rerun_per_changed_write() {
    let data = reactive(json!({"k": "v0"})).expect("objects are trackable");
    let object = as_object(&data);

    let runs = Arc::new(AtomicUsize::new(0));
    let runs2 = runs.clone();
    let reader = object.clone();
    let _binding = effect(move || {
        reader.get("k");
        runs2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    object.set("k", "v1");
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    object.set("k", "v1");
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Invalidation never runs the getter; only the next read does, once.
#[test]
fn computed_caches_are_lazy() {
    let data = reactive(json!({"n": 1})).expect("objects are trackable");
    let object = as_object(&data);

    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = calls.clone();
    let source = object.clone();
    let derived = computed(move || {
        calls2.fetch_add(1, Ordering::SeqCst);
        source.get("n").to_number() + 100.0
    });

    assert_eq!(derived.value().expect("getter is infallible"), 101.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    for i in 0..10 {
        object.set("n", i);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no reads, no recomputes");

    assert_eq!(derived.value().expect("getter is infallible"), 109.0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// A cache reading a cache reading a source: writing the source and reading
/// the outer cache yields the fresh derivation, with no manual re-wiring.
#[test]
fn computed_chains_invalidate_transitively() {
    let data = reactive(json!({"x": 2})).expect("objects are trackable");
    let object = as_object(&data);

    let source = object.clone();
    let a = computed(move || source.get("x").to_number() * 10.0);
    let a2 = a.clone();
    let b = computed(move || a2.value().expect("inner cache is infallible") + 1.0);

    assert_eq!(b.value().expect("getter is infallible"), 21.0);

    object.set("x", 5);
    assert_eq!(b.value().expect("getter is infallible"), 51.0);
}

/// The documented evaluator examples.
#[test]
fn evaluator_examples() {
    let mut ctx = BindingContext::new();
    ctx.insert_data("a", Value::from(json!({"b": 2})));
    assert_eq!(
        evaluate("a.b + 1", &ctx).expect("expression should parse"),
        Value::Number(3.0)
    );

    let mut ctx = BindingContext::new();
    ctx.insert_data("a", false);
    ctx.insert_data("b", 1);
    ctx.insert_data("c", 2);
    assert_eq!(
        evaluate("a ? b : c", &ctx).expect("expression should parse"),
        Value::Number(2.0)
    );

    assert!(matches!(
        evaluate("foo()", &ctx),
        Err(Error::Syntax { .. })
    ));
}

/// The untaken ternary branch registers no dependencies: writing data only
/// that branch would have read does not re-run the binding.
#[test]
fn untaken_branches_stay_untracked() {
    let probe = reactive(json!({"x": 1})).expect("objects are trackable");
    let probe_object = as_object(&probe);

    let mut ctx = BindingContext::new();
    ctx.insert_data("flag", false);
    ctx.insert_data("probe", probe.clone());

    let runs = Arc::new(AtomicUsize::new(0));
    let runs2 = runs.clone();
    let _binding = effect(move || {
        evaluate("flag ? probe.x : 'fallback'", &ctx).expect("expression should parse");
        runs2.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    probe_object.set("x", 2);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// The documented path-resolver examples.
#[test]
fn path_resolver_examples() {
    let mut ctx = BindingContext::new();
    ctx.insert_data(
        "items",
        Value::from(json!([{}, {}, {"name": "x"}])),
    );

    let resolved = resolve_path("items[2].name", &ctx)
        .expect("path should parse")
        .expect("path should resolve");
    assert_eq!(resolved.read(), Value::Str("x".into()));

    let mut ctx = BindingContext::new();
    ctx.insert_data("a", Value::from(json!({})));
    assert!(resolve_path("a.b.c", &ctx)
        .expect("path should parse")
        .is_none());
}

/// An effect that registers a nested effect keeps its own dependency set
/// clean: keys read only by the inner effect never attribute to the outer.
#[test]
fn nested_effect_dependencies_stay_isolated() {
    let data = reactive(json!({"outer": 1, "inner": 1})).expect("objects are trackable");
    let object = as_object(&data);

    let outer_runs = Arc::new(AtomicUsize::new(0));
    let inner_runs = Arc::new(AtomicUsize::new(0));
    let keep = Arc::new(Mutex::new(Vec::new()));

    let o = object.clone();
    let outer_runs2 = outer_runs.clone();
    let inner_runs2 = inner_runs.clone();
    let keep2 = keep.clone();
    let _outer = effect(move || {
        o.get("outer");
        outer_runs2.fetch_add(1, Ordering::SeqCst);

        let o_inner = o.clone();
        let inner_runs3 = inner_runs2.clone();
        let inner = effect(move || {
            o_inner.get("inner");
            inner_runs3.fetch_add(1, Ordering::SeqCst);
        });
        keep2.lock().expect("keep lock poisoned").push(inner);
    });

    assert_eq!(outer_runs.load(Ordering::SeqCst), 1);
    assert_eq!(inner_runs.load(Ordering::SeqCst), 1);

    object.set("inner", 2);
    assert_eq!(
        outer_runs.load(Ordering::SeqCst),
        1,
        "outer effect must not depend on keys only the inner effect read"
    );
    assert_eq!(inner_runs.load(Ordering::SeqCst), 2);
}

/// End-to-end: an iteration binding re-renders on structural mutation and
/// on two-way writes through a resolved path.
#[test]
fn list_binding_scenario() {
    let todos = reactive(json!([
        {"title": "write docs", "done": true},
        {"title": "write code", "done": false}
    ]))
    .expect("arrays are trackable");
    let list = as_list(&todos);

    let mut ctx = BindingContext::new();
    ctx.insert_data("todos", todos.clone());

    let rendered = Arc::new(Mutex::new(String::new()));

    let rendered2 = rendered.clone();
    let source = list.clone();
    let _each_binding = effect(move || {
        let lines: Vec<String> = source
            .to_vec()
            .iter()
            .map(|item| match item {
                Value::Object(todo) => {
                    format!("{}:{}", todo.get("title"), todo.get("done"))
                }
                other => other.to_string(),
            })
            .collect();
        *rendered2.lock().expect("rendered lock poisoned") = lines.join("\n");
    });

    assert_eq!(
        *rendered.lock().expect("rendered lock poisoned"),
        "write docs:true\nwrite code:false"
    );

    // Structural mutation re-renders.
    list.push(Value::from(json!({"title": "ship it", "done": false})));
    assert!(rendered
        .lock()
        .expect("rendered lock poisoned")
        .contains("ship it:false"));

    // A two-way write through a resolved path re-renders too.
    let resolved = resolve_path("todos[1].done", &ctx)
        .expect("path should parse")
        .expect("path should resolve");
    resolved.write(true);
    assert!(rendered
        .lock()
        .expect("rendered lock poisoned")
        .contains("write code:true"));
}

/// A computed cache fed by an expression: the binding-layer shape for
/// `<aft-bind name="total" value="a + b">`.
#[test]
fn named_computed_binding_scenario() {
    let data = reactive(json!({"a": 1, "b": 2})).expect("objects are trackable");

    let mut ctx = BindingContext::new();
    ctx.insert_data("form", data.clone());

    let total = aft_core::Computed::try_new(move || evaluate("form.a + form.b", &ctx));

    assert_eq!(
        total.value().expect("expression should evaluate"),
        Value::Number(3.0)
    );

    as_object(&data).set("a", 10);
    assert!(total.is_dirty());
    assert_eq!(
        total.value().expect("expression should evaluate"),
        Value::Number(12.0)
    );
}
